mod reconciler_world;
mod steps;

pub use reconciler_world::ReconcilerWorld;
