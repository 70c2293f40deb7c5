//! SQLite backend for the reconciler: the order store, the activity and listing stores, and the shared scheduler lock
//! and cache used by replicas that share one database file.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
