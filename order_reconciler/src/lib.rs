//! Order Reconciler
//!
//! The reconciler keeps the fillability and approval status of marketplace orders in line with on-chain reality, and
//! feeds the search indexes that sit beside the order book. This library contains the engine and its job runtime. It
//! is storage- and transport-agnostic; the worker binary wires in concrete adapters.
//!
//! The library is divided into the following sections:
//! 1. The job runtime ([`mod@jobs`]): named queues with typed payloads, retry ceilings, backoff, concurrency limits and
//!    coalescing. [`scheduler`] and [`mod@locks`] add lock-gated periodic triggers on top.
//! 2. The reconciliation engine ([`mod@order_fixes`]) and the per-protocol validity checks it dispatches to
//!    ([`mod@checkers`]). Downstream notifications are defined in [`mod@fanout`].
//! 3. The indexing pipelines ([`mod@pipelines`]) that turn transfer events and new listings into search documents.
//! 4. Storage ([`mod@traits`] and, with the `sqlite` feature, [`SqliteDatabase`]). The data types shared by all of
//!    these live in [`db_types`].
pub mod chain;
pub mod checkers;
pub mod db_types;
pub mod fanout;
pub mod jobs;
pub mod locks;
pub mod order_fixes;
pub mod pipelines;
pub mod scheduler;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{ActivityStore, ListingStore, OrderScope, OrderStore, StoreError};
