//! # Store contracts
//!
//! This module defines the behaviour that a storage backend must expose to drive the reconciliation engine and the
//! indexing pipelines. The relational schema itself belongs to the ingestion side of the system; these traits only
//! describe the reads and the single status write that this crate performs.
//!
//! * [`OrderStore`] covers order eligibility, fan-out expansion, the conditional status update and NFT balances.
//! * [`ActivityStore`] holds the activity event backlog and the outbox of synthesized activity documents.
//! * [`ListingStore`] provides the ownership and metadata join used to build listing documents.
//!
//! [`SqliteDatabase`](crate::SqliteDatabase) implements all three.
mod activity_store;
mod listing_store;
mod order_store;

pub use activity_store::ActivityStore;
pub use listing_store::ListingStore;
pub use order_store::{OrderScope, OrderStore, StoreError};
