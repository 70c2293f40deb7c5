//! # Reconciler worker
//!
//! The binary that hosts the order reconciliation and indexing queues. It wires the [`order_reconciler`] jobs to
//! a SQLite store, the protocol SDK service, a JSON-RPC provider and a search index, all configured from `RCW_*`
//! environment variables. See [`config::WorkerConfig`].
pub mod adapters;
pub mod cli;
pub mod config;
pub mod errors;
pub mod worker;
