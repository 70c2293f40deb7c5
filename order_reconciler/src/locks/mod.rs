//! Cross-replica coordination primitives.
//!
//! [`SchedulerLock`] is a named, expiring lock used to elect a single replica for periodic work. [`SharedCache`] is a
//! small key-value store with TTLs, used to throttle repeated work across replicas. Both have an in-process
//! implementation here and a SQLite-backed one in the database module.
mod memory;

use std::{future::Future, time::Duration};

pub use memory::{MemoryCache, MemoryLockService};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum LockError {
    #[error("Lock backend error. {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("Cache backend error. {0}")]
    Backend(String),
}

/// Proof of a held lock over one or more names. The lock lapses when its TTL runs out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    names: Vec<String>,
    token: String,
}

impl LockToken {
    pub fn new(names: &[&str]) -> Self {
        let names = names.iter().map(|n| n.to_string()).collect();
        Self { names, token: format!("{:032x}", rand::random::<u128>()) }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

pub trait SchedulerLock: Clone + Send + Sync + 'static {
    /// Tries to take every named lock without waiting. Either all names are taken or none are. `Ok(None)` means
    /// another holder has at least one of them.
    fn acquire(
        &self,
        names: &[&str],
        ttl: Duration,
    ) -> impl Future<Output = Result<Option<LockToken>, LockError>> + Send;
}

pub trait SharedCache: Clone + Send + Sync + 'static {
    /// Stores the value only if the key is absent or expired. Returns `true` if this call stored it.
    fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, CacheError>> + Send;

    /// Deletes the key. Returns `true` if an unexpired entry was removed.
    fn remove(&self, key: &str) -> impl Future<Output = Result<bool, CacheError>> + Send;
}
