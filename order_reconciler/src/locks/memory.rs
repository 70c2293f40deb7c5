use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::time::Instant;

use crate::locks::{CacheError, LockError, LockToken, SchedulerLock, SharedCache};

/// Locks that only coordinate tasks inside this process.
#[derive(Clone, Default)]
pub struct MemoryLockService {
    held: Arc<Mutex<HashMap<String, (String, Instant)>>>,
}

impl MemoryLockService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SchedulerLock for MemoryLockService {
    async fn acquire(&self, names: &[&str], ttl: Duration) -> Result<Option<LockToken>, LockError> {
        let mut held = self.held.lock().map_err(|e| LockError::Backend(e.to_string()))?;
        let now = Instant::now();
        if names.iter().any(|n| held.get(*n).is_some_and(|(_, expires_at)| *expires_at > now)) {
            return Ok(None);
        }
        let token = LockToken::new(names);
        for name in names {
            held.insert(name.to_string(), (token.token().to_string(), now + ttl));
        }
        Ok(Some(token))
    }
}

#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<HashMap<String, (String, Instant)>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SharedCache for MemoryCache {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, CacheError> {
        let mut entries = self.entries.lock().map_err(|e| CacheError::Backend(e.to_string()))?;
        let now = Instant::now();
        if entries.get(key).is_some_and(|(_, exp)| *exp > now) {
            return Ok(false);
        }
        entries.insert(key.to_string(), (value.to_string(), now + ttl));
        Ok(true)
    }

    async fn remove(&self, key: &str) -> Result<bool, CacheError> {
        let mut entries = self.entries.lock().map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(entries.remove(key).is_some_and(|(_, exp)| exp > Instant::now()))
    }
}
