//! Lock-gated periodic triggers.
//!
//! Every replica runs the same trigger on the same interval. Before firing, a replica tries to take the trigger's
//! lock with a TTL shorter than the interval. The replica that gets it runs the action; the rest skip the tick
//! quietly. The lock is never released explicitly, so at most one replica fires per interval even if the action
//! finishes early.
use std::{fmt::Display, future::Future, time::Duration};

use log::*;
use tokio::task::JoinHandle;

use crate::locks::SchedulerLock;

pub struct PeriodicTrigger<L> {
    name: String,
    interval: Duration,
    lock: L,
}

impl<L: SchedulerLock> PeriodicTrigger<L> {
    pub fn new(name: &str, interval: Duration, lock: L) -> Self {
        Self { name: name.to_string(), interval, lock }
    }

    pub fn lock_name(&self) -> String {
        format!("{}-cron-lock", self.name)
    }

    /// One second short of the interval, or half the interval for sub-second-ish cadences.
    pub fn lock_ttl(&self) -> Duration {
        if self.interval > Duration::from_secs(1) {
            self.interval - Duration::from_secs(1)
        } else {
            self.interval / 2
        }
    }

    /// Runs one tick. Returns `true` if this replica won the lock and ran the action.
    pub async fn fire<F, Fut, E>(&self, action: &F) -> bool
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        let lock_name = self.lock_name();
        match self.lock.acquire(&[lock_name.as_str()], self.lock_ttl()).await {
            Ok(Some(_token)) => {
                trace!("🕰️ [{}] Lock acquired. Firing.", self.name);
                if let Err(e) = action().await {
                    error!("🕰️ [{}] Periodic action failed. {e}", self.name);
                }
                true
            },
            Ok(None) => {
                trace!("🕰️ [{}] Lock is held elsewhere. Skipping this tick.", self.name);
                false
            },
            Err(e) => {
                debug!("🕰️ [{}] Could not contact the lock service. Skipping this tick. {e}", self.name);
                false
            },
        }
    }

    /// Spawns the trigger loop. Do not await the returned handle, as it runs indefinitely.
    pub fn start<F, Fut, E>(self, action: F) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send,
        E: Display + Send,
    {
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(self.interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            info!("🕰️ [{}] Periodic trigger started. Interval: {:?}", self.name, self.interval);
            loop {
                timer.tick().await;
                self.fire(&action).await;
            }
        })
    }
}
