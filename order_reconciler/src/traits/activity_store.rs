use std::future::Future;

use crate::{
    db_types::{ActivityEventKind, TransferEventKey, TransferEventRow},
    pipelines::ActivityDocument,
    traits::StoreError,
};

/// Storage for the activity pipeline: the backlog of events waiting to be turned into activities, the rows those
/// events point at, and the outbox of finished activity documents.
pub trait ActivityStore: Clone + Send + Sync + 'static {
    /// Removes and returns up to `limit` of the oldest pending events of `kind`.
    fn pop_pending_events(
        &self,
        kind: ActivityEventKind,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<TransferEventKey>, StoreError>> + Send;

    /// Puts events (back) on the pending list for `kind`.
    fn push_pending_events(
        &self,
        kind: ActivityEventKind,
        events: &[TransferEventKey],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fetches the transfer rows for `keys`, joined with token and collection metadata where it exists. Keys that do
    /// not match a stored transfer are silently left out.
    fn fetch_transfer_events(
        &self,
        keys: &[TransferEventKey],
    ) -> impl Future<Output = Result<Vec<TransferEventRow>, StoreError>> + Send;

    /// Queues finished documents for the search index writer. Re-queuing a document with the same id replaces it.
    fn push_pending_activities(
        &self,
        activities: &[ActivityDocument],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
