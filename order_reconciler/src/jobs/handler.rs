use std::{fmt::Debug, future::Future};

use serde::{de::DeserializeOwned, Serialize};

use crate::jobs::QueueConfig;

/// A background job type.
///
/// The handler declares its queue policy through [`JobHandler::config`] and does its work in
/// [`JobHandler::process`]. Returning an error hands the message back to the runner, which requeues it with the
/// configured backoff until the retry ceiling is reached. Handlers must be safe to run more than once for the same
/// payload, since delivery is at-least-once.
pub trait JobHandler: Send + Sync + 'static {
    type Payload: Serialize + DeserializeOwned + Debug + Send + Sync + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    fn config(&self) -> &QueueConfig;

    fn process(&self, payload: Self::Payload) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
