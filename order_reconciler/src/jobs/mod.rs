//! # Retrying job queues
//!
//! Every background task in the reconciler is a named queue with a typed payload and a declared delivery policy
//! ([`QueueConfig`]): a retry ceiling, a concurrency limit, a [`Backoff`] strategy, a persistence flag and "lazy"
//! (coalescing) mode.
//!
//! * [`JobHandler`] is implemented by each job type. It owns the policy and the `process` entry point.
//! * [`JobQueue`] is the typed sending side: `send` and `send_batch`.
//! * [`JobRunner`] is the consuming side. It pulls messages from a [`MessageBroker`], runs up to `concurrency`
//!   handlers at once, and acknowledges, requeues with backoff or dead-letters each delivery.
//!
//! Delivery and persistence guarantees (at-least-once, no ordering across messages) belong to the broker. The
//! [`InMemoryBroker`] provides them for a single process and for tests.
mod backoff;
mod broker;
mod config;
mod errors;
mod handler;
mod memory_broker;
mod message;
mod queue;
mod runner;

pub use backoff::Backoff;
pub use broker::{MessageBroker, PublishOutcome};
pub use config::QueueConfig;
pub use errors::{BrokerError, JobError};
pub use handler::JobHandler;
pub use memory_broker::{DeadLetter, InMemoryBroker};
pub use message::JobMessage;
pub use queue::{BatchReport, JobQueue};
pub use runner::{DeliveryOutcome, JobRunner};
