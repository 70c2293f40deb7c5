//! # Indexing pipelines
//!
//! Background jobs built on the job runtime that turn domain events into search documents:
//! * [`ProcessActivityEventsJob`] drains the pending transfer events and synthesizes activity documents;
//! * [`ProcessTokenListingEventJob`] builds a listing document for every new sell order;
//! * [`MintsRefreshJob`] refreshes the mint configuration of a collection.
mod activities;
mod activity_documents;
mod errors;
mod mints;
mod token_listings;

pub use activities::{
    process_activity_events_config,
    start_activity_trigger,
    ActivityEventsProducer,
    ProcessActivityEventsJob,
    ProcessActivityEventsPayload,
    DEFAULT_ACTIVITY_BATCH_SIZE,
    PROCESS_ACTIVITY_EVENTS_QUEUE,
};
pub use activity_documents::{
    activity_id,
    ActivityCollection,
    ActivityDocument,
    ActivityEvent,
    ActivitySynthesizer,
    ActivityToken,
    ActivityType,
    ZERO_ADDRESS,
};
pub use errors::{IndexError, MintRefreshError, PipelineError};
pub use mints::{mints_refresh_config, MintRefresher, MintsRefreshJob, MintsRefreshPayload, MINTS_REFRESH_QUEUE};
pub use token_listings::{
    process_token_listing_event_config,
    ListingIndex,
    ListingOrderInfo,
    ListingOwnership,
    ListingPricing,
    ProcessTokenListingEventJob,
    TokenListingDocument,
    TokenListingEvent,
    TokenListingEventKind,
    PROCESS_TOKEN_LISTING_EVENT_QUEUE,
};
