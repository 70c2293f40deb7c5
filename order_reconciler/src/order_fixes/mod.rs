//! # Order reconciliation
//!
//! The `order-fixes` job re-validates orders against the current on-chain state. A [`FixRequest`] either names a
//! single order, which is checked and transitioned, or a scope (token, maker or contract) that is expanded into one
//! single-order request per active order in the scope.
mod errors;
mod job;
mod request;

pub use errors::OrderFixError;
pub use job::{order_fixes_config, FixResult, OrderFixesJob, DEFAULT_FIX_PAGE_SIZE, ORDER_FIXES_QUEUE};
pub use request::FixRequest;
