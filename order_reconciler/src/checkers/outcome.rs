use std::fmt::Display;

use crate::{
    checkers::CheckFailure,
    db_types::{ApprovalStatus, FillabilityStatus, OrderStatus},
};

/// The classification of an order after a protocol check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Ok,
    Cancelled,
    Filled,
    NoBalance,
    NoApproval,
    NoBalanceAndNoApproval,
    /// The check failed in a way that says nothing about the order. Processing of the order stops and nothing is
    /// written; the next fix request will try again.
    Unrecognized(String),
}

impl CheckOutcome {
    /// The status the order should be stored with, or `None` if the outcome must not cause a write.
    ///
    /// Every outcome maps to an absolute pair, starting from `fillable/approved`. An `Ok` outcome therefore restores
    /// an order that was previously marked `no-balance` or `no-approval`.
    pub fn target_status(&self) -> Option<OrderStatus> {
        use ApprovalStatus::*;
        use FillabilityStatus::*;
        let status = match self {
            CheckOutcome::Ok => OrderStatus::new(Fillable, Approved),
            CheckOutcome::Cancelled => OrderStatus::new(Cancelled, Approved),
            CheckOutcome::Filled => OrderStatus::new(Filled, Approved),
            CheckOutcome::NoBalance => OrderStatus::new(NoBalance, Approved),
            CheckOutcome::NoApproval => OrderStatus::new(Fillable, NoApproval),
            CheckOutcome::NoBalanceAndNoApproval => OrderStatus::new(NoBalance, NoApproval),
            CheckOutcome::Unrecognized(_) => return None,
        };
        Some(status)
    }

    pub fn unrecognized<E: Display>(e: E) -> Self {
        CheckOutcome::Unrecognized(e.to_string())
    }
}

impl From<CheckFailure> for CheckOutcome {
    fn from(failure: CheckFailure) -> Self {
        match failure {
            CheckFailure::Cancelled => CheckOutcome::Cancelled,
            CheckFailure::Filled => CheckOutcome::Filled,
            CheckFailure::NoBalance => CheckOutcome::NoBalance,
            CheckFailure::NoApproval => CheckOutcome::NoApproval,
            CheckFailure::NoBalanceNoApproval => CheckOutcome::NoBalanceAndNoApproval,
            CheckFailure::Other(reason) => CheckOutcome::Unrecognized(reason),
        }
    }
}

impl From<Result<(), CheckFailure>> for CheckOutcome {
    fn from(result: Result<(), CheckFailure>) -> Self {
        match result {
            Ok(()) => CheckOutcome::Ok,
            Err(failure) => failure.into(),
        }
    }
}
