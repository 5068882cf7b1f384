use std::fmt;

use thiserror::Error;

use crate::domain::OrderStatus;

/// Errors raised by a single order operation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("invalid status: cannot {operation} an order that is {status}")]
    InvalidState {
        operation: &'static str,
        status: OrderStatus,
    },
    #[error("item name must not be empty")]
    EmptyItemName,
}

/// Step of `perform_order` that was running when it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStep {
    AddItem(String),
    Pay,
    Deliver,
}

impl fmt::Display for OrderStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStep::AddItem(product) => write!(f, "adding product {product:?}"),
            OrderStep::Pay => f.write_str("performing payment"),
            OrderStep::Deliver => f.write_str("performing delivery"),
        }
    }
}

/// An [`OrderError`] tagged with the step that produced it.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("error {step}: {source}")]
pub struct StepError {
    pub step: OrderStep,
    #[source]
    pub source: OrderError,
}

impl StepError {
    pub fn new(step: OrderStep, source: OrderError) -> Self {
        Self { step, source }
    }
}

/// Failure of one work item in a dispatched batch.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkError {
    #[error(transparent)]
    Order(#[from] StepError),
    #[error("worker aborted: {0}")]
    Aborted(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var} must be at most {max}, got {value}")]
    OutOfRange {
        var: &'static str,
        value: usize,
        max: usize,
    },
    #[error("{var} must be true/false or 1/0, got {value:?}")]
    InvalidFlag { var: &'static str, value: String },
    #[error("unknown id scheme {0:?} (expected \"sequential\" or \"clock\")")]
    InvalidIdScheme(String),
    #[error("concurrency limit must be at least 1")]
    ZeroConcurrency,
}
