//! Error handling for the TOB pipeline
//!
//! Defines the document- and transaction-level error taxonomy and
//! establishes a unified Result type using anyhow for context chaining.

use chrono::NaiveDate;
use thiserror::Error;

/// Document-level failures in the TOB pipeline
#[derive(Error, Debug)]
pub enum TobError {
    #[error("no known broker marker found in statement text")]
    UnknownBrokerFormat,

    #[error("statement contained no usable trade records")]
    EmptyStatement,

    #[error(transparent)]
    RateUnavailable(#[from] RateError),

    #[error("exchange rate feed unavailable: {0}")]
    FeedUnavailable(String),
}

/// Exchange rate resolution failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateError {
    #[error("no {currency} rate published on {date} or within {lookback} prior days")]
    Unavailable {
        currency: String,
        date: NaiveDate,
        lookback: u32,
    },
}

/// Result type alias for pipeline operations
pub type Result<T> = anyhow::Result<T>;
