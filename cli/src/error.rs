//! Error types for data loading and market-data access

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DataError>;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid value in row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    #[error("Column {0} has no values to impute from")]
    EmptyColumn(&'static str),

    #[error("Dataset {0} is empty")]
    EmptyDataset(String),
}

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid ticker symbol: {0}")]
    InvalidTicker(String),

    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Provider error {code}: {description}")]
    Provider { code: String, description: String },

    #[error("Rate limited by provider")]
    RateLimit,

    #[error("No price data returned for {0}")]
    NoData(String),

    #[error("Max retries exceeded: {0}")]
    RetriesExhausted(String),
}

impl MarketDataError {
    /// Whether the request itself was bad or named a symbol with no data,
    /// as opposed to the provider failing
    pub fn is_client_error(&self) -> bool {
        match self {
            MarketDataError::InvalidTicker(_)
            | MarketDataError::InvalidRange(_)
            | MarketDataError::NoData(_) => true,
            MarketDataError::Provider { code, .. } => code.eq_ignore_ascii_case("not found"),
            _ => false,
        }
    }
}
