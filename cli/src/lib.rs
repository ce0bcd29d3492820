//! # sp500 - S&P 500 Fundamentals and Price History Analysis
//!
//! Library behind the S&P 500 insights dashboard:
//! - CSV loading and imputation of constituent fundamentals and index levels
//! - Descriptive statistics, correlations and a date-vs-index regression
//! - Moving averages, daily returns and their distribution for a single ticker
//! - Plotly figure builders for every dashboard chart
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sp500::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dataset = Dataset::load("data/sp500_companies.csv", "data/sp500_index.csv")?;
//!     println!("{} sectors", sector_summaries(&dataset.companies).len());
//!
//!     let client = YahooClient::new(YahooConfig::default())?;
//!     let stock = Stock::fetch(&client, HistoryRequest::new("NFLX")).await?;
//!     println!("last close: {:?}", stock.analysis().summary.last_close);
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod charts;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub mod prelude {
    //! Commonly used types and functions
    //!
    //! ```rust
    //! use sp500::prelude::*;
    //! ```

    pub use crate::analysis::{
        numeric_correlation, sector_summaries, tier_summary, IndexTrend, SectorSummary, StockAnalysis,
        TierSummary,
    };
    pub use crate::charts::Figure;
    pub use crate::error::{DataError, MarketDataError};
    pub use crate::models::{CapTier, Company, HistoryRequest, IndexPoint, Interval, NumericColumn, Period, StockDataPoint};
    pub use crate::services::{Dataset, PriceFeed, Stock, YahooClient, YahooConfig};
}

pub use utils::{init_logger, Logger, Timer};
