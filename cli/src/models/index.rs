use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily S&P 500 index level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Raw row of `sp500_index.csv`
#[derive(Debug, Deserialize)]
pub struct RawIndexRow {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "S&P500")]
    pub value: f64,
}

impl RawIndexRow {
    pub fn to_index_point(&self) -> anyhow::Result<IndexPoint> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")?;
        Ok(IndexPoint { date, value: self.value })
    }
}

impl IndexPoint {
    /// Days since the Unix epoch, used when the date is a regression variable
    pub fn epoch_days(&self) -> f64 {
        self.date.signed_duration_since(epoch()).num_days() as f64
    }

    pub fn from_epoch_days(days: f64) -> NaiveDate {
        epoch() + chrono::Duration::days(days.round() as i64)
    }
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}
