use serde::{Deserialize, Serialize};

/// Market cap threshold separating mega caps from large caps ($200B)
pub const MEGA_CAP_THRESHOLD: f64 = 2.0e11;

/// Raw row of `sp500_companies.csv` before imputation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    #[serde(rename = "Exchange")]
    pub exchange: String,
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Shortname")]
    pub shortname: String,
    #[serde(rename = "Longname")]
    pub longname: String,
    #[serde(rename = "Sector")]
    pub sector: String,
    #[serde(rename = "Industry")]
    pub industry: String,
    #[serde(rename = "Currentprice")]
    pub current_price: Option<f64>,
    #[serde(rename = "Marketcap")]
    pub market_cap: Option<f64>,
    #[serde(rename = "Ebitda")]
    pub ebitda: Option<f64>,
    #[serde(rename = "Revenuegrowth")]
    pub revenue_growth: Option<f64>,
    #[serde(rename = "City")]
    pub city: Option<String>,
    #[serde(rename = "State")]
    pub state: Option<String>,
    #[serde(rename = "Country")]
    pub country: Option<String>,
    #[serde(rename = "Fulltimeemployees")]
    pub full_time_employees: Option<f64>,
    #[serde(rename = "Longbusinesssummary")]
    pub long_business_summary: Option<String>,
    #[serde(rename = "Weight")]
    pub weight: Option<f64>,
}

/// Company fundamentals after missing values have been filled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    #[serde(rename = "Exchange")]
    pub exchange: String,
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Shortname")]
    pub shortname: String,
    #[serde(rename = "Longname")]
    pub longname: String,
    #[serde(rename = "Sector")]
    pub sector: String,
    #[serde(rename = "Industry")]
    pub industry: String,
    #[serde(rename = "Currentprice")]
    pub current_price: Option<f64>,
    #[serde(rename = "Marketcap")]
    pub market_cap: f64,
    #[serde(rename = "Ebitda")]
    pub ebitda: f64,
    #[serde(rename = "Revenuegrowth")]
    pub revenue_growth: f64,
    #[serde(rename = "City")]
    pub city: Option<String>,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Country")]
    pub country: Option<String>,
    #[serde(rename = "Fulltimeemployees")]
    pub full_time_employees: f64,
    #[serde(rename = "Longbusinesssummary")]
    pub long_business_summary: Option<String>,
    #[serde(rename = "Weight")]
    pub weight: Option<f64>,
}

impl Company {
    /// Market capitalization to EBITDA ratio; `None` when EBITDA is zero
    pub fn mc_to_ebitda(&self) -> Option<f64> {
        if self.ebitda == 0.0 {
            None
        } else {
            Some(self.market_cap / self.ebitda)
        }
    }

    pub fn tier(&self) -> Option<CapTier> {
        CapTier::classify(self.market_cap)
    }
}

/// Numeric columns of the fundamentals table, in file order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericColumn {
    Currentprice,
    Marketcap,
    Ebitda,
    Revenuegrowth,
    Fulltimeemployees,
    Weight,
}

impl NumericColumn {
    pub const ALL: [NumericColumn; 6] = [
        NumericColumn::Currentprice,
        NumericColumn::Marketcap,
        NumericColumn::Ebitda,
        NumericColumn::Revenuegrowth,
        NumericColumn::Fulltimeemployees,
        NumericColumn::Weight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NumericColumn::Currentprice => "Currentprice",
            NumericColumn::Marketcap => "Marketcap",
            NumericColumn::Ebitda => "Ebitda",
            NumericColumn::Revenuegrowth => "Revenuegrowth",
            NumericColumn::Fulltimeemployees => "Fulltimeemployees",
            NumericColumn::Weight => "Weight",
        }
    }

    pub fn value(&self, company: &Company) -> Option<f64> {
        match self {
            NumericColumn::Currentprice => company.current_price,
            NumericColumn::Marketcap => Some(company.market_cap),
            NumericColumn::Ebitda => Some(company.ebitda),
            NumericColumn::Revenuegrowth => Some(company.revenue_growth),
            NumericColumn::Fulltimeemployees => Some(company.full_time_employees),
            NumericColumn::Weight => company.weight,
        }
    }
}

impl std::str::FromStr for NumericColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NumericColumn::ALL
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown numeric column: {}", s))
    }
}

/// Size tier of an S&P 500 constituent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapTier {
    /// Market cap strictly above $200B
    Mega,
    /// Market cap strictly below $200B
    Large,
}

impl CapTier {
    /// Companies sitting exactly on the threshold belong to neither tier.
    pub fn classify(market_cap: f64) -> Option<CapTier> {
        if market_cap > MEGA_CAP_THRESHOLD {
            Some(CapTier::Mega)
        } else if market_cap < MEGA_CAP_THRESHOLD {
            Some(CapTier::Large)
        } else {
            None
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CapTier::Mega => "Mega Cap",
            CapTier::Large => "Large Cap",
        }
    }
}
