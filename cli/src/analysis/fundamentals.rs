//! Sector and size-tier analysis of the constituent fundamentals

use crate::{
    models::{CapTier, Company, NumericColumn},
    utils::{correlation_matrix, median, quantile_sorted, CorrelationMatrix, Describe},
};
use serde::Serialize;
use std::collections::HashMap;

/// Companies ordered by a numeric column, largest first
pub fn sorted_by(companies: &[Company], column: NumericColumn) -> Vec<Company> {
    let mut sorted = companies.to_vec();
    sorted.sort_by(|a, b| {
        let av = column.value(a).unwrap_or(f64::NEG_INFINITY);
        let bv = column.value(b).unwrap_or(f64::NEG_INFINITY);
        bv.total_cmp(&av)
    });
    sorted
}

/// Box-plot statistics with Tukey fences
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub lower_fence: f64,
    pub upper_fence: f64,
    /// Most extreme observations still inside the fences
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    /// Observations outside `Q1 - 1.5 IQR .. Q3 + 1.5 IQR`
    pub outliers: Vec<f64>,
    /// Observations outside `Q1 - 3 IQR .. Q3 + 3 IQR`
    pub suspected_outliers: Vec<f64>,
}

pub fn box_stats(values: &[f64]) -> Option<BoxStats> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let q1 = quantile_sorted(&sorted, 0.25)?;
    let median = quantile_sorted(&sorted, 0.5)?;
    let q3 = quantile_sorted(&sorted, 0.75)?;
    let iqr = q3 - q1;
    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    let inside = sorted.iter().filter(|v| **v >= lower_fence && **v <= upper_fence);
    let lower_whisker = inside.clone().next().copied().unwrap_or(q1);
    let upper_whisker = inside.last().copied().unwrap_or(q3);

    Some(BoxStats {
        q1,
        median,
        q3,
        lower_fence,
        upper_fence,
        lower_whisker,
        upper_whisker,
        outliers: sorted.iter().copied().filter(|v| *v < lower_fence || *v > upper_fence).collect(),
        suspected_outliers: sorted
            .iter()
            .copied()
            .filter(|v| *v < q1 - 3.0 * iqr || *v > q3 + 3.0 * iqr)
            .collect(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlierCompany {
    pub symbol: String,
    pub shortname: String,
    pub industry: String,
    pub market_cap: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectorSummary {
    pub sector: String,
    pub companies: usize,
    pub total_market_cap: f64,
    pub total_ebitda: f64,
    pub median_revenue_growth: f64,
    pub market_cap_box: BoxStats,
    /// Companies above the upper market-cap fence, largest first
    pub outliers: Vec<OutlierCompany>,
    pub outlier_market_cap: f64,
    /// Fraction of the sector's market cap held by the outliers
    pub outlier_share: f64,
}

/// Per-sector aggregates ordered by total market cap, largest first
pub fn sector_summaries(companies: &[Company]) -> Vec<SectorSummary> {
    let mut by_sector: HashMap<&str, Vec<&Company>> = HashMap::new();
    for company in companies {
        by_sector.entry(company.sector.as_str()).or_default().push(company);
    }

    let mut summaries: Vec<SectorSummary> = by_sector
        .into_iter()
        .filter_map(|(sector, members)| {
            let caps: Vec<f64> = members.iter().map(|c| c.market_cap).collect();
            let growth: Vec<f64> = members.iter().map(|c| c.revenue_growth).collect();
            let market_cap_box = box_stats(&caps)?;
            let total_market_cap: f64 = caps.iter().sum();

            let mut outliers: Vec<OutlierCompany> = members
                .iter()
                .filter(|c| c.market_cap > market_cap_box.upper_fence)
                .map(|c| OutlierCompany {
                    symbol: c.symbol.clone(),
                    shortname: c.shortname.clone(),
                    industry: c.industry.clone(),
                    market_cap: c.market_cap,
                })
                .collect();
            outliers.sort_by(|a, b| b.market_cap.total_cmp(&a.market_cap));
            let outlier_market_cap: f64 = outliers.iter().map(|o| o.market_cap).sum();

            Some(SectorSummary {
                sector: sector.to_string(),
                companies: members.len(),
                total_market_cap,
                total_ebitda: members.iter().map(|c| c.ebitda).sum(),
                median_revenue_growth: median(&growth)?,
                market_cap_box,
                outliers,
                outlier_market_cap,
                outlier_share: if total_market_cap > 0.0 {
                    outlier_market_cap / total_market_cap
                } else {
                    0.0
                },
            })
        })
        .collect();

    summaries.sort_by(|a, b| b.total_market_cap.total_cmp(&a.total_market_cap));
    summaries
}

/// Pairwise correlations of the raw numeric columns (no derived ratios)
pub fn numeric_correlation(companies: &[Company]) -> CorrelationMatrix {
    let columns: Vec<(String, Vec<Option<f64>>)> = NumericColumn::ALL
        .iter()
        .map(|col| {
            (
                col.as_str().to_string(),
                companies.iter().map(|c| col.value(c)).collect(),
            )
        })
        .collect();

    correlation_matrix(&columns)
}

pub fn tier(companies: &[Company], tier: CapTier) -> Vec<Company> {
    companies
        .iter()
        .filter(|c| c.tier() == Some(tier))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct TierSummary {
    pub tier: CapTier,
    pub label: &'static str,
    pub companies: usize,
    pub total_market_cap: f64,
    /// Fraction of the whole index's market cap
    pub market_cap_share: f64,
    /// `describe()` of the finite Mc/EBITDA ratios
    pub mc_to_ebitda: Option<Describe>,
}

pub fn tier_summary(companies: &[Company], tier_kind: CapTier) -> TierSummary {
    let members = tier(companies, tier_kind);
    let grand_total: f64 = companies.iter().map(|c| c.market_cap).sum();
    let total_market_cap: f64 = members.iter().map(|c| c.market_cap).sum();
    let ratios: Vec<f64> = members
        .iter()
        .filter_map(Company::mc_to_ebitda)
        .filter(|r| r.is_finite())
        .collect();

    TierSummary {
        tier: tier_kind,
        label: tier_kind.label(),
        companies: members.len(),
        total_market_cap,
        market_cap_share: if grand_total > 0.0 { total_market_cap / grand_total } else { 0.0 },
        mc_to_ebitda: Describe::from_values(&ratios),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(symbol: &str, sector: &str, market_cap: f64, ebitda: f64, growth: f64) -> Company {
        Company {
            exchange: "NYQ".to_string(),
            symbol: symbol.to_string(),
            shortname: format!("{} Inc.", symbol),
            longname: format!("{} Incorporated", symbol),
            sector: sector.to_string(),
            industry: format!("{} Services", sector),
            current_price: Some(50.0),
            market_cap,
            ebitda,
            revenue_growth: growth,
            city: None,
            state: "NY".to_string(),
            country: None,
            full_time_employees: 500.0,
            long_business_summary: None,
            weight: Some(market_cap / 1e13),
        }
    }

    fn sample() -> Vec<Company> {
        vec![
            company("AAA", "Technology", 3.0e12, 1.2e11, 0.10),
            company("BBB", "Technology", 2.0e10, 2.0e9, 0.05),
            company("CCC", "Technology", 2.5e10, 2.5e9, 0.20),
            company("DDD", "Technology", 3.0e10, 1.0e9, -0.02),
            company("EEE", "Technology", 2.2e10, 0.0, 0.07),
            company("FFF", "Energy", 4.0e11, 7.0e10, -0.10),
            company("GGG", "Energy", 5.0e10, 1.0e10, 0.01),
        ]
    }

    #[test]
    fn test_sorted_by_descending() {
        let sorted = sorted_by(&sample(), NumericColumn::Ebitda);
        assert_eq!(sorted[0].symbol, "AAA");
        assert_eq!(sorted.last().unwrap().symbol, "EEE");
    }

    #[test]
    fn test_box_stats_fences_and_outliers() {
        let stats = box_stats(&[1.0, 2.0, 3.0, 4.0, 5.0, 100.0]).unwrap();
        assert_eq!(stats.q1, 2.25);
        assert_eq!(stats.q3, 4.75);
        assert_eq!(stats.upper_fence, 8.5);
        assert_eq!(stats.upper_whisker, 5.0);
        assert_eq!(stats.lower_whisker, 1.0);
        assert_eq!(stats.outliers, vec![100.0]);
        assert_eq!(stats.suspected_outliers, vec![100.0]);
        assert!(box_stats(&[]).is_none());
    }

    #[test]
    fn test_sector_summaries_outlier_share() {
        let summaries = sector_summaries(&sample());
        assert_eq!(summaries[0].sector, "Technology");
        assert_eq!(summaries[1].sector, "Energy");

        let tech = &summaries[0];
        assert_eq!(tech.companies, 5);
        assert_eq!(tech.outliers.len(), 1);
        assert_eq!(tech.outliers[0].symbol, "AAA");
        let expected = 3.0e12 / (3.0e12 + 2.0e10 + 2.5e10 + 3.0e10 + 2.2e10);
        assert!((tech.outlier_share - expected).abs() < 1e-12);
        assert_eq!(tech.median_revenue_growth, 0.07);
    }

    #[test]
    fn test_tier_summary_excludes_zero_ebitda() {
        let companies = sample();
        let mega = tier_summary(&companies, CapTier::Mega);
        assert_eq!(mega.companies, 2);
        let ratios = mega.mc_to_ebitda.unwrap();
        assert_eq!(ratios.count, 2);
        assert_eq!(ratios.min, 4.0e11 / 7.0e10);
        assert_eq!(ratios.max, 25.0);

        let large = tier_summary(&companies, CapTier::Large);
        assert_eq!(large.companies, 5);
        // EEE has zero EBITDA and is left out of the ratio table
        assert_eq!(large.mc_to_ebitda.unwrap().count, 4);
        assert!((mega.market_cap_share + large.market_cap_share - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_numeric_correlation_labels() {
        let matrix = numeric_correlation(&sample());
        assert_eq!(matrix.labels.len(), 6);
        assert_eq!(matrix.labels.last().unwrap(), "Weight");
        assert!(matrix.get("Mc/EBITDA", "Marketcap").is_none());
        assert_eq!(matrix.get("Marketcap", "Marketcap"), Some(1.0));
        let r = matrix.get("Marketcap", "Ebitda").unwrap();
        assert!(r > 0.8);
        // Current price is constant in the fixture
        assert!(matrix.get("Currentprice", "Marketcap").unwrap().is_nan());
    }
}
