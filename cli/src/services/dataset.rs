use crate::{
    error::{DataError, Result},
    models::{Company, CompanyRecord, IndexPoint, RawIndexRow},
    utils::{log_dataset, median, mode, Logger, Timer},
};
use serde::Serialize;
use std::{fs::File, path::Path};

/// Columns checked by the missing-value report, in file order
pub const COMPANY_COLUMNS: [&str; 16] = [
    "Exchange",
    "Symbol",
    "Shortname",
    "Longname",
    "Sector",
    "Industry",
    "Currentprice",
    "Marketcap",
    "Ebitda",
    "Revenuegrowth",
    "City",
    "State",
    "Country",
    "Fulltimeemployees",
    "Longbusinesssummary",
    "Weight",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingCount {
    pub column: &'static str,
    pub missing: usize,
}

/// Fundamentals and index levels loaded once at startup
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub companies: Vec<Company>,
    pub index: Vec<IndexPoint>,
    /// Missing-value counts observed before imputation
    pub missing: Vec<MissingCount>,
}

impl Dataset {
    pub fn load(companies_path: impl AsRef<Path>, index_path: impl AsRef<Path>) -> Result<Self> {
        let logger = Logger::new("DATASET");
        let timer = Timer::start("dataset load");

        let records = load_companies(&companies_path)?;
        let missing = missing_values(&records);
        let companies = impute(records)?;
        let index = load_index(&index_path)?;

        logger.info(&format!(
            "Loaded {} companies from {} and {} index points from {}",
            companies.len(),
            companies_path.as_ref().display(),
            index.len(),
            index_path.as_ref().display()
        ));
        for entry in missing.iter().filter(|m| m.missing > 0) {
            logger.debug(&format!("{} missing before imputation: {}", entry.column, entry.missing));
        }
        timer.log_elapsed("DATASET");

        Ok(Self { companies, index, missing })
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub fn load_companies(path: impl AsRef<Path>) -> Result<Vec<CompanyRecord>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_reader(open(path)?);
    let mut records = Vec::new();

    for result in reader.deserialize() {
        let record: CompanyRecord = result?;
        records.push(record);
    }

    if records.is_empty() {
        return Err(DataError::EmptyDataset(path.display().to_string()));
    }
    log_dataset(&format!("Parsed {} company rows", records.len()));
    Ok(records)
}

pub fn load_index(path: impl AsRef<Path>) -> Result<Vec<IndexPoint>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_reader(open(path)?);
    let mut points = Vec::new();

    for (row, result) in reader.deserialize().enumerate() {
        let raw: RawIndexRow = result?;
        let point = raw.to_index_point().map_err(|e| DataError::InvalidRow {
            row: row + 1,
            reason: format!("bad date '{}': {}", raw.date, e),
        })?;
        points.push(point);
    }

    if points.is_empty() {
        return Err(DataError::EmptyDataset(path.display().to_string()));
    }
    log_dataset(&format!("Parsed {} index rows", points.len()));
    Ok(points)
}

/// Per-column count of empty cells
pub fn missing_values(records: &[CompanyRecord]) -> Vec<MissingCount> {
    fn blank(s: &str) -> bool {
        s.trim().is_empty()
    }
    fn blank_opt(s: &Option<String>) -> bool {
        s.as_deref().map_or(true, blank)
    }

    COMPANY_COLUMNS
        .iter()
        .map(|&column| {
            let missing = records
                .iter()
                .filter(|r| match column {
                    "Exchange" => blank(&r.exchange),
                    "Symbol" => blank(&r.symbol),
                    "Shortname" => blank(&r.shortname),
                    "Longname" => blank(&r.longname),
                    "Sector" => blank(&r.sector),
                    "Industry" => blank(&r.industry),
                    "Currentprice" => r.current_price.is_none(),
                    "Marketcap" => r.market_cap.is_none(),
                    "Ebitda" => r.ebitda.is_none(),
                    "Revenuegrowth" => r.revenue_growth.is_none(),
                    "City" => blank_opt(&r.city),
                    "State" => blank_opt(&r.state),
                    "Country" => blank_opt(&r.country),
                    "Fulltimeemployees" => r.full_time_employees.is_none(),
                    "Longbusinesssummary" => blank_opt(&r.long_business_summary),
                    "Weight" => r.weight.is_none(),
                    _ => false,
                })
                .count();
            MissingCount { column, missing }
        })
        .collect()
}

fn median_of(records: &[CompanyRecord], column: &'static str, get: fn(&CompanyRecord) -> Option<f64>) -> Result<f64> {
    let present: Vec<f64> = records.iter().filter_map(get).filter(|v| v.is_finite()).collect();
    median(&present).ok_or(DataError::EmptyColumn(column))
}

/// Fill missing values: medians for Ebitda, Revenuegrowth and
/// Fulltimeemployees, the most frequent value for State.
pub fn impute(records: Vec<CompanyRecord>) -> Result<Vec<Company>> {
    let ebitda_fill = median_of(&records, "Ebitda", |r| r.ebitda)?;
    let growth_fill = median_of(&records, "Revenuegrowth", |r| r.revenue_growth)?;
    let employees_fill = median_of(&records, "Fulltimeemployees", |r| r.full_time_employees)?;

    let states: Vec<&str> = records
        .iter()
        .filter_map(|r| r.state.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let state_fill = mode(&states).ok_or(DataError::EmptyColumn("State"))?.to_string();

    log_dataset(&format!(
        "Imputation values: Ebitda={:.0} Revenuegrowth={:.4} Fulltimeemployees={:.0} State={}",
        ebitda_fill, growth_fill, employees_fill, state_fill
    ));

    records
        .into_iter()
        .enumerate()
        .map(|(row, r)| {
            let market_cap = r.market_cap.ok_or_else(|| DataError::InvalidRow {
                row: row + 1,
                reason: format!("missing Marketcap for {}", r.symbol),
            })?;
            let state = r
                .state
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| state_fill.clone());

            Ok(Company {
                exchange: r.exchange,
                symbol: r.symbol,
                shortname: r.shortname,
                longname: r.longname,
                sector: r.sector,
                industry: r.industry,
                current_price: r.current_price,
                market_cap,
                ebitda: r.ebitda.unwrap_or(ebitda_fill),
                revenue_growth: r.revenue_growth.unwrap_or(growth_fill),
                city: r.city,
                state,
                country: r.country,
                full_time_employees: r.full_time_employees.unwrap_or(employees_fill),
                long_business_summary: r.long_business_summary,
                weight: r.weight,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const COMPANIES_CSV: &str = "\
Exchange,Symbol,Shortname,Longname,Sector,Industry,Currentprice,Marketcap,Ebitda,Revenuegrowth,City,State,Country,Fulltimeemployees,Longbusinesssummary,Weight
NMS,AAPL,Apple Inc.,Apple Inc.,Technology,Consumer Electronics,254.49,3846819807232,134660997120,0.061,Cupertino,CA,United States,164000,Designs phones,0.069
NMS,NVDA,NVIDIA Corporation,NVIDIA Corporation,Technology,Semiconductors,134.7,3298803056640,61184000000,1.224,Santa Clara,CA,United States,29600,Makes GPUs,0.059
NYQ,JPM,JPMorgan Chase & Co.,JPMorgan Chase & Co.,Financial Services,Banks - Diversified,237.6,668945874944,,0.035,New York,NY,United States,,Banks things,0.012
NYQ,XOM,Exxon Mobil Corporation,Exxon Mobil Corporation,Energy,Oil & Gas Integrated,105.2,462419804160,73837003776,,Spring,TX,United States,62000,Drills,0.008
NYQ,ACN,Accenture plc,Accenture plc,Technology,Information Technology Services,350.0,219000000000,11000000000,0.05,Dublin,,Ireland,774000,Consults,0.004
";

    const INDEX_CSV: &str = "\
Date,S&P500
2014-12-22,2078.54
2014-12-23,2082.17
2014-12-24,2081.88
";

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_values_report() {
        let file = write_temp(COMPANIES_CSV);
        let records = load_companies(file.path()).unwrap();
        let missing = missing_values(&records);

        let get = |col: &str| missing.iter().find(|m| m.column == col).unwrap().missing;
        assert_eq!(get("Ebitda"), 1);
        assert_eq!(get("Revenuegrowth"), 1);
        assert_eq!(get("Fulltimeemployees"), 1);
        assert_eq!(get("State"), 1);
        assert_eq!(get("Symbol"), 0);
        assert_eq!(missing.len(), COMPANY_COLUMNS.len());
    }

    #[test]
    fn test_impute_median_and_mode() {
        let file = write_temp(COMPANIES_CSV);
        let companies = impute(load_companies(file.path()).unwrap()).unwrap();

        let jpm = companies.iter().find(|c| c.symbol == "JPM").unwrap();
        // median of 134.66B, 61.184B, 73.837B, 11B
        assert_eq!(jpm.ebitda, (61184000000.0 + 73837003776.0) / 2.0);
        // median of 164000, 29600, 62000, 774000
        assert_eq!(jpm.full_time_employees, (62000.0 + 164000.0) / 2.0);

        let xom = companies.iter().find(|c| c.symbol == "XOM").unwrap();
        // median of 0.061, 1.224, 0.035, 0.05
        assert!((xom.revenue_growth - 0.0555).abs() < 1e-12);

        let acn = companies.iter().find(|c| c.symbol == "ACN").unwrap();
        assert_eq!(acn.state, "CA");
    }

    #[test]
    fn test_impute_rejects_missing_market_cap() {
        let csv = COMPANIES_CSV.replace("3846819807232", "");
        let file = write_temp(&csv);
        let err = impute(load_companies(file.path()).unwrap()).unwrap_err();
        assert!(matches!(err, DataError::InvalidRow { row: 1, .. }));
    }

    #[test]
    fn test_load_index_parses_dates_in_order() {
        let file = write_temp(INDEX_CSV);
        let points = load_index(file.path()).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].date.to_string(), "2014-12-22");
        assert_eq!(points[2].value, 2081.88);
    }

    #[test]
    fn test_load_index_reports_bad_row() {
        let file = write_temp("Date,S&P500\n2014-12-22,1.0\nnot-a-date,2.0\n");
        let err = load_index(file.path()).unwrap_err();
        assert!(matches!(err, DataError::InvalidRow { row: 2, .. }));
    }

    #[test]
    fn test_dataset_load_and_missing_file() {
        let companies = write_temp(COMPANIES_CSV);
        let index = write_temp(INDEX_CSV);
        let dataset = Dataset::load(companies.path(), index.path()).unwrap();
        assert_eq!(dataset.companies.len(), 5);
        assert_eq!(dataset.index.len(), 3);

        let err = Dataset::load("/nonexistent/companies.csv", index.path()).unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }
}
