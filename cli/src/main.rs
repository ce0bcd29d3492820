use sp500::{
    analysis::{numeric_correlation, sector_summaries, sorted_by, tier_summary, IndexTrend, CV_FOLDS},
    models::{CapTier, HistoryRequest, Interval, NumericColumn, Period},
    services::{normalize_ticker, Dataset, Stock, YahooClient, YahooConfig},
    utils::{init_logger, parse_date, Describe},
};

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sp500")]
#[command(about = "A CLI for exploring S&P 500 fundamentals, index levels and single-ticker price history")]
pub struct Cli {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct DataArgs {
    /// Path to the constituent fundamentals CSV
    #[arg(long, global = true, default_value = "data/sp500_companies.csv")]
    pub companies: PathBuf,
    /// Path to the index level CSV
    #[arg(long, global = true, default_value = "data/sp500_index.csv")]
    pub index: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Row counts and the largest constituents
    Summary {
        /// Number of companies to list
        #[arg(short, long, default_value_t = 10)]
        top: usize,
    },
    /// Missing values per column before imputation
    Missing,
    /// Market cap, EBITDA and outliers per sector
    Sectors,
    /// Lower-triangle correlation matrix of the numeric columns
    Correlation,
    /// Mc/EBITDA comparison of mega and large caps
    Valuation,
    /// Linear fit of date against index level
    Trend,
    /// Fetch and summarize a ticker's price history
    Stock {
        #[arg(short, long, default_value = "NFLX")]
        ticker: String,
        #[arg(short, long, default_value = "1y")]
        period: Period,
        #[arg(short, long, default_value = "1d")]
        interval: Interval,
        /// Start date (YYYY-MM-DD); overrides the period
        #[arg(long)]
        start: Option<String>,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
    },
}

fn print_describe(label: &str, describe: Option<&Describe>) {
    println!("\n{}", label);
    match describe {
        Some(d) => {
            for (stat, value) in d.rows() {
                println!("  {:<6} {:>14.2}", stat, value);
            }
        }
        None => println!("  (no data)"),
    }
}

fn billions(value: f64) -> String {
    format!("${:.1}B", value / 1e9)
}

async fn run_stock(
    ticker: &str,
    period: Period,
    interval: Interval,
    start: Option<&str>,
    end: Option<&str>,
) -> anyhow::Result<()> {
    let ticker = normalize_ticker(ticker)?;
    let mut request = HistoryRequest::new(&ticker).with_period(period).with_interval(interval);
    if start.is_some() || end.is_some() {
        let start = start.map(parse_date).transpose()?;
        let end = end.map(parse_date).transpose()?;
        request = request.with_range(start, end);
    }

    let client = YahooClient::new(YahooConfig::default())?;
    let stock = Stock::fetch(&client, request).await?;
    let analysis = stock.analysis();
    let summary = &analysis.summary;

    println!(
        "📈 {} ({} bars, {} / {})",
        stock.ticker(),
        summary.observations,
        period.as_str(),
        interval.as_str()
    );
    if let (Some(first), Some(last)) = (analysis.dates.first(), analysis.dates.last()) {
        println!("   Range:              {} → {}", first, last);
    }
    if let (Some(first), Some(last)) = (summary.first_close, summary.last_close) {
        println!("   Close:              {:.2} → {:.2}", first, last);
    }
    if let Some(total) = summary.total_return {
        println!("   Total return:       {:.2}%", total * 100.0);
    }
    if let Some(mean) = summary.mean_daily_return {
        println!("   Mean daily return:  {:.4}%", mean * 100.0);
    }
    if let Some(vol) = summary.daily_volatility {
        println!("   Daily volatility:   {:.4}%", vol * 100.0);
    }
    if let Some(geo) = summary.geometric_mean_change {
        println!("   Geometric mean:     {:.4}%", geo * 100.0);
    }
    for (kind, averages) in [("SMA", &analysis.sma), ("EMA", &analysis.ema)] {
        for ma in averages {
            if let Some(Some(last)) = ma.values.last() {
                println!("   {}-day {}:{:>10.2}", ma.window, kind, last);
            }
        }
    }
    Ok(())
}

fn run_report(command: Commands, dataset: &Dataset) -> anyhow::Result<()> {
    match command {
        Commands::Summary { top } => {
            println!(
                "📊 {} companies, {} index points ({} → {})",
                dataset.companies.len(),
                dataset.index.len(),
                dataset.index.first().map(|p| p.date.to_string()).unwrap_or_default(),
                dataset.index.last().map(|p| p.date.to_string()).unwrap_or_default(),
            );
            let total: f64 = dataset.companies.iter().map(|c| c.market_cap).sum();
            println!("   Total market cap: {}", billions(total));
            println!("\nTop {} by market cap:", top);
            for company in sorted_by(&dataset.companies, NumericColumn::Marketcap).iter().take(top) {
                println!(
                    "  {:<6} {:<32} {:<24} {:>12}",
                    company.symbol,
                    company.shortname,
                    company.sector,
                    billions(company.market_cap)
                );
            }
        }
        Commands::Missing => {
            println!("🔍 Missing values before imputation:");
            for entry in &dataset.missing {
                println!("  {:<20} {:>5}", entry.column, entry.missing);
            }
        }
        Commands::Sectors => {
            for summary in sector_summaries(&dataset.companies) {
                println!(
                    "\n🏢 {} ({} companies): cap {}, EBITDA {}, median growth {:.2}%",
                    summary.sector,
                    summary.companies,
                    billions(summary.total_market_cap),
                    billions(summary.total_ebitda),
                    summary.median_revenue_growth * 100.0
                );
                if !summary.outliers.is_empty() {
                    println!(
                        "   {} outliers hold {:.2}% ({}) of sector market cap:",
                        summary.outliers.len(),
                        summary.outlier_share * 100.0,
                        billions(summary.outlier_market_cap)
                    );
                    for outlier in &summary.outliers {
                        println!("     {:<6} {:<32} {:>12}", outlier.symbol, outlier.shortname, billions(outlier.market_cap));
                    }
                }
            }
        }
        Commands::Correlation => {
            let matrix = numeric_correlation(&dataset.companies);
            print!("{:<18}", "");
            for label in &matrix.labels {
                print!("{:>18}", label);
            }
            println!();
            for (label, row) in matrix.labels.iter().zip(matrix.lower_triangle()) {
                print!("{:<18}", label);
                for value in row {
                    match value {
                        Some(v) => print!("{:>18.3}", v),
                        None => print!("{:>18}", ""),
                    }
                }
                println!();
            }
        }
        Commands::Valuation => {
            for tier in [CapTier::Mega, CapTier::Large] {
                let summary = tier_summary(&dataset.companies, tier);
                println!(
                    "\n💰 {}: {} companies, {:.2}% of index market cap",
                    summary.label,
                    summary.companies,
                    summary.market_cap_share * 100.0
                );
                print_describe("   Mc/EBITDA", summary.mc_to_ebitda.as_ref());
            }
        }
        Commands::Trend => {
            let trend = IndexTrend::fit(&dataset.index)?;
            println!("📉 Date ~ S&P500 linear fit");
            println!("   slope:      {:.6} days per point", trend.model.slope);
            println!("   R²:         {:.4}", trend.r2);
            println!(
                "   CV R² ({}):  {}",
                CV_FOLDS,
                trend.cv_mean.map(|m| format!("{:.4}", m)).unwrap_or_else(|| "n/a".to_string())
            );
        }
        Commands::Stock { .. } => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Stock { ticker, period, interval, start, end } => {
            run_stock(&ticker, period, interval, start.as_deref(), end.as_deref()).await?;
        }
        command => {
            let dataset = Dataset::load(&cli.data.companies, &cli.data.index)?;
            run_report(command, &dataset)?;
        }
    }

    Ok(())
}
