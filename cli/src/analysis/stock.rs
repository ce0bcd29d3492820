use crate::{
    models::{Interval, StockDataPoint},
    utils::{ema, gaussian_kde, geometric_mean_change, histogram, mean, pct_change, sma, std_dev, Histogram},
};
use serde::Serialize;

/// Windows used for both the simple and exponential moving averages
pub const MA_WINDOWS: [usize; 3] = [10, 20, 50];
pub const RETURN_HISTOGRAM_BINS: usize = 50;
const KDE_POINTS: usize = 200;

#[derive(Debug, Clone, Serialize)]
pub struct MovingAverage {
    pub window: usize,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StockSummary {
    pub observations: usize,
    pub first_close: Option<f64>,
    pub last_close: Option<f64>,
    pub total_return: Option<f64>,
    pub mean_daily_return: Option<f64>,
    pub daily_volatility: Option<f64>,
    /// Average compounded change per bar
    pub geometric_mean_change: Option<f64>,
}

/// Everything the stock page derives from one price history
#[derive(Debug, Clone, Serialize)]
pub struct StockAnalysis {
    pub ticker: String,
    pub dates: Vec<String>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub closes: Vec<f64>,
    pub volumes: Vec<i64>,
    /// Bar-over-bar fractional change of the close; doubles as the daily return
    pub daily_change: Vec<Option<f64>>,
    pub sma: Vec<MovingAverage>,
    pub ema: Vec<MovingAverage>,
    pub return_histogram: Option<Histogram>,
    pub return_kde: Option<Vec<(f64, f64)>>,
    pub summary: StockSummary,
}

impl StockAnalysis {
    /// Intraday bars keep their time of day on the x axis
    pub fn from_history(points: &[StockDataPoint], interval: Interval) -> Self {
        let date_format = if interval.is_intraday() { "%Y-%m-%d %H:%M" } else { "%Y-%m-%d" };
        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        let daily_change = pct_change(&closes);
        let returns: Vec<f64> = daily_change.iter().flatten().copied().collect();

        let sma = MA_WINDOWS
            .iter()
            .map(|&window| MovingAverage { window, values: sma(&closes, window) })
            .collect();
        let ema = MA_WINDOWS
            .iter()
            .map(|&window| MovingAverage {
                window,
                values: ema(&closes, window).into_iter().map(Some).collect(),
            })
            .collect();

        let first_close = closes.first().copied();
        let last_close = closes.last().copied();
        let total_return = match (first_close, last_close) {
            (Some(first), Some(last)) if first != 0.0 && closes.len() > 1 => Some(last / first - 1.0),
            _ => None,
        };

        let summary = StockSummary {
            observations: closes.len(),
            first_close,
            last_close,
            total_return,
            mean_daily_return: mean(&returns),
            daily_volatility: std_dev(&returns),
            geometric_mean_change: geometric_mean_change(&closes),
        };

        Self {
            ticker: points.first().map(|p| p.ticker.clone()).unwrap_or_default(),
            dates: points.iter().map(|p| p.date.format(date_format).to_string()).collect(),
            open: points.iter().map(|p| p.open).collect(),
            high: points.iter().map(|p| p.high).collect(),
            low: points.iter().map(|p| p.low).collect(),
            volumes: points.iter().map(|p| p.volume).collect(),
            return_histogram: histogram(&returns, RETURN_HISTOGRAM_BINS),
            return_kde: gaussian_kde(&returns, KDE_POINTS),
            closes,
            daily_change,
            sma,
            ema,
            summary,
        }
    }

    pub fn sma(&self, window: usize) -> Option<&MovingAverage> {
        self.sma.iter().find(|m| m.window == window)
    }

    pub fn ema(&self, window: usize) -> Option<&MovingAverage> {
        self.ema.iter().find(|m| m.window == window)
    }
}
