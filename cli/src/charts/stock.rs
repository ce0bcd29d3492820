use super::{histogram_traces, Figure};
use crate::analysis::{StockAnalysis, RETURN_HISTOGRAM_BINS};
use serde_json::json;

const SMA_COLORS: [&str; 3] = ["green", "orange", "red"];
const EMA_COLORS: [&str; 3] = ["purple", "brown", "pink"];

pub fn close_price(analysis: &StockAnalysis) -> Figure {
    Figure::new(&format!("{} Closing Price", analysis.ticker))
        .height(400)
        .trace(json!({
            "type": "scatter",
            "mode": "lines",
            "name": "Close",
            "x": analysis.dates,
            "y": analysis.closes,
            "line": { "color": "green" },
        }))
}

pub fn volume(analysis: &StockAnalysis) -> Figure {
    Figure::new(&format!("{} Trading Volume", analysis.ticker))
        .height(400)
        .trace(json!({
            "type": "bar",
            "name": "Volume",
            "x": analysis.dates,
            "y": analysis.volumes,
            "marker": { "color": "orange" },
        }))
}

/// Daily percentage change with a dashed zero line
pub fn daily_change(analysis: &StockAnalysis) -> Figure {
    Figure::new(&format!("{} Daily Change", analysis.ticker))
        .height(400)
        .trace(json!({
            "type": "scatter",
            "mode": "lines",
            "name": "Change",
            "x": analysis.dates,
            "y": analysis.daily_change,
            "line": { "color": "green" },
        }))
        .layout(
            "shapes",
            json!([{
                "type": "line",
                "xref": "paper",
                "x0": 0,
                "x1": 1,
                "y0": 0,
                "y1": 0,
                "line": { "color": "#fa6f6f", "dash": "dash" },
            }]),
        )
}

/// Close with the 10, 20 and 50 bar SMA and EMA overlays
pub fn moving_averages(analysis: &StockAnalysis) -> Figure {
    let mut figure = Figure::new(&format!(
        "{} Stock Price with 10-Day, 20-Day, and 50-Day SMA and EMA",
        analysis.ticker
    ))
    .height(550)
    .layout("xaxis", json!({ "title": { "text": "Date" } }))
    .layout("yaxis", json!({ "title": { "text": "Price" } }))
    .trace(json!({
        "type": "scatter",
        "mode": "lines",
        "name": "Close Price",
        "x": analysis.dates,
        "y": analysis.closes,
        "line": { "color": "blue" },
    }));

    for (ma, color) in analysis.sma.iter().zip(SMA_COLORS) {
        figure = figure.trace(json!({
            "type": "scatter",
            "mode": "lines",
            "name": format!("{}-Day SMA", ma.window),
            "x": analysis.dates,
            "y": ma.values,
            "line": { "color": color },
        }));
    }
    for (ma, color) in analysis.ema.iter().zip(EMA_COLORS) {
        figure = figure.trace(json!({
            "type": "scatter",
            "mode": "lines",
            "name": format!("{}-Day EMA", ma.window),
            "x": analysis.dates,
            "y": ma.values,
            "line": { "color": color },
        }));
    }
    figure
}

pub fn daily_returns(analysis: &StockAnalysis) -> Figure {
    Figure::new("Daily Returns Line Plot")
        .height(400)
        .layout("xaxis", json!({ "title": { "text": "Date" } }))
        .layout("yaxis", json!({ "title": { "text": "Daily Return" } }))
        .trace(json!({
            "type": "scatter",
            "mode": "lines+markers",
            "name": "Daily Return",
            "x": analysis.dates,
            "y": analysis.daily_change,
            "line": { "color": "blue", "dash": "dot" },
            "marker": { "size": 4 },
        }))
}

pub fn return_histogram(analysis: &StockAnalysis) -> Figure {
    let returns: Vec<f64> = analysis.daily_change.iter().flatten().copied().collect();
    histogram_traces(&returns, RETURN_HISTOGRAM_BINS, "green", "Daily Return")
        .into_iter()
        .fold(
            Figure::new("Histogram of Daily Returns with KDE")
                .height(400)
                .layout("bargap", json!(0.02))
                .layout("xaxis", json!({ "title": { "text": "Daily Return" } }))
                .layout("yaxis", json!({ "title": { "text": "Density" } })),
            Figure::trace,
        )
}

/// OHLC candles with the 10 and 50 bar EMAs
pub fn candlestick(analysis: &StockAnalysis) -> Figure {
    let mut figure = Figure::new(&format!(
        "{} Stock Candlestick Chart with 10-day and 50-day EMAs",
        analysis.ticker
    ))
    .height(650)
    .layout(
        "xaxis",
        json!({ "title": { "text": "Date" }, "rangeslider": { "visible": false } }),
    )
    .layout("yaxis", json!({ "title": { "text": "Price" } }))
    .layout("legend", json!({ "x": 0.01, "y": 0.99 }))
    .trace(json!({
        "type": "candlestick",
        "name": analysis.ticker,
        "x": analysis.dates,
        "open": analysis.open,
        "high": analysis.high,
        "low": analysis.low,
        "close": analysis.closes,
        "increasing": { "line": { "color": "green" } },
        "decreasing": { "line": { "color": "red" } },
    }));

    for (window, color) in [(10, "blue"), (50, "orange")] {
        if let Some(ma) = analysis.ema(window) {
            figure = figure.trace(json!({
                "type": "scatter",
                "mode": "lines",
                "name": format!("{}-day EMA", window),
                "x": analysis.dates,
                "y": ma.values,
                "line": { "color": color, "width": 2 },
            }));
        }
    }
    figure
}
