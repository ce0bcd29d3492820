use super::{histogram_traces, Figure};
use crate::{
    analysis::{sorted_by, tier, IndexTrend},
    models::{CapTier, Company, IndexPoint, NumericColumn},
    utils::CorrelationMatrix,
};
use serde_json::{json, Value};

pub const MARKET_CAP_COLOR: &str = "#6bb30c";
pub const EBITDA_COLOR: &str = "#81A9F1";
const DISTRIBUTION_BINS: usize = 30;

pub fn index_line(index: &[IndexPoint]) -> Figure {
    Figure::new("S&P500 Index Value").height(400).trace(json!({
        "type": "scatter",
        "mode": "lines",
        "name": "S&P500",
        "x": index.iter().map(|p| p.date.to_string()).collect::<Vec<_>>(),
        "y": index.iter().map(|p| p.value).collect::<Vec<_>>(),
    }))
}

/// Index level against date with the fitted trend line
pub fn index_trend(trend: &IndexTrend) -> Figure {
    let values: Vec<f64> = trend.points.iter().map(|p| p.value).collect();
    Figure::new("S&P500 Index Value vs Date")
        .height(450)
        .trace(json!({
            "type": "scatter",
            "mode": "markers",
            "name": "Observed",
            "x": values,
            "y": trend.points.iter().map(|p| p.date.to_string()).collect::<Vec<_>>(),
            "marker": { "size": 3 },
        }))
        .trace(json!({
            "type": "scatter",
            "mode": "lines",
            "name": "Linear fit",
            "x": values,
            "y": trend.points.iter().map(|p| p.predicted_date.to_string()).collect::<Vec<_>>(),
            "line": { "color": "red" },
        }))
        .layout("xaxis", json!({ "title": { "text": "S&P500" } }))
        .layout("yaxis", json!({ "title": { "text": "Date" } }))
}

/// Overlaid bars of a column by sector, one trace per industry
pub fn sector_bar(companies: &[Company], column: NumericColumn, title: &str) -> Figure {
    let sorted = sorted_by(companies, column);
    let mut industries: Vec<&str> = Vec::new();
    for company in &sorted {
        if !industries.contains(&company.industry.as_str()) {
            industries.push(&company.industry);
        }
    }

    let mut figure = Figure::new(title)
        .height(650)
        .layout("barmode", json!("overlay"))
        .layout("xaxis", json!({ "title": { "text": "Sector" } }))
        .layout("yaxis", json!({ "title": { "text": column.as_str() } }));

    for industry in industries {
        let members: Vec<&Company> = sorted.iter().filter(|c| c.industry == industry).collect();
        figure = figure.trace(json!({
            "type": "bar",
            "name": industry,
            "x": members.iter().map(|c| c.sector.as_str()).collect::<Vec<_>>(),
            "y": members.iter().map(|c| column.value(c)).collect::<Vec<_>>(),
            "customdata": members.iter().map(|c| c.symbol.as_str()).collect::<Vec<_>>(),
            "hovertemplate": format!("%{{customdata}}<br>{}<br>%{{x}}: %{{y}}<extra></extra>", industry),
        }));
    }
    figure
}

/// Market cap box per sector, marking points beyond 3 IQR as suspected outliers
pub fn sector_box(companies: &[Company]) -> Figure {
    let sorted = sorted_by(companies, NumericColumn::Marketcap);
    let mut sectors: Vec<&str> = Vec::new();
    for company in &sorted {
        if !sectors.contains(&company.sector.as_str()) {
            sectors.push(&company.sector);
        }
    }

    let mut figure = Figure::new("Market Capitalization By Sector - Outliers - Top Companies")
        .height(650)
        .layout("showlegend", json!(false));
    for sector in sectors {
        let members: Vec<&Company> = sorted.iter().filter(|c| c.sector == sector).collect();
        figure = figure.trace(json!({
            "type": "box",
            "name": sector,
            "y": members.iter().map(|c| c.market_cap).collect::<Vec<_>>(),
            "text": members.iter().map(|c| format!("{} ({})", c.symbol, c.industry)).collect::<Vec<_>>(),
            "boxpoints": "suspectedoutliers",
            "marker": { "size": 8 },
        }));
    }
    figure
}

/// EBITDA against revenue growth, bubble size by market cap
pub fn bubble_scatter(companies: &[Company]) -> Figure {
    let sorted = sorted_by(companies, NumericColumn::Revenuegrowth);
    let max_cap = sorted.iter().map(|c| c.market_cap).fold(0.0_f64, f64::max);
    let sizeref = if max_cap > 0.0 { 2.0 * max_cap / 60.0_f64.powi(2) } else { 1.0 };

    Figure::new("Revenue Growth vs EBITDA vs Market Capitalization")
        .height(650)
        .layout("showlegend", json!(false))
        .layout("xaxis", json!({ "title": { "text": "Ebitda" } }))
        .layout("yaxis", json!({ "title": { "text": "Revenuegrowth" } }))
        .trace(json!({
            "type": "scatter",
            "mode": "markers",
            "x": sorted.iter().map(|c| c.ebitda).collect::<Vec<_>>(),
            "y": sorted.iter().map(|c| c.revenue_growth).collect::<Vec<_>>(),
            "text": sorted.iter().map(|c| format!("{} ({})", c.symbol, c.industry)).collect::<Vec<_>>(),
            "marker": {
                "size": sorted.iter().map(|c| c.market_cap.max(0.0)).collect::<Vec<_>>(),
                "sizemode": "area",
                "sizeref": sizeref,
                "color": sorted.iter().map(|c| c.revenue_growth).collect::<Vec<_>>(),
                "colorscale": "Viridis",
            },
        }))
}

fn tier_scatter(companies: &[Company], cap_tier: CapTier, xaxis: &str, yaxis: &str) -> Value {
    let members = tier(companies, cap_tier);
    json!({
        "type": "scatter",
        "mode": "markers",
        "name": cap_tier.label(),
        "x": members.iter().map(|c| c.ebitda).collect::<Vec<_>>(),
        "y": members.iter().map(|c| c.market_cap).collect::<Vec<_>>(),
        "text": members.iter().map(|c| format!("{} ({})", c.symbol, c.industry)).collect::<Vec<_>>(),
        "marker": { "size": 9 },
        "xaxis": xaxis,
        "yaxis": yaxis,
    })
}

/// Side-by-side EBITDA vs market cap for the mega and large cap tiers
pub fn tier_comparison(companies: &[Company]) -> Figure {
    Figure::new("EBITDA vs Market Capitalization Comparison")
        .height(850)
        .trace(tier_scatter(companies, CapTier::Mega, "x", "y"))
        .trace(tier_scatter(companies, CapTier::Large, "x2", "y2"))
        .layout("xaxis", json!({ "domain": [0.0, 0.48], "title": { "text": "Ebitda" } }))
        .layout("xaxis2", json!({ "domain": [0.52, 1.0], "title": { "text": "Ebitda" } }))
        .layout("yaxis", json!({ "title": { "text": "Marketcap" } }))
        .layout("yaxis2", json!({ "anchor": "x2" }))
        .layout(
            "annotations",
            json!([
                subplot_title("Mega Cap Companies > $200B", 0.24),
                subplot_title("Large Cap Companies < $200B", 0.76),
            ]),
        )
}

fn subplot_title(text: &str, x: f64) -> Value {
    json!({
        "text": text,
        "x": x,
        "y": 1.0,
        "xref": "paper",
        "yref": "paper",
        "xanchor": "center",
        "yanchor": "bottom",
        "showarrow": false,
    })
}

/// Lower-triangle heatmap; the diagonal and upper triangle are left blank
pub fn correlation_heatmap(matrix: &CorrelationMatrix) -> Figure {
    let z = matrix.lower_triangle();
    let text: Vec<Vec<String>> = z
        .iter()
        .map(|row| row.iter().map(|v| v.map(|v| format!("{:.2}", v)).unwrap_or_default()).collect())
        .collect();

    Figure::new("Correlation Heatmap")
        .height(500)
        .trace(json!({
            "type": "heatmap",
            "x": matrix.labels,
            "y": matrix.labels,
            "z": z,
            "text": text,
            "texttemplate": "%{text}",
            "zmin": -1.0,
            "zmax": 1.0,
            "colorscale": "RdBu",
            "xgap": 1,
            "ygap": 1,
        }))
        .layout("yaxis", json!({ "autorange": "reversed" }))
}

/// Histogram with KDE of market cap and EBITDA for one tier
pub fn tier_distributions(companies: &[Company], cap_tier: CapTier) -> Vec<Figure> {
    let members = tier(companies, cap_tier);
    let market_caps: Vec<f64> = members.iter().map(|c| c.market_cap).collect();
    let ebitda: Vec<f64> = members.iter().map(|c| c.ebitda).collect();
    let tier_name = cap_tier.label();

    vec![
        distribution(
            &format!("{} - Market Capitalisation Distribution", tier_name),
            &market_caps,
            MARKET_CAP_COLOR,
            "Marketcap",
        ),
        distribution(&format!("{} - EBITDA Distribution", tier_name), &ebitda, EBITDA_COLOR, "Ebitda"),
    ]
}

fn distribution(title: &str, values: &[f64], color: &str, name: &str) -> Figure {
    histogram_traces(values, DISTRIBUTION_BINS, color, name)
        .into_iter()
        .fold(
            Figure::new(title)
                .height(400)
                .layout("bargap", json!(0.02))
                .layout("showlegend", json!(false))
                .layout("yaxis", json!({ "title": { "text": "Count" } })),
            Figure::trace,
        )
}
