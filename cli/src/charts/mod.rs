//! Plotly figure builders
//!
//! Figures are plain `{"data": [...], "layout": {...}}` JSON documents that
//! the dashboard hands to plotly.js in the browser.

pub mod fundamentals;
pub mod stock;

pub use fundamentals::*;
pub use stock::*;

use serde::Serialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Default, Serialize)]
pub struct Figure {
    pub data: Vec<Value>,
    pub layout: Map<String, Value>,
}

impl Figure {
    pub fn new(title: &str) -> Self {
        let mut layout = Map::new();
        layout.insert("title".to_string(), json!({ "text": title }));
        Self { data: Vec::new(), layout }
    }

    pub fn trace(mut self, trace: Value) -> Self {
        self.data.push(trace);
        self
    }

    pub fn height(self, height: u32) -> Self {
        self.layout("height", json!(height))
    }

    pub fn layout(mut self, key: &str, value: Value) -> Self {
        self.layout.insert(key.to_string(), value);
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.layout.get("title")?.get("text")?.as_str()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Bars for a precomputed histogram plus its KDE scaled to counts
pub(crate) fn histogram_traces(values: &[f64], bins: usize, color: &str, name: &str) -> Vec<Value> {
    let mut traces = Vec::new();
    let Some(hist) = crate::utils::histogram(values, bins) else {
        return traces;
    };
    let width = hist.bin_width();
    traces.push(json!({
        "type": "bar",
        "name": name,
        "x": hist.centers(),
        "y": hist.counts,
        "width": width,
        "marker": { "color": color, "opacity": 0.6 },
    }));

    if let Some(kde) = crate::utils::gaussian_kde(values, 200) {
        let scale = values.len() as f64 * width;
        let (x, y): (Vec<f64>, Vec<f64>) = kde.into_iter().map(|(x, d)| (x, d * scale)).unzip();
        traces.push(json!({
            "type": "scatter",
            "mode": "lines",
            "name": format!("{} KDE", name),
            "x": x,
            "y": y,
            "line": { "color": color, "width": 2 },
        }));
    }
    traces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_figure_serializes_plotly_shape() {
        let figure = Figure::new("Demo").height(400).trace(json!({ "type": "scatter" }));
        let value: Value = serde_json::from_str(&figure.to_json()).unwrap();
        assert_eq!(value["layout"]["title"]["text"], "Demo");
        assert_eq!(value["layout"]["height"], 400);
        assert_eq!(value["data"][0]["type"], "scatter");
        assert_eq!(figure.title(), Some("Demo"));
    }

    #[test]
    fn test_histogram_traces_scale_kde_to_counts() {
        let values: Vec<f64> = (0..100).map(|i| (i % 10) as f64).collect();
        let traces = histogram_traces(&values, 10, "#6bb30c", "Values");
        assert_eq!(traces.len(), 2);
        let counts: Vec<u64> = traces[0]["y"].as_array().unwrap().iter().map(|v| v.as_u64().unwrap()).collect();
        assert_eq!(counts.iter().sum::<u64>(), 100);
        assert!(histogram_traces(&[], 10, "red", "Empty").is_empty());
    }
}
