//! Descriptive statistics used across the fundamentals and price analyses

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    let sorted = sorted(values);
    quantile_sorted(&sorted, 0.5)
}

/// Most frequent value; ties resolve to the smallest value
pub fn mode<T: Ord + Clone>(values: &[T]) -> Option<T> {
    let mut counts: BTreeMap<&T, usize> = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut best: Option<(&T, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.clone())
}

/// Sample standard deviation (ddof = 1)
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    quantile_sorted(&sorted(values), q)
}

/// Linear-interpolated quantile of already sorted data
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Summary table in the shape of a dataframe `describe()`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    pub std: Option<f64>,
    pub min: f64,
    #[serde(rename = "25%")]
    pub q25: f64,
    #[serde(rename = "50%")]
    pub q50: f64,
    #[serde(rename = "75%")]
    pub q75: f64,
    pub max: f64,
}

impl Describe {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let sorted = sorted(values);
        if sorted.is_empty() {
            return None;
        }
        Some(Self {
            count: sorted.len(),
            mean: mean(&sorted)?,
            std: std_dev(&sorted),
            min: sorted[0],
            q25: quantile_sorted(&sorted, 0.25)?,
            q50: quantile_sorted(&sorted, 0.5)?,
            q75: quantile_sorted(&sorted, 0.75)?,
            max: sorted[sorted.len() - 1],
        })
    }

    /// Rows as (label, value) pairs for tabular display
    pub fn rows(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("count", self.count as f64),
            ("mean", self.mean),
            ("std", self.std.unwrap_or(f64::NAN)),
            ("min", self.min),
            ("25%", self.q25),
            ("50%", self.q50),
            ("75%", self.q75),
            ("max", self.max),
        ]
    }
}

/// Pearson correlation; NaN when fewer than two pairs or either side is constant
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return f64::NAN;
    }
    let mx = x[..n].iter().sum::<f64>() / n as f64;
    let my = y[..n].iter().sum::<f64>() / n as f64;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for i in 0..n {
        let dx = x[i] - mx;
        let dy = y[i] - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == row)?;
        let j = self.labels.iter().position(|l| l == col)?;
        Some(self.values[i][j])
    }

    /// Copy with the upper triangle (diagonal included) blanked out
    pub fn lower_triangle(&self) -> Vec<Vec<Option<f64>>> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .map(|(j, v)| if j < i && v.is_finite() { Some(*v) } else { None })
                    .collect()
            })
            .collect()
    }
}

/// Pairwise-complete correlation matrix over named columns
pub fn correlation_matrix(columns: &[(String, Vec<Option<f64>>)]) -> CorrelationMatrix {
    let labels: Vec<String> = columns.iter().map(|(name, _)| name.clone()).collect();

    let values: Vec<Vec<f64>> = (0..columns.len())
        .into_par_iter()
        .map(|i| {
            (0..columns.len())
                .map(|j| {
                    let (xs, ys): (Vec<f64>, Vec<f64>) = columns[i]
                        .1
                        .iter()
                        .zip(columns[j].1.iter())
                        .filter_map(|(a, b)| match (a, b) {
                            (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Some((*a, *b)),
                            _ => None,
                        })
                        .unzip();
                    let r = pearson(&xs, &ys);
                    if i == j && r.is_finite() {
                        1.0
                    } else {
                        r
                    }
                })
                .collect()
        })
        .collect();

    CorrelationMatrix { labels, values }
}

/// Ordinary least squares with a single regressor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearRegression {
    pub fn fit(x: &[f64], y: &[f64]) -> Option<Self> {
        let n = x.len().min(y.len());
        if n < 2 {
            return None;
        }
        let mx = x[..n].iter().sum::<f64>() / n as f64;
        let my = y[..n].iter().sum::<f64>() / n as f64;

        let mut sxy = 0.0;
        let mut sxx = 0.0;
        for i in 0..n {
            sxy += (x[i] - mx) * (y[i] - my);
            sxx += (x[i] - mx).powi(2);
        }
        if sxx == 0.0 {
            return None;
        }

        let slope = sxy / sxx;
        Some(Self { slope, intercept: my - slope * mx })
    }

    pub fn predict_one(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    pub fn predict(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|v| self.predict_one(*v)).collect()
    }

    /// Coefficient of determination on the given data
    pub fn score(&self, x: &[f64], y: &[f64]) -> f64 {
        r2_score(y, &self.predict(x))
    }
}

pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let n = y_true.len().min(y_pred.len());
    if n == 0 {
        return f64::NAN;
    }
    let m = y_true[..n].iter().sum::<f64>() / n as f64;
    let ss_res: f64 = (0..n).map(|i| (y_true[i] - y_pred[i]).powi(2)).sum();
    let ss_tot: f64 = y_true[..n].iter().map(|v| (v - m).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Unshuffled K-fold cross-validation R² scores, one per fold.
///
/// Folds are contiguous; the first `n % k` folds hold one extra sample.
pub fn cross_val_score(x: &[f64], y: &[f64], k: usize) -> Option<Vec<f64>> {
    let n = x.len().min(y.len());
    if k < 2 || n < k {
        return None;
    }

    let mut scores = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let size = n / k + usize::from(fold < n % k);
        let end = start + size;

        let mut train_x = Vec::with_capacity(n - size);
        let mut train_y = Vec::with_capacity(n - size);
        train_x.extend_from_slice(&x[..start]);
        train_x.extend_from_slice(&x[end..n]);
        train_y.extend_from_slice(&y[..start]);
        train_y.extend_from_slice(&y[end..n]);

        let score = match LinearRegression::fit(&train_x, &train_y) {
            Some(model) => model.score(&x[start..end], &y[start..end]),
            None => f64::NAN,
        };
        scores.push(score);
        start = end;
    }
    Some(scores)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// `bins + 1` bin edges
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn bin_width(&self) -> f64 {
        match self.edges.as_slice() {
            [first, second, ..] => second - first,
            _ => 0.0,
        }
    }

    pub fn centers(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
    }
}

/// Equal-width histogram over the data range; the last bin is closed
pub fn histogram(values: &[f64], bins: usize) -> Option<Histogram> {
    let data = sorted(values);
    if data.is_empty() || bins == 0 {
        return None;
    }
    let (mut lo, mut hi) = (data[0], data[data.len() - 1]);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
    let mut counts = vec![0usize; bins];
    for v in &data {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Some(Histogram { edges, counts })
}

/// Gaussian kernel density estimate evaluated on an even grid.
///
/// Bandwidth follows Scott's rule; the grid extends three bandwidths past
/// the data on either side.
pub fn gaussian_kde(values: &[f64], points: usize) -> Option<Vec<(f64, f64)>> {
    let data = sorted(values);
    let sd = std_dev(&data)?;
    if sd == 0.0 || points < 2 {
        return None;
    }

    let n = data.len() as f64;
    let bw = sd * n.powf(-0.2);
    let lo = data[0] - 3.0 * bw;
    let hi = data[data.len() - 1] + 3.0 * bw;
    let step = (hi - lo) / (points - 1) as f64;
    let norm = 1.0 / (n * bw * (2.0 * std::f64::consts::PI).sqrt());

    let curve = (0..points)
        .map(|i| {
            let x = lo + step * i as f64;
            let density = data
                .iter()
                .map(|v| (-0.5 * ((x - v) / bw).powi(2)).exp())
                .sum::<f64>()
                * norm;
            (x, density)
        })
        .collect();
    Some(curve)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_mode_breaks_ties_to_smallest() {
        let states = vec!["TX", "CA", "NY", "CA", "TX"];
        assert_eq!(mode(&states), Some("CA"));
        assert_eq!(mode::<i32>(&[]), None);
    }

    #[test]
    fn test_describe_matches_linear_quantiles() {
        let d = Describe::from_values(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(d.count, 4);
        assert!(approx(d.mean, 2.5));
        assert!(approx(d.std.unwrap(), 1.2909944487358056));
        assert!(approx(d.q25, 1.75));
        assert!(approx(d.q50, 2.5));
        assert!(approx(d.q75, 3.25));
        assert_eq!(d.min, 1.0);
        assert_eq!(d.max, 4.0);
    }

    #[test]
    fn test_describe_single_value_has_no_std() {
        let d = Describe::from_values(&[7.0]).unwrap();
        assert_eq!(d.std, None);
        assert!(Describe::from_values(&[]).is_none());
    }

    #[test]
    fn test_pearson_perfect_and_degenerate() {
        assert!(approx(pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]), 1.0));
        assert!(approx(pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]), -1.0));
        assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_nan());
        assert!(pearson(&[1.0], &[1.0]).is_nan());
    }

    #[test]
    fn test_correlation_matrix_pairwise_complete() {
        let columns = vec![
            ("a".to_string(), vec![Some(1.0), Some(2.0), Some(3.0), None]),
            ("b".to_string(), vec![Some(2.0), Some(4.0), Some(6.0), Some(100.0)]),
            ("c".to_string(), vec![Some(5.0), Some(5.0), Some(5.0), Some(5.0)]),
        ];
        let m = correlation_matrix(&columns);
        assert!(approx(m.get("a", "b").unwrap(), 1.0));
        assert_eq!(m.get("a", "a"), Some(1.0));
        assert!(m.get("c", "c").unwrap().is_nan());

        let lower = m.lower_triangle();
        assert_eq!(lower[0][0], None);
        assert_eq!(lower[0][1], None);
        assert!(lower[1][0].is_some());
        assert_eq!(lower[2][0], None);
    }

    #[test]
    fn test_linear_regression_fit_and_score() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [3.0, 5.0, 7.0, 9.0];
        let model = LinearRegression::fit(&x, &y).unwrap();
        assert!(approx(model.slope, 2.0));
        assert!(approx(model.intercept, 1.0));
        assert!(approx(model.score(&x, &y), 1.0));
        assert!(LinearRegression::fit(&[1.0, 1.0], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn test_cross_val_score_fold_layout() {
        let x: Vec<f64> = (0..11).map(|v| v as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 * v - 2.0).collect();
        let scores = cross_val_score(&x, &y, 5).unwrap();
        assert_eq!(scores.len(), 5);
        assert!(scores.iter().all(|s| approx(*s, 1.0)));
        assert!(cross_val_score(&x[..3], &y[..3], 5).is_none());
    }

    #[test]
    fn test_histogram_closed_last_bin() {
        let h = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], 4).unwrap();
        assert_eq!(h.counts, vec![1, 1, 1, 2]);
        assert!(approx(h.bin_width(), 1.0));
        assert_eq!(h.centers()[0], 0.5);

        let flat = histogram(&[2.0, 2.0], 2).unwrap();
        assert_eq!(flat.counts.iter().sum::<usize>(), 2);
    }

    #[test]
    fn test_kde_integrates_to_one() {
        let values: Vec<f64> = (0..200).map(|i| (i as f64 * 0.37).sin()).collect();
        let curve = gaussian_kde(&values, 512).unwrap();
        let step = curve[1].0 - curve[0].0;
        let area: f64 = curve.iter().map(|(_, d)| d * step).sum();
        assert!((area - 1.0).abs() < 0.01);
        assert!(gaussian_kde(&[1.0, 1.0, 1.0], 10).is_none());
    }
}
