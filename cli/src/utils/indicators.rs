//! Price-series indicators: percentage change, moving averages, geometric mean

/// Period-over-period fractional change; the first position has no prior value
pub fn pct_change(values: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        if i == 0 || values[i - 1] == 0.0 {
            out.push(None);
        } else {
            out.push(Some(values[i] / values[i - 1] - 1.0));
        }
    }
    out
}

/// Simple moving average over a trailing window
pub fn sma(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    let mut running = 0.0;
    for i in 0..values.len() {
        running += values[i];
        if i >= window {
            running -= values[i - window];
        }
        if i + 1 >= window {
            out.push(Some(running / window as f64));
        } else {
            out.push(None);
        }
    }
    out
}

/// Exponential moving average with `alpha = 2 / (span + 1)`, seeded with the
/// first observation (no bias adjustment)
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        let next = match prev {
            Some(p) => (1.0 - alpha) * p + alpha * v,
            None => v,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

/// Average compounded change per period: `prod(1 + r)^(1/n) - 1`
pub fn geometric_mean_change(closes: &[f64]) -> Option<f64> {
    let growth: Vec<f64> = pct_change(closes).into_iter().flatten().map(|r| r + 1.0).collect();
    if growth.is_empty() {
        return None;
    }
    let log_sum: f64 = growth.iter().map(|g| g.ln()).sum();
    if log_sum.is_nan() {
        // A non-positive growth factor leaves the product undefined in logs
        let product: f64 = growth.iter().product();
        return Some(product.powf(1.0 / growth.len() as f64) - 1.0);
    }
    Some((log_sum / growth.len() as f64).exp() - 1.0)
}
