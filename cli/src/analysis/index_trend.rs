use crate::{
    error::{DataError, Result},
    models::IndexPoint,
    utils::{cross_val_score, mean, LinearRegression},
};
use chrono::NaiveDate;
use serde::Serialize;

pub const CV_FOLDS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    pub value: f64,
    pub date: NaiveDate,
    pub predicted_date: NaiveDate,
}

/// Linear fit of the calendar date against the index level
#[derive(Debug, Clone, Serialize)]
pub struct IndexTrend {
    pub model: LinearRegression,
    pub r2: f64,
    pub cv_scores: Vec<f64>,
    pub cv_mean: Option<f64>,
    pub points: Vec<TrendPoint>,
}

impl IndexTrend {
    pub fn fit(index: &[IndexPoint]) -> Result<Self> {
        // Regressor is the index level, target is days since epoch
        let x: Vec<f64> = index.iter().map(|p| p.value).collect();
        let y: Vec<f64> = index.iter().map(IndexPoint::epoch_days).collect();

        let model = LinearRegression::fit(&x, &y)
            .ok_or_else(|| DataError::EmptyDataset("index has fewer than two distinct levels".to_string()))?;
        let r2 = model.score(&x, &y);
        let cv_scores = cross_val_score(&x, &y, CV_FOLDS).unwrap_or_default();
        let finite: Vec<f64> = cv_scores.iter().copied().filter(|s| s.is_finite()).collect();

        let points = index
            .iter()
            .map(|p| TrendPoint {
                value: p.value,
                date: p.date,
                predicted_date: IndexPoint::from_epoch_days(model.predict_one(p.value)),
            })
            .collect();

        Ok(Self {
            model,
            r2,
            cv_mean: mean(&finite),
            cv_scores,
            points,
        })
    }
}
