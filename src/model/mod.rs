// Q3 lap time model
// Feature extraction, training with a held-out evaluation split, and prediction

pub mod metrics;
pub mod regression;
pub mod store;

use itertools::Itertools;
use log::{debug, info};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::data::{Dataset, SessionRecord};
use crate::errors::PredictorError;

use metrics::{mean_absolute_error, r2_score};
use regression::LinearRegression;

pub use store::ModelStore;

/// Fewest labelled rows (rows with a Q3 time) accepted for training.
pub const MIN_TRAINING_ROWS: usize = 5;
/// Every `HOLDOUT_EVERY`-th labelled row is held out for evaluation.
const HOLDOUT_EVERY: usize = 5;
const FEATURE_NAMES: [&str; 2] = ["Q1_sec", "Q2_sec"];

/// Fitted model plus the metrics measured on the held-out rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBundle {
    pub regressor: LinearRegression,
    /// Mean Q2 - Q1 gap of the training rows, used to impute a missing segment
    pub q2_gap: f64,
    pub mae: f64,
    pub r2: f64,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Predicted Q3 time for one driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionRow {
    #[serde(rename = "Driver")]
    pub driver: String,
    #[serde(rename = "Team")]
    pub team: String,
    #[serde(rename = "Predicted_Q3")]
    pub predicted_q3: f64,
}

/// Prediction table, fastest driver first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predictions {
    pub rows: Vec<PredictionRow>,
}

/// Mean Q2 - Q1 gap over rows with both times, 0 if there are none.
fn mean_q2_gap(rows: &[&SessionRecord]) -> f64 {
    let gaps = rows
        .iter()
        .filter_map(|r| Some(r.q2_sec? - r.q1_sec?))
        .collect_vec();
    if gaps.is_empty() {
        0.0
    } else {
        gaps.iter().sum::<f64>() / gaps.len() as f64
    }
}

/// `[Q1, Q2]` with a missing segment imputed from the other one and the
/// mean gap. `None` when both are missing.
fn features(record: &SessionRecord, q2_gap: f64) -> Option<[f64; 2]> {
    match (record.q1_sec, record.q2_sec) {
        (Some(q1), Some(q2)) => Some([q1, q2]),
        (Some(q1), None) => Some([q1, q1 + q2_gap]),
        (None, Some(q2)) => Some([q2 - q2_gap, q2]),
        (None, None) => None,
    }
}

/// Rows must all have features, see [`has_features`].
fn feature_matrix(rows: &[&SessionRecord], q2_gap: f64) -> Array2<f64> {
    let mut x = Array2::zeros((rows.len(), FEATURE_NAMES.len()));
    for (i, record) in rows.iter().enumerate() {
        if let Some(values) = features(record, q2_gap) {
            for (j, value) in values.iter().enumerate() {
                x[[i, j]] = *value;
            }
        }
    }
    x
}

fn has_features(record: &SessionRecord) -> bool {
    record.q1_sec.is_some() || record.q2_sec.is_some()
}

/// Fit Q3 ~ Q1 + Q2 and evaluate it on a deterministic held-out split.
///
/// Rows without any qualifying time are dropped first. Rows without a Q3
/// time cannot be used as targets, nor can rows with neither Q1 nor Q2.
/// Training is fully deterministic: the same dataset always yields the same
/// coefficients and metrics.
pub fn train_and_evaluate(dataset: &Dataset) -> Result<ModelBundle, PredictorError> {
    let valid = dataset.clone().drop_rows_without_times();
    if valid.is_empty() {
        return Err(PredictorError::NoTrainingData);
    }

    let labelled = valid
        .records
        .iter()
        .filter(|r| r.q3_sec.is_some() && has_features(r))
        .collect_vec();
    if labelled.len() < MIN_TRAINING_ROWS {
        return Err(PredictorError::InsufficientTrainingData {
            rows: labelled.len(),
            required: MIN_TRAINING_ROWS,
        });
    }

    let (test, train): (Vec<_>, Vec<_>) = labelled
        .iter()
        .enumerate()
        .partition_map(|(i, r)| {
            if i % HOLDOUT_EVERY == HOLDOUT_EVERY - 1 {
                itertools::Either::Left(*r)
            } else {
                itertools::Either::Right(*r)
            }
        });

    let q2_gap = mean_q2_gap(&train);
    let targets = |rows: &[&SessionRecord]| {
        Array1::from_iter(rows.iter().map(|r| r.q3_sec.unwrap_or_default()))
    };

    let mut regressor = LinearRegression::new();
    regressor.fit(&feature_matrix(&train, q2_gap), &targets(&train))?;

    let y_test = targets(&test);
    let y_pred = regressor.predict(&feature_matrix(&test, q2_gap))?;
    let mae = mean_absolute_error(&y_test, &y_pred)?;
    let r2 = r2_score(&y_test, &y_pred)?;

    info!(
        "Trained Q3 model on {} rows ({} held out): MAE {:.3}s, R² {:.3}",
        train.len(),
        test.len(),
        mae,
        r2
    );
    debug!(
        "Coefficients for {:?}: {:?}, intercept {:.3}",
        FEATURE_NAMES,
        regressor.coefficients(),
        regressor.intercept()
    );

    Ok(ModelBundle {
        regressor,
        q2_gap,
        mae,
        r2,
        train_rows: train.len(),
        test_rows: test.len(),
    })
}

/// Predict each driver's Q3 time from their most recent session record.
///
/// Drivers with neither a Q1 nor a Q2 time in that record are skipped.
pub fn predict(model: &ModelBundle, dataset: &Dataset) -> Result<Predictions, PredictorError> {
    let latest = dataset
        .records
        .iter()
        .into_group_map_by(|r| r.driver.clone())
        .into_values()
        .filter_map(|records| records.into_iter().max_by_key(|r| (r.season, r.round)))
        .filter(|r| has_features(r))
        .sorted_by(|a, b| a.driver.cmp(&b.driver))
        .collect_vec();

    if latest.is_empty() {
        return Err(PredictorError::PredictionError {
            reason: "no drivers with Q1 or Q2 times in the latest data".to_string(),
        });
    }

    let predicted = model
        .regressor
        .predict(&feature_matrix(&latest, model.q2_gap))?;

    let rows = latest
        .iter()
        .zip(predicted.iter())
        .map(|(record, q3)| PredictionRow {
            driver: record.driver.clone(),
            team: record.team.clone(),
            predicted_q3: *q3,
        })
        .sorted_by(|a, b| a.predicted_q3.total_cmp(&b.predicted_q3))
        .collect_vec();

    debug!("Predicted Q3 times for {} drivers", rows.len());
    Ok(Predictions { rows })
}
