use linfa::prelude::SingleTargetRegression;
use ndarray::Array1;

use crate::errors::PredictorError;

fn metric_error(e: linfa::Error) -> PredictorError {
    PredictorError::ModelFitError {
        reason: format!("cannot score held-out rows: {}", e),
    }
}

pub fn mean_absolute_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64, PredictorError> {
    y_pred.mean_absolute_error(y_true).map_err(metric_error)
}

/// Coefficient of determination.
///
/// When the targets have no variance R² is undefined; a perfect fit reports
/// 1.0 and anything else 0.0.
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64, PredictorError> {
    let y_mean = y_true.mean().unwrap_or_default();
    if y_true.iter().all(|v| *v == y_mean) {
        let exact = y_true.iter().zip(y_pred.iter()).all(|(t, p)| t == p);
        return Ok(if exact { 1.0 } else { 0.0 });
    }
    y_pred.r2(y_true).map_err(metric_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_mae() {
        let y = array![80.0, 81.0, 82.0];
        let p = array![80.5, 80.0, 82.0];
        assert!((mean_absolute_error(&y, &p).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_r2() {
        let y = array![1.0, 2.0, 3.0, 4.0];
        assert!((r2_score(&y, &y).unwrap() - 1.0).abs() < 1e-9);

        let mean_prediction = array![2.5, 2.5, 2.5, 2.5];
        assert!(r2_score(&y, &mean_prediction).unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_r2_constant_targets() {
        let y = array![90.0];
        assert_eq!(r2_score(&y, &array![90.0]).unwrap(), 1.0);
        assert_eq!(r2_score(&y, &array![90.2]).unwrap(), 0.0);
    }
}
