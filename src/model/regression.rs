// Ordinary least squares regression backed by linfa

use linfa::prelude::*;
use linfa_linear::FittedLinearRegression;
use ndarray::{Array1, Array2};

use crate::errors::PredictorError;

/// Linear regression with intercept.
#[derive(Debug, Clone, Default)]
pub struct LinearRegression {
    fitted: Option<FittedLinearRegression<f64>>,
}

impl PartialEq for LinearRegression {
    fn eq(&self, other: &Self) -> bool {
        match (&self.fitted, &other.fitted) {
            (Some(a), Some(b)) => a.params() == b.params() && a.intercept() == b.intercept(),
            (None, None) => true,
            _ => false,
        }
    }
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Fitted coefficients, one per feature
    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.fitted.as_ref().map(|f| f.params())
    }

    pub fn intercept(&self) -> f64 {
        self.fitted.as_ref().map(|f| f.intercept()).unwrap_or_default()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self, PredictorError> {
        if x.nrows() != y.len() {
            return Err(PredictorError::ModelFitError {
                reason: format!("{} feature rows but {} targets", x.nrows(), y.len()),
            });
        }
        if x.nrows() == 0 {
            return Err(PredictorError::ModelFitError {
                reason: "no samples".to_string(),
            });
        }

        let dataset = Dataset::new(x.clone(), y.clone());
        let fitted = linfa_linear::LinearRegression::new()
            .fit(&dataset)
            .map_err(|e| PredictorError::ModelFitError {
                reason: e.to_string(),
            })?;

        if fitted.params().iter().any(|c| !c.is_finite()) || !fitted.intercept().is_finite() {
            return Err(PredictorError::ModelFitError {
                reason: "non-finite coefficients".to_string(),
            });
        }

        self.fitted = Some(fitted);
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, PredictorError> {
        let fitted = self.fitted.as_ref().ok_or(PredictorError::ModelNotFitted)?;
        if x.ncols() != fitted.params().len() {
            return Err(PredictorError::PredictionError {
                reason: format!(
                    "expected {} features, got {}",
                    fitted.params().len(),
                    x.ncols()
                ),
            });
        }
        Ok(fitted.predict(x))
    }
}
