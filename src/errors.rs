// Error types for quali-predictor

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum PredictorError {
    // Errors talking to the data provider
    #[snafu(display("Request to {url} failed"))]
    ProviderRequestError { url: String, source: reqwest::Error },
    #[snafu(display("Unexpected response from {url}: {reason}"))]
    ProviderResponseError { url: String, reason: String },
    #[snafu(display("Could not build HTTP client"))]
    HttpClientError { source: reqwest::Error },
    #[snafu(display("No recent session data available"))]
    NoSessionData,

    // Response cache errors
    #[snafu(display("Response cache IO error at {path}"))]
    CacheIOError { path: String, source: io::Error },
    #[snafu(display("Corrupted response cache entry {path}"))]
    CacheSerializeError {
        path: String,
        source: serde_json::Error,
    },

    // Training and prediction errors
    #[snafu(display("No rows with qualifying times left to train on"))]
    NoTrainingData,
    #[snafu(display("Not enough labelled rows to train: {rows} found, {required} required"))]
    InsufficientTrainingData { rows: usize, required: usize },
    #[snafu(display("Model fit failed: {reason}"))]
    ModelFitError { reason: String },
    #[snafu(display("Model is not fitted"))]
    ModelNotFitted,
    #[snafu(display("Prediction error: {reason}"))]
    PredictionError { reason: String },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // User input validation errors
    #[snafu(display("Invalid user input: {field} - {reason}"))]
    InvalidUserInput { field: String, reason: String },

    // Errors for the predictions writer
    #[snafu(display("Error writing predictions file"))]
    WriterError { source: io::Error },
}

impl PredictorError {
    /// Whether the failure happened while getting data from the provider
    /// (network, provider payload, cache or simply nothing to return).
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            PredictorError::ProviderRequestError { .. }
                | PredictorError::ProviderResponseError { .. }
                | PredictorError::HttpClientError { .. }
                | PredictorError::NoSessionData
                | PredictorError::CacheIOError { .. }
                | PredictorError::CacheSerializeError { .. }
        )
    }
}
