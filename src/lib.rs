// Library interface for quali-predictor
// This allows integration tests to access internal modules

pub mod config;
pub mod dashboard;
pub mod data;
pub mod errors;
pub mod model;
pub mod ui;
pub mod writer;

// Re-export commonly used types
pub use config::AppConfig;
pub use dashboard::{Circuit, DashboardError, DashboardSession, PredictionReport, Selection};
pub use data::{DataProvider, Dataset, FetchRequest, SessionRecord, SessionTable};
pub use errors::PredictorError;
pub use model::{ModelBundle, ModelStore, PredictionRow, Predictions};
