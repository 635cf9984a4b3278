// Dashboard session logic, independent of the egui front end
//
// The UI owns a `DashboardSession` and forwards user actions to it. Work that
// touches the network is handed out as jobs so the caller decides which
// thread runs it.

use std::fmt;
use std::sync::Arc;

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use snafu::Snafu;

use crate::PredictorError;
use crate::config::AppConfig;
use crate::data::{DataProvider, Dataset, FetchRequest};
use crate::model::{self, ModelBundle, ModelStore, PredictionRow};

pub const SEASONS: [u32; 2] = [2025, 2024];

pub const WINDOW_TITLE: &str = "F1 Qualifying Predictor";
pub const PAGE_HEADING: &str = "🏎️ F1 2025 Qualifying Predictor";

pub type SharedProvider = Arc<dyn DataProvider + Send + Sync>;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Circuit {
    #[default]
    Suzuka,
    Silverstone,
    Monza,
}

impl Circuit {
    pub const ALL: [Circuit; 3] = [Circuit::Suzuka, Circuit::Silverstone, Circuit::Monza];

    pub fn name(&self) -> &'static str {
        match self {
            Circuit::Suzuka => "Suzuka",
            Circuit::Silverstone => "Silverstone",
            Circuit::Monza => "Monza",
        }
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Circuit {
    type Err = PredictorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Circuit::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PredictorError::InvalidUserInput {
                field: "circuit".to_string(),
                reason: format!("'{}' is not one of Suzuka, Silverstone, Monza", s),
            })
    }
}

/// Season and circuit picked in the sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub season: u32,
    pub circuit: Circuit,
}

/// Lap time with exactly three decimals.
pub fn format_seconds(seconds: f64) -> String {
    format!("{:.3}", seconds)
}

pub fn mae_line(model: &ModelBundle) -> String {
    format!("Mean Absolute Error: {} seconds", format_seconds(model.mae))
}

pub fn r2_line(model: &ModelBundle) -> String {
    format!("R² Score: {}", format_seconds(model.r2))
}

/// Failures surfaced to the user, one message per category.
#[derive(Debug, Snafu)]
pub enum DashboardError {
    #[snafu(display("Failed to load prediction model. Check data connections."))]
    ModelUnavailable { source: PredictorError },
    #[snafu(display("Failed to fetch recent race data"))]
    DataFetch { source: PredictorError },
    #[snafu(display("Prediction failed: {source}"))]
    Prediction { source: PredictorError },
}

impl DashboardError {
    fn from_pass_error(source: PredictorError) -> Self {
        if source.is_fetch_error() {
            DashboardError::DataFetch { source }
        } else {
            DashboardError::Prediction { source }
        }
    }

    /// Headline plus the underlying cause where it adds information
    pub fn user_message(&self) -> String {
        match self {
            DashboardError::ModelUnavailable { source } => format!("{} ({})", self, source),
            DashboardError::DataFetch {
                source: PredictorError::NoSessionData,
            } => self.to_string(),
            DashboardError::DataFetch { source } => format!("{}: {}", self, source),
            DashboardError::Prediction { .. } => self.to_string(),
        }
    }
}

/// Everything one prediction pass renders.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionReport {
    pub title: String,
    pub rows: Vec<PredictionRow>,
    pub mae_line: String,
    pub r2_line: String,
}

impl PredictionReport {
    pub fn new(selection: &Selection, rows: Vec<PredictionRow>, model: &ModelBundle) -> Self {
        Self {
            title: format!(
                "{} {} Predicted Qualifying Times",
                selection.circuit, selection.season
            ),
            rows,
            mae_line: mae_line(model),
            r2_line: r2_line(model),
        }
    }

    /// Table cells as displayed: driver, team, predicted time
    pub fn table_rows(&self) -> Vec<[String; 3]> {
        self.rows
            .iter()
            .map(|r| [r.driver.clone(), r.team.clone(), format_seconds(r.predicted_q3)])
            .collect()
    }
}

/// Fetch the training data and fit a fresh model bundle.
pub fn build_model(
    provider: &dyn DataProvider,
    request: &FetchRequest,
) -> Result<ModelBundle, PredictorError> {
    let tables = provider.fetch_recent_data(request)?;
    if tables.is_empty() {
        return Err(PredictorError::NoSessionData);
    }
    let dataset = Dataset::concat(&tables).drop_rows_without_times();
    info!(
        "Training on {} rows from {} sessions",
        dataset.len(),
        tables.len()
    );
    model::train_and_evaluate(&dataset)
}

/// Fetch fresh data for the selection and predict with `model`.
pub fn run_prediction(
    provider: &dyn DataProvider,
    model: &ModelBundle,
    selection: &Selection,
    recent_rounds: usize,
) -> Result<PredictionReport, DashboardError> {
    let tables = provider
        .fetch_recent_data(&FetchRequest::for_season(selection.season, recent_rounds))
        .map_err(|e| DashboardError::DataFetch { source: e })?;
    let dataset = Dataset::concat(&tables);
    if dataset.is_empty() {
        return Err(DashboardError::DataFetch {
            source: PredictorError::NoSessionData,
        });
    }

    let predictions =
        model::predict(model, &dataset).map_err(DashboardError::from_pass_error)?;
    Ok(PredictionReport::new(selection, predictions.rows, model))
}

/// Builds (or reuses) the stored model. Safe to run on a worker thread.
pub struct ModelJob {
    provider: SharedProvider,
    store: Arc<ModelStore>,
    request: FetchRequest,
}

impl ModelJob {
    pub fn execute(self) -> Result<Arc<ModelBundle>, DashboardError> {
        let provider = self.provider;
        let request = self.request;
        self.store
            .get_or_try_init(|| build_model(provider.as_ref(), &request))
            .map_err(|e| DashboardError::ModelUnavailable { source: e })
    }
}

/// One prediction pass. Safe to run on a worker thread.
pub struct PredictionJob {
    provider: SharedProvider,
    model: Arc<ModelBundle>,
    selection: Selection,
    recent_rounds: usize,
}

impl PredictionJob {
    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn execute(self) -> Result<PredictionReport, DashboardError> {
        run_prediction(
            self.provider.as_ref(),
            &self.model,
            &self.selection,
            self.recent_rounds,
        )
    }
}

#[derive(Debug, Clone)]
pub enum ModelState {
    Loading,
    Ready(Arc<ModelBundle>),
    /// Fatal for the session, nothing else is rendered
    Unavailable { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PassState {
    Idle,
    Running,
    Done(PredictionReport),
    Failed { message: String },
}

/// State behind one dashboard window.
pub struct DashboardSession {
    provider: SharedProvider,
    store: Arc<ModelStore>,
    training_request: FetchRequest,
    recent_rounds: usize,
    selection: Selection,
    model_state: ModelState,
    pass_state: PassState,
}

impl DashboardSession {
    pub fn new(provider: SharedProvider, store: Arc<ModelStore>, config: &AppConfig) -> Self {
        let model_state = match store.get() {
            Some(bundle) => ModelState::Ready(bundle),
            None => ModelState::Loading,
        };
        Self {
            provider,
            store,
            training_request: config.training_request(),
            recent_rounds: config.recent_rounds,
            selection: Selection {
                season: config.selected_season,
                circuit: config.selected_circuit,
            },
            model_state,
            pass_state: PassState::Idle,
        }
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn model_state(&self) -> &ModelState {
        &self.model_state
    }

    pub fn pass_state(&self) -> &PassState {
        &self.pass_state
    }

    pub fn is_running(&self) -> bool {
        self.pass_state == PassState::Running
    }

    /// Selection changes never trigger a fetch on their own.
    pub fn select_season(&mut self, season: u32) {
        self.selection.season = season;
    }

    pub fn select_circuit(&mut self, circuit: Circuit) {
        self.selection.circuit = circuit;
    }

    /// Job that loads the model, to be followed by [`Self::finish_model_load`]
    pub fn model_job(&mut self) -> ModelJob {
        self.model_state = ModelState::Loading;
        ModelJob {
            provider: self.provider.clone(),
            store: self.store.clone(),
            request: self.training_request.clone(),
        }
    }

    pub fn finish_model_load(&mut self, result: Result<Arc<ModelBundle>, DashboardError>) {
        self.model_state = match result {
            Ok(bundle) => ModelState::Ready(bundle),
            Err(e) => {
                error!("Model unavailable: {}", e.user_message());
                ModelState::Unavailable {
                    message: e.user_message(),
                }
            }
        };
    }

    /// Evict the stored model and return the job that rebuilds it
    pub fn retrain(&mut self) -> Option<ModelJob> {
        if self.is_running() || matches!(self.model_state, ModelState::Loading) {
            return None;
        }
        self.store.invalidate();
        self.pass_state = PassState::Idle;
        Some(self.model_job())
    }

    /// Start a prediction pass. `None` while the model is not ready or a
    /// pass is already running.
    pub fn start_run(&mut self) -> Option<PredictionJob> {
        let ModelState::Ready(model) = &self.model_state else {
            warn!("Run requested before the model is ready");
            return None;
        };
        if self.is_running() {
            return None;
        }

        let job = PredictionJob {
            provider: self.provider.clone(),
            model: model.clone(),
            selection: self.selection,
            recent_rounds: self.recent_rounds,
        };
        self.pass_state = PassState::Running;
        Some(job)
    }

    pub fn finish_run(&mut self, result: Result<PredictionReport, DashboardError>) {
        self.pass_state = match result {
            Ok(report) => {
                info!("{}: {} drivers", report.title, report.rows.len());
                PassState::Done(report)
            }
            Err(e) => {
                error!("Prediction pass failed: {:?}", e);
                PassState::Failed {
                    message: e.user_message(),
                }
            }
        };
    }
}
