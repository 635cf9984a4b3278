use std::path::PathBuf;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::PredictorError;
use crate::dashboard::{Circuit, SEASONS};
use crate::data::provider::DEFAULT_API_URL;
use crate::data::{ErgastProvider, FetchRequest, FileResponseCache};

const CONFIG_FILE_NAME: &str = "config.json";
const APP_DIR_NAME: &str = "quali-predictor";
const DEFAULT_CACHE_DIR: &str = "../cache";
const DEFAULT_TIMEOUT_S: u64 = 30;
const DEFAULT_CACHE_TTL_HOURS: u64 = 24;
const DEFAULT_RECENT_ROUNDS: usize = 5;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Directory for cached provider responses
    pub cache_dir: PathBuf,
    pub api_base_url: String,
    pub request_timeout_s: u64,
    /// Age after which cached responses are refetched, 0 never expires
    pub cache_ttl_hours: u64,
    /// Seasons the model is trained on
    pub training_seasons: Vec<u32>,
    /// Most recent rounds fetched per season
    pub recent_rounds: usize,
    pub selected_season: u32,
    pub selected_circuit: Circuit,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout_s: DEFAULT_TIMEOUT_S,
            cache_ttl_hours: DEFAULT_CACHE_TTL_HOURS,
            training_seasons: vec![2024, 2025],
            recent_rounds: DEFAULT_RECENT_ROUNDS,
            selected_season: SEASONS[0],
            selected_circuit: Circuit::Suzuka,
        }
    }
}

impl AppConfig {
    fn config_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load the saved config, `None` if there is none or it cannot be read
    pub fn from_local_file() -> Option<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            return None;
        }

        let file = std::fs::File::open(&config_path)
            .map_err(|e| warn!("Could not open config file {:?}: {}", config_path, e))
            .ok()?;
        let config = serde_json::from_reader(file)
            .map_err(|e| warn!("Could not parse config file {:?}: {}", config_path, e))
            .ok()?;
        debug!("Loaded config from {:?}", config_path);
        Some(config)
    }

    pub fn save(&self) -> Result<(), PredictorError> {
        let config_path = Self::config_path().ok_or(PredictorError::NoConfigDir)?;

        if let Some(parent) = config_path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| PredictorError::ConfigIOError { source: e })?;
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| PredictorError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| PredictorError::ConfigSerializeError { source: e })
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        match self.cache_ttl_hours {
            0 => None,
            hours => Some(Duration::from_secs(hours * 3600)),
        }
    }

    pub fn response_cache(&self) -> Result<FileResponseCache, PredictorError> {
        FileResponseCache::new(self.cache_dir.clone(), self.cache_ttl())
    }

    pub fn build_provider(&self) -> Result<ErgastProvider, PredictorError> {
        ErgastProvider::new(
            &self.api_base_url,
            Duration::from_secs(self.request_timeout_s),
            Some(self.response_cache()?),
        )
    }

    pub fn training_request(&self) -> FetchRequest {
        FetchRequest {
            seasons: self.training_seasons.clone(),
            recent_rounds: self.recent_rounds,
        }
    }

    /// Reject values the rest of the app cannot work with
    pub fn validate(&self) -> Result<(), PredictorError> {
        if self.training_seasons.is_empty() {
            return Err(PredictorError::InvalidUserInput {
                field: "training_seasons".to_string(),
                reason: "at least one season is required".to_string(),
            });
        }
        if self.recent_rounds == 0 {
            return Err(PredictorError::InvalidUserInput {
                field: "recent_rounds".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if !SEASONS.contains(&self.selected_season) {
            return Err(PredictorError::InvalidUserInput {
                field: "selected_season".to_string(),
                reason: format!("must be one of {:?}", SEASONS),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.cache_dir, PathBuf::from("../cache"));
        assert_eq!(config.selected_season, 2025);
        assert_eq!(config.selected_circuit, Circuit::Suzuka);
        assert_eq!(config.cache_ttl(), Some(Duration::from_secs(24 * 3600)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"recent_rounds": 3, "cache_ttl_hours": 0}"#).unwrap();
        assert_eq!(config.recent_rounds, 3);
        assert_eq!(config.cache_ttl(), None);
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.training_request().seasons, vec![2024, 2025]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = AppConfig {
            recent_rounds: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PredictorError::InvalidUserInput { .. })
        ));

        let config = AppConfig {
            selected_season: 1999,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
