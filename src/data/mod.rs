// Qualifying data access
// Session records, the provider capability and the concrete HTTP provider

pub mod cache;
pub mod provider;

use serde::{Deserialize, Serialize};

use crate::PredictorError;

pub use cache::FileResponseCache;
pub use provider::ErgastProvider;

/// One driver's qualifying result at one race weekend.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub season: u32,
    pub round: u32,
    pub circuit: String,
    #[serde(rename = "Driver")]
    pub driver: String,
    #[serde(rename = "Team")]
    pub team: String,
    /// Q1 lap time in seconds
    #[serde(rename = "Q1_sec")]
    pub q1_sec: Option<f64>,
    /// Q2 lap time in seconds, absent if eliminated in Q1
    #[serde(rename = "Q2_sec")]
    pub q2_sec: Option<f64>,
    /// Q3 lap time in seconds, absent if eliminated before Q3
    #[serde(rename = "Q3_sec")]
    pub q3_sec: Option<f64>,
}

impl SessionRecord {
    pub fn has_any_time(&self) -> bool {
        self.q1_sec.is_some() || self.q2_sec.is_some() || self.q3_sec.is_some()
    }
}

/// All qualifying records of a single event.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionTable {
    pub season: u32,
    pub round: u32,
    pub race_name: String,
    pub circuit: String,
    pub records: Vec<SessionRecord>,
}

/// Flat table of session records across events.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    pub records: Vec<SessionRecord>,
}

impl Dataset {
    /// Concatenates the records of every table, preserving order.
    pub fn concat(tables: &[SessionTable]) -> Self {
        Self {
            records: tables
                .iter()
                .flat_map(|t| t.records.iter().cloned())
                .collect(),
        }
    }

    /// Drops rows where Q1, Q2 and Q3 are all absent.
    pub fn drop_rows_without_times(self) -> Self {
        Self {
            records: self
                .records
                .into_iter()
                .filter(SessionRecord::has_any_time)
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

impl From<Vec<SessionRecord>> for Dataset {
    fn from(records: Vec<SessionRecord>) -> Self {
        Self { records }
    }
}

/// Which sessions to fetch.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchRequest {
    pub seasons: Vec<u32>,
    /// Number of most recent rounds with qualifying results kept per season
    pub recent_rounds: usize,
}

impl FetchRequest {
    pub fn for_season(season: u32, recent_rounds: usize) -> Self {
        Self {
            seasons: vec![season],
            recent_rounds,
        }
    }
}

/// Source of qualifying session tables.
pub trait DataProvider {
    /// Fetch the most recent qualifying sessions for the requested seasons.
    /// An empty vector means the provider had nothing to return.
    fn fetch_recent_data(&self, request: &FetchRequest)
    -> Result<Vec<SessionTable>, PredictorError>;
}

/// Parses a provider lap time such as `1:29.123` or `59.870` into seconds.
/// Empty or malformed values are treated as absent.
pub fn parse_lap_time(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let seconds = match raw.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes: u32 = minutes.parse().ok()?;
            let seconds: f64 = seconds.parse().ok()?;
            if !(0.0..60.0).contains(&seconds) {
                return None;
            }
            minutes as f64 * 60. + seconds
        }
        None => raw.parse().ok()?,
    };
    if seconds.is_finite() && seconds > 0. {
        Some(seconds)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(driver: &str, q1: Option<f64>, q2: Option<f64>, q3: Option<f64>) -> SessionRecord {
        SessionRecord {
            season: 2025,
            round: 1,
            circuit: "Suzuka Circuit".to_string(),
            driver: driver.to_string(),
            team: "Team".to_string(),
            q1_sec: q1,
            q2_sec: q2,
            q3_sec: q3,
        }
    }

    #[test]
    fn test_parse_lap_time() {
        assert!((parse_lap_time("1:29.123").unwrap() - 89.123).abs() < 1e-9);
        assert_eq!(parse_lap_time("59.870"), Some(59.870));
        assert_eq!(parse_lap_time(""), None);
        assert_eq!(parse_lap_time("   "), None);
        assert_eq!(parse_lap_time("DNF"), None);
        assert_eq!(parse_lap_time("1:75.000"), None);
    }

    #[test]
    fn test_partial_rows_are_retained() {
        let dataset = Dataset::from(vec![
            record("VER", Some(80.1), Some(79.5), Some(79.0)),
            record("HAM", Some(80.5), None, None),
        ])
        .drop_rows_without_times();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records[0].driver, "VER");
        assert_eq!(dataset.records[1].driver, "HAM");
    }

    #[test]
    fn test_rows_without_any_time_are_dropped() {
        let dataset = Dataset::from(vec![
            record("VER", None, None, None),
            record("NOR", Some(80.2), None, None),
            record("LEC", None, None, None),
        ])
        .drop_rows_without_times();

        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.records[0].driver, "NOR");
    }

    #[test]
    fn test_concat_preserves_table_order() {
        let tables = vec![
            SessionTable {
                round: 1,
                records: vec![record("VER", Some(80.), None, None)],
                ..Default::default()
            },
            SessionTable {
                round: 2,
                records: vec![
                    record("NOR", Some(81.), None, None),
                    record("PIA", Some(81.5), None, None),
                ],
                ..Default::default()
            },
        ];
        let dataset = Dataset::concat(&tables);
        let drivers: Vec<&str> = dataset.records.iter().map(|r| r.driver.as_str()).collect();
        assert_eq!(drivers, vec!["VER", "NOR", "PIA"]);
    }

    #[test]
    fn test_record_serializes_with_column_names() {
        let json = serde_json::to_value(record("VER", Some(80.1), None, None)).unwrap();
        assert_eq!(json["Driver"], "VER");
        assert_eq!(json["Q1_sec"], 80.1);
        assert!(json["Q2_sec"].is_null());
    }
}
