use std::collections::BTreeMap;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Deserialize;

use crate::errors::PredictorError;

use super::{
    DataProvider, FetchRequest, FileResponseCache, SessionRecord, SessionTable, parse_lap_time,
};

pub const DEFAULT_API_URL: &str = "https://api.jolpi.ca/ergast/f1";
const PAGE_SIZE: usize = 100;
// guards against a provider that keeps reporting a larger total than it serves
const MAX_PAGES_PER_SEASON: usize = 20;
const USER_AGENT: &str = concat!("quali-predictor/", env!("CARGO_PKG_VERSION"));

// Wire types for the Ergast-compatible API. Every number is sent as a string.

#[derive(Deserialize, Debug)]
struct ErgastResponse {
    #[serde(rename = "MRData")]
    mr_data: MrData,
}

#[derive(Deserialize, Debug)]
struct MrData {
    total: String,
    #[serde(rename = "RaceTable")]
    race_table: RaceTable,
}

#[derive(Deserialize, Debug)]
struct RaceTable {
    #[serde(rename = "Races", default)]
    races: Vec<Race>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Race {
    season: String,
    round: String,
    race_name: String,
    #[serde(rename = "Circuit")]
    circuit: Circuit,
    #[serde(rename = "QualifyingResults", default)]
    qualifying_results: Vec<QualifyingResult>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Circuit {
    circuit_name: String,
}

#[derive(Deserialize, Debug)]
struct QualifyingResult {
    #[serde(rename = "Driver")]
    driver: Driver,
    #[serde(rename = "Constructor")]
    constructor: Constructor,
    #[serde(rename = "Q1")]
    q1: Option<String>,
    #[serde(rename = "Q2")]
    q2: Option<String>,
    #[serde(rename = "Q3")]
    q3: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Driver {
    driver_id: String,
    code: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Constructor {
    name: String,
}

/// One page of season qualifying results.
#[derive(Debug, Default)]
pub struct QualifyingPage {
    /// Total result rows for the season, across all pages
    pub total: usize,
    pub tables: Vec<SessionTable>,
}

/// Decode one provider page. `url` only labels errors.
pub fn parse_qualifying_page(url: &str, body: &str) -> Result<QualifyingPage, PredictorError> {
    let response: ErgastResponse =
        serde_json::from_str(body).map_err(|e| PredictorError::ProviderResponseError {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    let total = response.mr_data.total.parse::<usize>().map_err(|e| {
        PredictorError::ProviderResponseError {
            url: url.to_string(),
            reason: format!("invalid total '{}': {}", response.mr_data.total, e),
        }
    })?;

    let mut tables = Vec::with_capacity(response.mr_data.race_table.races.len());
    for race in response.mr_data.race_table.races {
        let parse_number = |field: &str, value: &str| {
            value
                .parse::<u32>()
                .map_err(|e| PredictorError::ProviderResponseError {
                    url: url.to_string(),
                    reason: format!("invalid {} '{}': {}", field, value, e),
                })
        };
        let season = parse_number("season", &race.season)?;
        let round = parse_number("round", &race.round)?;
        let circuit = race.circuit.circuit_name;

        let records = race
            .qualifying_results
            .into_iter()
            .map(|result| SessionRecord {
                season,
                round,
                circuit: circuit.clone(),
                driver: result
                    .driver
                    .code
                    .unwrap_or_else(|| result.driver.driver_id.to_uppercase()),
                team: result.constructor.name,
                q1_sec: result.q1.as_deref().and_then(parse_lap_time),
                q2_sec: result.q2.as_deref().and_then(parse_lap_time),
                q3_sec: result.q3.as_deref().and_then(parse_lap_time),
            })
            .collect();

        tables.push(SessionTable {
            season,
            round,
            race_name: race.race_name,
            circuit,
            records,
        });
    }

    Ok(QualifyingPage { total, tables })
}

/// Merges page tables by round (a race can be split across two pages) and
/// keeps the `recent_rounds` most recent rounds, oldest first.
pub(crate) fn merge_recent_rounds(tables: Vec<SessionTable>, recent_rounds: usize) -> Vec<SessionTable> {
    let mut by_round: BTreeMap<u32, SessionTable> = BTreeMap::new();
    for table in tables {
        match by_round.get_mut(&table.round) {
            Some(existing) => existing.records.extend(table.records),
            None => {
                by_round.insert(table.round, table);
            }
        }
    }

    let rounds = by_round
        .into_values()
        .filter(|t| !t.records.is_empty())
        .collect::<Vec<_>>();
    let skip = rounds.len().saturating_sub(recent_rounds);
    rounds.into_iter().skip(skip).collect()
}

/// `DataProvider` backed by the Jolpica Ergast-compatible HTTP API.
pub struct ErgastProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    cache: Option<FileResponseCache>,
}

impl ErgastProvider {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        cache: Option<FileResponseCache>,
    ) -> Result<Self, PredictorError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PredictorError::HttpClientError { source: e })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    fn qualifying_url(&self, season: u32, offset: usize) -> String {
        format!(
            "{}/{}/qualifying.json?limit={}&offset={}",
            self.base_url, season, PAGE_SIZE, offset
        )
    }

    /// GET `url`, going through the response cache when one is configured
    fn get_body(&self, url: &str) -> Result<String, PredictorError> {
        if let Some(cache) = &self.cache {
            match cache.get(url) {
                Ok(Some(body)) => return Ok(body),
                Ok(None) => {}
                Err(e) => warn!("Response cache read failed for {}: {}", url, e),
            }
        }

        debug!("GET {}", url);
        let body = self
            .client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .map_err(|e| PredictorError::ProviderRequestError {
                url: url.to_string(),
                source: e,
            })?;

        if let Some(cache) = &self.cache
            && let Err(e) = cache.put(url, &body)
        {
            warn!("Could not cache response for {}: {}", url, e);
        }
        Ok(body)
    }

    fn fetch_season(
        &self,
        season: u32,
        recent_rounds: usize,
    ) -> Result<Vec<SessionTable>, PredictorError> {
        let mut tables = Vec::new();
        let mut offset = 0;
        for _ in 0..MAX_PAGES_PER_SEASON {
            let url = self.qualifying_url(season, offset);
            let page = parse_qualifying_page(&url, &self.get_body(&url)?)?;
            tables.extend(page.tables);
            offset += PAGE_SIZE;
            if offset >= page.total {
                break;
            }
        }

        let tables = merge_recent_rounds(tables, recent_rounds);
        info!(
            "Fetched {} qualifying sessions for season {}",
            tables.len(),
            season
        );
        Ok(tables)
    }
}

impl DataProvider for ErgastProvider {
    fn fetch_recent_data(
        &self,
        request: &FetchRequest,
    ) -> Result<Vec<SessionTable>, PredictorError> {
        let mut tables = Vec::new();
        for season in &request.seasons {
            tables.extend(self.fetch_season(*season, request.recent_rounds)?);
        }
        Ok(tables)
    }
}
