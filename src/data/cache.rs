// On-disk cache for data provider responses

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::PredictorError;

const ENTRY_EXTENSION: &str = "json";
// suffix of entries still being written, see `put_at`
const TEMP_EXTENSION: &str = "tmp";

/// A cached response body together with the time it was fetched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct CacheEntry {
    key: String,
    fetched_at_s: u64,
    body: String,
}

/// File-based response cache, one JSON file per key.
pub struct FileResponseCache {
    /// Directory holding the cache entries
    storage_path: PathBuf,
    /// Entries older than this are considered stale. `None` never expires.
    ttl: Option<Duration>,
}

impl FileResponseCache {
    /// Create a cache rooted at `storage_path`, creating the directory if needed
    pub fn new(storage_path: PathBuf, ttl: Option<Duration>) -> Result<Self, PredictorError> {
        if !storage_path.exists() {
            fs::create_dir_all(&storage_path).map_err(|e| PredictorError::CacheIOError {
                path: format!("{:?}", storage_path),
                source: e,
            })?;
        }

        Ok(Self { storage_path, ttl })
    }

    /// Get the storage directory path
    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    /// Normalize a key (usually a request URL) into a file name
    fn normalize_key(key: &str) -> String {
        key.trim_start_matches("https://")
            .trim_start_matches("http://")
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect()
    }

    fn file_path_for_key(&self, key: &str) -> PathBuf {
        self.storage_path
            .join(format!("{}.{}", Self::normalize_key(key), ENTRY_EXTENSION))
    }

    /// Return the cached body for `key` if present and not stale
    pub fn get(&self, key: &str) -> Result<Option<String>, PredictorError> {
        self.get_at(key, SystemTime::now())
    }

    fn get_at(&self, key: &str, now: SystemTime) -> Result<Option<String>, PredictorError> {
        let file_path = self.file_path_for_key(key);
        if !file_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&file_path).map_err(|e| PredictorError::CacheIOError {
            path: format!("{:?}", file_path),
            source: e,
        })?;
        let entry: CacheEntry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                // a corrupted entry is treated as a miss and overwritten on the next put
                warn!("Ignoring corrupted cache entry {:?}: {}", file_path, e);
                return Ok(None);
            }
        };

        if entry.key != key {
            debug!("Cache key collision on {:?}, treating as miss", file_path);
            return Ok(None);
        }

        if let Some(ttl) = self.ttl {
            let fetched_at = SystemTime::UNIX_EPOCH + Duration::from_secs(entry.fetched_at_s);
            let age = now.duration_since(fetched_at).unwrap_or(Duration::ZERO);
            if age > ttl {
                debug!("Cache entry for {} is stale ({}s old)", key, age.as_secs());
                return Ok(None);
            }
        }

        debug!("Cache hit for {}", key);
        Ok(Some(entry.body))
    }

    /// Store `body` under `key`
    pub fn put(&self, key: &str, body: &str) -> Result<(), PredictorError> {
        self.put_at(key, body, SystemTime::now())
    }

    fn put_at(&self, key: &str, body: &str, now: SystemTime) -> Result<(), PredictorError> {
        let file_path = self.file_path_for_key(key);
        let temp_path = file_path.with_extension(format!("{}.{}", ENTRY_EXTENSION, TEMP_EXTENSION));
        let io_error = |e| PredictorError::CacheIOError {
            path: format!("{:?}", file_path),
            source: e,
        };

        let entry = CacheEntry {
            key: key.to_string(),
            fetched_at_s: now
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or(Duration::ZERO)
                .as_secs(),
            body: body.to_string(),
        };
        let content =
            serde_json::to_string(&entry).map_err(|e| PredictorError::CacheSerializeError {
                path: format!("{:?}", file_path),
                source: e,
            })?;

        // write to a temporary file first so readers never see a partial entry
        {
            let mut temp_file = fs::File::create(&temp_path).map_err(io_error)?;
            temp_file.write_all(content.as_bytes()).map_err(io_error)?;
        }
        fs::rename(&temp_path, &file_path).map_err(io_error)?;

        debug!("Cached response for {} at {:?}", key, file_path);
        Ok(())
    }

    /// Remove every cache entry and any partially written entry, returning
    /// how many complete entries were deleted
    pub fn clear(&self) -> Result<usize, PredictorError> {
        let entries = fs::read_dir(&self.storage_path).map_err(|e| PredictorError::CacheIOError {
            path: format!("{:?}", self.storage_path),
            source: e,
        })?;

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            let extension = path.extension().and_then(|e| e.to_str());
            if extension != Some(ENTRY_EXTENSION) && extension != Some(TEMP_EXTENSION) {
                continue;
            }
            fs::remove_file(&path).map_err(|e| PredictorError::CacheIOError {
                path: format!("{:?}", path),
                source: e,
            })?;
            if extension == Some(ENTRY_EXTENSION) {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
