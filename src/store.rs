//! Local episode cache backed by a JSON file.
//!
//! The cache answers one question for the freshness check (the newest
//! cached publication date) and accepts batches of freshly extracted
//! records. It is a flat file, not a database: the whole snapshot is read
//! on open and rewritten on every insert.
//!
//! # Output Structure
//!
//! ```text
//! cache_dir/
//! ├── episodes.json    # EpisodeCache
//! └── favorites.json   # see crate::favorites
//! ```

use crate::error::StoreError;
use crate::models::{EpisodeCache, EpisodeRecord};
use crate::utils::write_atomically;
use chrono::{NaiveDate, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

pub const EPISODES_FILE: &str = "episodes.json";

/// Read side of the cache, as seen by the freshness check.
pub trait CacheReader {
    /// Publication date of the most recent cached episode, or `None` when
    /// the cache is empty.
    fn latest_publication_date(&self) -> Option<NaiveDate>;
}

/// Full cache contract used by the sync pipeline.
pub trait EpisodeStore: CacheReader {
    /// Cached episodes, newest first.
    fn episodes(&self) -> &[EpisodeRecord];

    /// Append `records` and persist them.
    ///
    /// No de-duplication happens here; callers that want it filter first.
    async fn insert_batch(&mut self, records: Vec<EpisodeRecord>) -> Result<(), StoreError>;
}

/// Episode cache stored as pretty-printed JSON.
#[derive(Debug)]
pub struct JsonEpisodeStore {
    path: PathBuf,
    cache: EpisodeCache,
}

impl JsonEpisodeStore {
    /// Open the cache in `cache_dir`, starting empty if the file does not
    /// exist yet.
    #[instrument(level = "info", skip_all, fields(cache_dir = %cache_dir.display()))]
    pub async fn open(cache_dir: &Path) -> Result<Self, StoreError> {
        let path = cache_dir.join(EPISODES_FILE);
        let cache = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
                path: path.display().to_string(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No episode cache yet; starting empty");
                EpisodeCache::empty()
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        info!(count = cache.episodes.len(), "Opened episode cache");
        Ok(Self { path, cache })
    }

    async fn save(&self) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(&self.cache).map_err(|source| StoreError::Json {
            path: self.path.display().to_string(),
            source,
        })?;
        write_atomically(&self.path, &json)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        info!(path = %self.path.display(), count = self.cache.episodes.len(), "Wrote episode cache");
        Ok(())
    }
}

impl CacheReader for JsonEpisodeStore {
    fn latest_publication_date(&self) -> Option<NaiveDate> {
        self.cache.latest_publication_date()
    }
}

impl EpisodeStore for JsonEpisodeStore {
    fn episodes(&self) -> &[EpisodeRecord] {
        &self.cache.episodes
    }

    #[instrument(level = "info", skip_all, fields(count = records.len()))]
    async fn insert_batch(&mut self, records: Vec<EpisodeRecord>) -> Result<(), StoreError> {
        self.cache.episodes.extend(records);
        self.cache.episodes.sort_by(EpisodeRecord::newest_first);
        self.cache.updated_at = Utc::now();
        self.save().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("six_minute_sync_store_{}_{}", name, std::process::id()))
    }

    fn record(id: &str, date: Option<(i32, u32, u32)>) -> EpisodeRecord {
        EpisodeRecord {
            id: Some(id.to_string()),
            publication_date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_open_missing_file_is_empty() {
        let dir = temp_dir("missing");
        let store = JsonEpisodeStore::open(&dir).await.unwrap();
        assert!(store.episodes().is_empty());
        assert_eq!(store.latest_publication_date(), None);
    }

    #[tokio::test]
    async fn test_insert_sorts_and_persists() {
        let dir = temp_dir("insert");
        let _ = std::fs::remove_dir_all(&dir);

        let mut store = JsonEpisodeStore::open(&dir).await.unwrap();
        store
            .insert_batch(vec![
                record("Episode 241114", Some((2024, 11, 14))),
                record("undated", None),
                record("Episode 241121", Some((2024, 11, 21))),
            ])
            .await
            .unwrap();

        let reopened = JsonEpisodeStore::open(&dir).await.unwrap();
        let ids: Vec<_> = reopened
            .episodes()
            .iter()
            .map(|e| e.id.as_deref().unwrap())
            .collect();
        assert_eq!(ids, vec!["Episode 241121", "Episode 241114", "undated"]);
        assert_eq!(
            reopened.latest_publication_date(),
            NaiveDate::from_ymd_opt(2024, 11, 21)
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_malformed_cache_is_an_error() {
        let dir = temp_dir("malformed");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(EPISODES_FILE), "{ not json").unwrap();

        let err = JsonEpisodeStore::open(&dir).await.unwrap_err();
        assert!(matches!(err, StoreError::Json { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
