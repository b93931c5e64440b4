//! Favorite episode ids.
//!
//! Favorites are just a set of episode ids. [`FavoriteIds`] is the whole
//! contract; [`JsonFavorites`] keeps the set in a JSON array next to the
//! episode cache.

use crate::error::StoreError;
use crate::utils::write_atomically;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

pub const FAVORITES_FILE: &str = "favorites.json";

/// Get and replace the current set of favorite episode ids.
pub trait FavoriteIds {
    fn favorite_ids(&self) -> &BTreeSet<String>;

    async fn set_favorite_ids(&mut self, ids: BTreeSet<String>) -> Result<(), StoreError>;

    /// Add `id` if absent, remove it if present. Returns whether it is a
    /// favorite afterwards.
    async fn toggle(&mut self, id: &str) -> Result<bool, StoreError> {
        let mut ids = self.favorite_ids().clone();
        let now_favorite = if ids.remove(id) {
            false
        } else {
            ids.insert(id.to_string());
            true
        };
        self.set_favorite_ids(ids).await?;
        Ok(now_favorite)
    }
}

#[derive(Debug)]
pub struct JsonFavorites {
    path: PathBuf,
    ids: BTreeSet<String>,
}

impl JsonFavorites {
    #[instrument(level = "info", skip_all, fields(cache_dir = %cache_dir.display()))]
    pub async fn open(cache_dir: &Path) -> Result<Self, StoreError> {
        let path = cache_dir.join(FAVORITES_FILE);
        let ids = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Json {
                path: path.display().to_string(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        Ok(Self { path, ids })
    }
}

impl FavoriteIds for JsonFavorites {
    fn favorite_ids(&self) -> &BTreeSet<String> {
        &self.ids
    }

    #[instrument(level = "info", skip_all, fields(count = ids.len()))]
    async fn set_favorite_ids(&mut self, ids: BTreeSet<String>) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(&ids).map_err(|source| StoreError::Json {
            path: self.path.display().to_string(),
            source,
        })?;
        write_atomically(&self.path, &json)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        self.ids = ids;
        info!(path = %self.path.display(), "Saved favorites");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_toggle_round_trip() {
        let dir = std::env::temp_dir().join(format!("six_minute_sync_favorites_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let mut favorites = JsonFavorites::open(&dir).await.unwrap();
        assert!(favorites.favorite_ids().is_empty());

        assert!(favorites.toggle("Episode 241121").await.unwrap());
        assert!(favorites.toggle("Episode 241114").await.unwrap());
        assert!(!favorites.toggle("Episode 241114").await.unwrap());

        let reopened = JsonFavorites::open(&dir).await.unwrap();
        let ids: Vec<_> = reopened.favorite_ids().iter().cloned().collect();
        assert_eq!(ids, vec!["Episode 241121".to_string()]);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
