//! Data models for scraped episodes and the local cache file.
//!
//! - [`EpisodeRecord`]: one episode as extracted from the listing page
//! - [`EpisodeCache`]: the on-disk snapshot of every episode seen so far
//!
//! Every field on [`EpisodeRecord`] is optional. The listing markup is not
//! under our control, so a record keeps whatever could be extracted and
//! leaves the rest as `None`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::cmp::Ordering;
use url::Url;

/// A single "6 Minute English" episode.
///
/// Records are produced fresh by every extraction call and are never
/// mutated afterwards. Identity, where it matters, is the `id` field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// Source-assigned episode code, e.g. `"Episode 241121"`.
    pub id: Option<String>,
    /// Episode headline.
    pub title: Option<String>,
    /// Short teaser paragraph shown on the listing page.
    pub description: Option<String>,
    /// Calendar day the episode was published.
    pub publication_date: Option<NaiveDate>,
    /// Thumbnail image URL as written in the markup.
    pub image_url_text: Option<String>,
    /// Path of the episode detail page, usually relative to the site root.
    pub detail_url_text: Option<String>,
}

impl EpisodeRecord {
    /// Resolve [`detail_url_text`](Self::detail_url_text) against `base`.
    ///
    /// For example `"/learningenglish/english/features/6-minute-english_2024/ep-241121"`
    /// against `https://www.bbc.co.uk/learningenglish/...` gives an absolute
    /// URL on `www.bbc.co.uk`.
    pub fn detail_url(&self, base: &Url) -> Option<Url> {
        self.detail_url_text
            .as_deref()
            .and_then(|href| base.join(href).ok())
    }

    pub fn is_favorite(&self, favorites: &BTreeSet<String>) -> bool {
        self.id.as_ref().is_some_and(|id| favorites.contains(id))
    }

    /// Newest first; undated records sort after every dated one.
    pub fn newest_first(a: &Self, b: &Self) -> Ordering {
        match (a.publication_date, b.publication_date) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

/// Snapshot of the local episode cache.
///
/// `episodes` is kept sorted with [`EpisodeRecord::newest_first`], so the
/// head of the list is the most recent cached episode.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EpisodeCache {
    /// When the cache was last written.
    pub updated_at: DateTime<Utc>,
    pub episodes: Vec<EpisodeRecord>,
}

impl EpisodeCache {
    pub fn empty() -> Self {
        Self {
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
            episodes: Vec::new(),
        }
    }

    /// Publication date of the newest cached episode, if any has one.
    pub fn latest_publication_date(&self) -> Option<NaiveDate> {
        self.episodes
            .iter()
            .filter_map(|e| e.publication_date)
            .max()
    }
}
