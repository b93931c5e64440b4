//! The synchronization pipeline.
//!
//! ```text
//! cache ──latest date──▶ FreshnessChecker ──stale?──▶ ListingSource ──▶ extract_episodes
//!   ▲                                                                        │
//!   └───────────────────────── insert_batch (new ids only) ◀─────────────────┘
//! ```

use crate::api::ListingSource;
use crate::error::SyncError;
use crate::freshness::FreshnessChecker;
use crate::models::EpisodeRecord;
use crate::scrapers::six_minute_english::fetch_episodes;
use crate::store::EpisodeStore;
use chrono::{DateTime, TimeZone, Utc};
use itertools::Itertools;
use std::collections::HashSet;
use std::fmt;
use tracing::{info, instrument};

/// What a sync run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The cache was fresh; nothing was fetched.
    ServedFromCache { cached: usize },
    /// The listing was fetched and new episodes merged into the cache.
    Fetched {
        extracted: usize,
        inserted: usize,
        total: usize,
    },
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServedFromCache { cached } => {
                write!(f, "cache is fresh; serving {cached} cached episodes")
            }
            Self::Fetched {
                extracted,
                inserted,
                total,
            } => write!(
                f,
                "fetched {extracted} episodes, {inserted} new; {total} cached"
            ),
        }
    }
}

/// Identity used when merging: the episode id, falling back to the detail
/// link for records whose id could not be extracted.
fn merge_key(record: &EpisodeRecord) -> Option<&str> {
    record.id.as_deref().or(record.detail_url_text.as_deref())
}

/// Drop records already present in `existing`, and repeats within `fresh`.
///
/// Records without any identity are kept unless an identical record is
/// already cached.
pub fn new_episodes(existing: &[EpisodeRecord], fresh: Vec<EpisodeRecord>) -> Vec<EpisodeRecord> {
    let known: HashSet<&str> = existing.iter().filter_map(merge_key).collect();
    let (keyed, anonymous): (Vec<_>, Vec<_>) =
        fresh.into_iter().partition(|r| merge_key(r).is_some());

    keyed
        .into_iter()
        .filter(|r| merge_key(r).is_some_and(|k| !known.contains(k)))
        .unique_by(|r| merge_key(r).map(str::to_owned))
        .chain(anonymous.into_iter().filter(|r| !existing.contains(r)))
        .collect()
}

/// Run one synchronization pass.
///
/// Unless `force` is set, the listing is only fetched when `checker` says
/// the cache is stale at `now`.
///
/// # Errors
///
/// Fetch and extraction failures leave the cache untouched and are
/// returned for the caller to retry.
#[instrument(level = "info", skip_all, fields(%now, force))]
pub async fn sync_episodes<St, S, Tz>(
    store: &mut St,
    source: &S,
    checker: &FreshnessChecker<Tz>,
    now: DateTime<Utc>,
    force: bool,
) -> Result<SyncOutcome, SyncError>
where
    St: EpisodeStore,
    S: ListingSource,
    Tz: TimeZone,
{
    let latest = store.latest_publication_date();
    if !force && !checker.needs_refresh(now, latest) {
        let cached = store.episodes().len();
        info!(cached, latest = ?latest, "Episode cache is fresh");
        return Ok(SyncOutcome::ServedFromCache { cached });
    }

    let fetched = fetch_episodes(source).await?;
    let extracted = fetched.len();
    let fresh = new_episodes(store.episodes(), fetched);
    let inserted = fresh.len();
    if inserted > 0 {
        store.insert_batch(fresh).await?;
    }

    let total = store.episodes().len();
    info!(extracted, inserted, total, "Synchronized episode cache");
    Ok(SyncOutcome::Fetched {
        extracted,
        inserted,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, ScrapeError, StoreError};
    use crate::freshness::PUBLICATION_DAY;
    use crate::store::CacheReader;
    use chrono::NaiveDate;
    use std::cell::Cell;

    const FIXTURE: &str = include_str!("../tests/fixtures/six_minute_english.html");

    #[derive(Default)]
    struct MemoryStore {
        episodes: Vec<EpisodeRecord>,
        writes: usize,
    }

    impl CacheReader for MemoryStore {
        fn latest_publication_date(&self) -> Option<NaiveDate> {
            self.episodes.iter().filter_map(|e| e.publication_date).max()
        }
    }

    impl EpisodeStore for MemoryStore {
        fn episodes(&self) -> &[EpisodeRecord] {
            &self.episodes
        }

        async fn insert_batch(&mut self, records: Vec<EpisodeRecord>) -> Result<(), StoreError> {
            self.episodes.extend(records);
            self.episodes.sort_by(EpisodeRecord::newest_first);
            self.writes += 1;
            Ok(())
        }
    }

    struct FixtureSource {
        calls: Cell<usize>,
    }

    impl FixtureSource {
        fn new() -> Self {
            Self { calls: Cell::new(0) }
        }
    }

    impl ListingSource for FixtureSource {
        async fn fetch_listing(&self) -> Result<Vec<u8>, FetchError> {
            self.calls.set(self.calls.get() + 1);
            Ok(FIXTURE.as_bytes().to_vec())
        }
    }

    struct DownSource;

    impl ListingSource for DownSource {
        async fn fetch_listing(&self) -> Result<Vec<u8>, FetchError> {
            let err = reqwest::Client::new()
                .get("not a url")
                .send()
                .await
                .unwrap_err();
            Err(FetchError::Http(err))
        }
    }

    fn checker() -> FreshnessChecker<Utc> {
        FreshnessChecker::new(PUBLICATION_DAY, Utc)
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
            .and_utc()
    }

    fn record(id: &str, date: (i32, u32, u32)) -> EpisodeRecord {
        EpisodeRecord {
            id: Some(id.to_string()),
            publication_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_empty_cache_fetches_everything() {
        let mut store = MemoryStore::default();
        let source = FixtureSource::new();

        let outcome = sync_episodes(&mut store, &source, &checker(), at(2024, 11, 25), false)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Fetched {
                extracted: 2,
                inserted: 2,
                total: 2
            }
        );
        assert_eq!(source.calls.get(), 1);
        assert_eq!(store.episodes[0].id.as_deref(), Some("Episode 241121"));
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_fetch() {
        let mut store = MemoryStore {
            episodes: vec![record("Episode 241121", (2024, 11, 21))],
            writes: 0,
        };
        let source = FixtureSource::new();

        // Monday after the Thursday release
        let outcome = sync_episodes(&mut store, &source, &checker(), at(2024, 11, 25), false)
            .await
            .unwrap();

        assert_eq!(outcome, SyncOutcome::ServedFromCache { cached: 1 });
        assert_eq!(source.calls.get(), 0);
    }

    #[tokio::test]
    async fn test_stale_cache_merges_only_new_ids() {
        let mut store = MemoryStore {
            episodes: vec![record("Episode 241114", (2024, 11, 14))],
            writes: 0,
        };
        let source = FixtureSource::new();

        let outcome = sync_episodes(&mut store, &source, &checker(), at(2024, 11, 21), false)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Fetched {
                extracted: 2,
                inserted: 1,
                total: 2
            }
        );
        let ids: Vec<_> = store.episodes.iter().map(|e| e.id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["Episode 241121", "Episode 241114"]);
    }

    #[tokio::test]
    async fn test_force_fetches_fresh_cache_without_writing_duplicates() {
        let mut store = MemoryStore::default();
        let source = FixtureSource::new();
        sync_episodes(&mut store, &source, &checker(), at(2024, 11, 25), false)
            .await
            .unwrap();

        let outcome = sync_episodes(&mut store, &source, &checker(), at(2024, 11, 25), true)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Fetched {
                extracted: 2,
                inserted: 0,
                total: 2
            }
        );
        assert_eq!(source.calls.get(), 2);
        assert_eq!(store.writes, 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_cache_untouched() {
        let mut store = MemoryStore {
            episodes: vec![record("Episode 241114", (2024, 11, 14))],
            writes: 0,
        };

        let err = sync_episodes(&mut store, &DownSource, &checker(), at(2024, 11, 21), false)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Scrape(ScrapeError::Fetch(_))));
        assert_eq!(store.episodes.len(), 1);
        assert_eq!(store.writes, 0);
    }

    #[test]
    fn test_new_episodes_dedupes_within_batch() {
        let fresh = vec![
            record("Episode 241121", (2024, 11, 21)),
            record("Episode 241121", (2024, 11, 21)),
            EpisodeRecord::default(),
        ];
        let merged = new_episodes(&[], fresh);
        assert_eq!(merged.len(), 2);

        let again = new_episodes(&merged, vec![EpisodeRecord::default()]);
        assert!(again.is_empty());
    }

    #[test]
    fn test_new_episodes_falls_back_to_detail_link() {
        let existing = vec![EpisodeRecord {
            detail_url_text: Some("/ep-241121".to_string()),
            ..Default::default()
        }];
        let fresh = vec![EpisodeRecord {
            detail_url_text: Some("/ep-241121".to_string()),
            title: Some("Retitled".to_string()),
            ..Default::default()
        }];
        assert!(new_episodes(&existing, fresh).is_empty());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(
            SyncOutcome::ServedFromCache { cached: 3 }.to_string(),
            "cache is fresh; serving 3 cached episodes"
        );
        assert_eq!(
            SyncOutcome::Fetched {
                extracted: 2,
                inserted: 1,
                total: 5
            }
            .to_string(),
            "fetched 2 episodes, 1 new; 5 cached"
        );
    }
}
