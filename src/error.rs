//! Error types for the synchronization pipeline.
//!
//! Each stage owns a small error enum. The orchestrator folds them into
//! [`SyncError`] so callers can surface a single retryable failure.

/// Document-level extraction failure.
///
/// Per-item irregularities never surface here; a missing field simply
/// becomes `None` on the record.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Failure while fetching the remote listing page.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure reading or writing one of the local JSON files.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed json in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("unknown weekday `{0}`")]
    UnknownWeekday(String),
    #[error("unknown time zone `{0}` (expected `local` or `utc`)")]
    UnknownTimeZone(String),
}

/// Fetching the listing and extracting its episodes.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Everything that can go wrong during one synchronization run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Scrape(#[from] ScrapeError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
