//! Runtime configuration.
//!
//! Values come from three layers, later ones winning:
//! 1. Built-in defaults
//! 2. An optional YAML file (`--config`)
//! 3. Command-line flags and their environment variables
//!
//! ```yaml
//! listing_url: https://www.bbc.co.uk/learningenglish/english/features/6-minute-english
//! cache_dir: /var/cache/six_minute_sync
//! publication_day: thursday
//! time_zone: local        # local | utc | +09:00
//! max_retries: 3
//! base_delay_ms: 1000
//! ```

use crate::api::DEFAULT_LISTING_URL;
use crate::error::ConfigError;
use chrono::{DateTime, FixedOffset, Local, Offset, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

/// Contents of the YAML config file. Every key is optional.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FileConfig {
    pub listing_url: String,
    pub cache_dir: Option<PathBuf>,
    pub publication_day: String,
    pub time_zone: String,
    pub max_retries: usize,
    pub base_delay_ms: u64,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            cache_dir: None,
            publication_day: "thursday".to_string(),
            time_zone: "local".to_string(),
            max_retries: 3,
            base_delay_ms: 1000,
        }
    }
}

impl FileConfig {
    /// Load a YAML config file.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| ConfigError::Yaml {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file deserializes to `null`, which should mean "all defaults".
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }
}

/// Which calendar the freshness check counts days in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeZoneSetting {
    Local,
    Utc,
    Fixed(FixedOffset),
}

impl TimeZoneSetting {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "utc" | "z" => Ok(Self::Utc),
            other => other
                .parse::<FixedOffset>()
                .map(Self::Fixed)
                .map_err(|_| ConfigError::UnknownTimeZone(value.to_string())),
        }
    }

    /// UTC offset in effect at `now`. For `Local` this follows daylight
    /// saving as of that instant.
    pub fn offset_at(&self, now: DateTime<Utc>) -> FixedOffset {
        match self {
            Self::Local => now.with_timezone(&Local).offset().fix(),
            Self::Utc => Utc.fix(),
            Self::Fixed(offset) => *offset,
        }
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub listing_url: String,
    pub cache_dir: PathBuf,
    pub publication_day: Weekday,
    pub time_zone: TimeZoneSetting,
    pub max_retries: usize,
    pub base_delay: Duration,
}

/// Values supplied on the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listing_url: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub utc: bool,
}

impl Settings {
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self, ConfigError> {
        let publication_day = parse_weekday(&file.publication_day)?;
        let time_zone = if overrides.utc {
            TimeZoneSetting::Utc
        } else {
            TimeZoneSetting::parse(&file.time_zone)?
        };
        let settings = Self {
            listing_url: overrides.listing_url.unwrap_or(file.listing_url),
            cache_dir: overrides
                .cache_dir
                .or(file.cache_dir)
                .unwrap_or_else(default_cache_dir),
            publication_day,
            time_zone,
            max_retries: file.max_retries,
            base_delay: Duration::from_millis(file.base_delay_ms),
        };
        debug!(?settings, "Resolved settings");
        Ok(settings)
    }
}

/// Accepts full or abbreviated English weekday names, any case.
pub fn parse_weekday(value: &str) -> Result<Weekday, ConfigError> {
    value
        .trim()
        .parse::<Weekday>()
        .map_err(|_| ConfigError::UnknownWeekday(value.to_string()))
}

/// `<platform cache dir>/six_minute_sync`, or `./.six_minute_sync` when the
/// platform has no cache dir.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("six_minute_sync"))
        .unwrap_or_else(|| PathBuf::from(".six_minute_sync"))
}
