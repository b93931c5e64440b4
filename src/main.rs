//! # six_minute_sync
//!
//! Command-line front end for the episode sync pipeline.
//!
//! ## Usage
//!
//! ```sh
//! six_minute_sync sync
//! six_minute_sync list --favorites
//! six_minute_sync favorite add "Episode 241121"
//! ```

use chrono::{DateTime, FixedOffset, Utc};
use clap::Parser;
use six_minute_sync::api::{HttpListingSource, RetryFetch};
use six_minute_sync::cli::{Cli, Command, FavoriteAction};
use six_minute_sync::config::{FileConfig, Settings};
use six_minute_sync::favorites::{FavoriteIds, JsonFavorites};
use six_minute_sync::freshness::FreshnessChecker;
use six_minute_sync::models::EpisodeRecord;
use six_minute_sync::store::{CacheReader, EpisodeStore, JsonEpisodeStore};
use six_minute_sync::sync::sync_episodes;
use six_minute_sync::utils::ensure_writable_dir;
use std::error::Error;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};
use url::Url;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let file_config = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(file_config, args.overrides())?;
    info!(cache_dir = %settings.cache_dir.display(), listing_url = %settings.listing_url, "six_minute_sync starting up");

    let result = run(&args.command, &settings).await;
    if let Err(e) = &result {
        error!(error = %e, "Command failed; safe to retry");
    }

    let elapsed = start_time.elapsed();
    info!(?elapsed, "Execution complete");
    result
}

async fn run(command: &Command, settings: &Settings) -> Result<(), Box<dyn Error>> {
    let now = Utc::now();
    match command {
        Command::Sync { force } => {
            if let Err(e) = ensure_writable_dir(&settings.cache_dir).await {
                error!(
                    path = %settings.cache_dir.display(),
                    error = %e,
                    "Cache directory is not writable (fix perms or choose a different path)"
                );
                return Err(e.into());
            }
            let mut store = JsonEpisodeStore::open(&settings.cache_dir).await?;
            let source = RetryFetch::new(
                HttpListingSource::new(settings.listing_url.as_str()),
                settings.max_retries,
                settings.base_delay,
            );
            let outcome =
                sync_episodes(&mut store, &source, &checker(settings, now), now, *force).await?;
            println!("{outcome}");
        }
        Command::Check => {
            let store = JsonEpisodeStore::open(&settings.cache_dir).await?;
            let checker = checker(settings, now);
            let latest = store.latest_publication_date();
            let verdict = if checker.needs_refresh(now, latest) {
                "stale: fetch from server"
            } else {
                "fresh: serve from cache"
            };
            let latest = latest.map_or_else(|| "none".to_string(), |d| d.to_string());
            println!(
                "{verdict} (last {:?} {}, newest cached {latest})",
                checker.publication_day(),
                checker.last_publication_day(now),
            );
        }
        Command::List { favorites, json } => {
            let store = JsonEpisodeStore::open(&settings.cache_dir).await?;
            let favorite_ids = JsonFavorites::open(&settings.cache_dir).await?;
            let base = Url::parse(&settings.listing_url)?;
            let episodes: Vec<&EpisodeRecord> = store
                .episodes()
                .iter()
                .filter(|e| !*favorites || e.is_favorite(favorite_ids.favorite_ids()))
                .collect();
            if *json {
                println!("{}", serde_json::to_string_pretty(&episodes)?);
            } else {
                for episode in episodes {
                    let favorite = episode.is_favorite(favorite_ids.favorite_ids());
                    println!("{}", list_line(episode, favorite, &base));
                }
            }
        }
        Command::Favorite { action } => {
            let mut favorites = JsonFavorites::open(&settings.cache_dir).await?;
            match action {
                FavoriteAction::Add { id } => {
                    let mut ids = favorites.favorite_ids().clone();
                    ids.insert(id.clone());
                    favorites.set_favorite_ids(ids).await?;
                }
                FavoriteAction::Remove { id } => {
                    let mut ids = favorites.favorite_ids().clone();
                    ids.remove(id);
                    favorites.set_favorite_ids(ids).await?;
                }
                FavoriteAction::Toggle { id } => {
                    let now_favorite = favorites.toggle(id).await?;
                    println!("{id}: {}", if now_favorite { "favorite" } else { "not favorite" });
                }
                FavoriteAction::List => {
                    for id in favorites.favorite_ids() {
                        println!("{id}");
                    }
                }
            }
        }
    }
    Ok(())
}

fn checker(settings: &Settings, now: DateTime<Utc>) -> FreshnessChecker<FixedOffset> {
    FreshnessChecker::new(settings.publication_day, settings.time_zone.offset_at(now))
}

fn list_line(episode: &EpisodeRecord, favorite: bool, base: &Url) -> String {
    let date = episode
        .publication_date
        .map_or_else(|| "----------".to_string(), |d| d.to_string());
    let link = episode
        .detail_url(base)
        .map_or_else(String::new, |url| format!("  <{url}>"));
    format!(
        "{} {date}  {:<16} {}{link}",
        if favorite { '*' } else { ' ' },
        episode.id.as_deref().unwrap_or("-"),
        episode.title.as_deref().unwrap_or("(untitled)"),
    )
}
