//! # six_minute_sync
//!
//! Keeps a local cache of BBC Learning English "6 Minute English" episodes
//! in step with the weekly listing page.
//!
//! ## Pipeline
//!
//! 1. **Freshness**: [`freshness::FreshnessChecker`] compares the newest
//!    cached episode against the last Thursday
//! 2. **Fetching**: an [`api::ListingSource`] downloads the listing page
//! 3. **Extraction**: [`scrapers::six_minute_english::extract_episodes`]
//!    turns the markup into [`models::EpisodeRecord`]s
//! 4. **Storage**: [`store::JsonEpisodeStore`] merges new episodes into the
//!    JSON cache
//!
//! [`sync::sync_episodes`] runs all four. The freshness check and the
//! extractor are pure and can be called from any task.

pub mod api;
pub mod cli;
pub mod config;
pub mod dates;
pub mod error;
pub mod favorites;
pub mod freshness;
pub mod models;
pub mod scrapers;
pub mod store;
pub mod sync;
pub mod utils;
