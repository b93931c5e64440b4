//! Listing page scrapers.
//!
//! Each scraper follows the same two-step shape:
//!
//! 1. **Extraction**: a pure function from raw markup to records, testable
//!    offline against fixtures under `tests/fixtures/`
//! 2. **Indexing**: an async wrapper that fetches the page through a
//!    [`ListingSource`](crate::api::ListingSource) and runs the extraction
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | BBC Learning English | [`six_minute_english`] | HTML scraping | Weekly episodes, published on Thursdays |

pub mod six_minute_english;
