//! Fetching the remote listing page, with exponential backoff retry logic.
//!
//! # Architecture
//!
//! The module uses a trait-based design for flexibility:
//! - [`ListingSource`]: Core trait defining an async "fetch the page" call
//! - [`HttpListingSource`]: Plain HTTP GET with `reqwest`
//! - [`RetryFetch`]: Decorator that adds retry logic to any `ListingSource`
//!
//! Extraction never goes through here, so it stays testable on raw strings.
//!
//! # Retry Strategy
//!
//! - Exponential backoff starting at `base_delay`
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use crate::error::FetchError;
use rand::{Rng, rng};
use reqwest::Client;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Default location of the "6 Minute English" listing page.
pub const DEFAULT_LISTING_URL: &str =
    "https://www.bbc.co.uk/learningenglish/english/features/6-minute-english";

/// Something that can produce the raw bytes of the listing page.
///
/// The body is returned undecoded; deciding what to do with bytes that are
/// not UTF-8 is the extractor wrapper's job.
pub trait ListingSource {
    /// Fetch the listing page once.
    async fn fetch_listing(&self) -> Result<Vec<u8>, FetchError>;
}

/// Fetches the listing page with a single HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpListingSource {
    client: Client,
    url: String,
}

impl HttpListingSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), url)
    }

    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl ListingSource for HttpListingSource {
    #[instrument(level = "info", skip_all, fields(url = %self.url))]
    async fn fetch_listing(&self) -> Result<Vec<u8>, FetchError> {
        let t0 = Instant::now();
        let response = self.client.get(&self.url).send().await?.error_for_status()?;
        let status = response.status();
        let body = response.bytes().await?;
        info!(
            %status,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched listing page"
        );
        Ok(body.to_vec())
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`ListingSource`].
///
/// # Backoff Strategy
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    /// The underlying source to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: ListingSource,
{
    /// Create a new retry wrapper around an existing [`ListingSource`].
    ///
    /// # Example
    ///
    /// ```ignore
    /// let source = HttpListingSource::new(DEFAULT_LISTING_URL);
    /// let retrying = RetryFetch::new(source, 3, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = (attempt.saturating_sub(1)).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> ListingSource for RetryFetch<T>
where
    T: ListingSource,
{
    #[instrument(level = "info", skip_all)]
    async fn fetch_listing(&self) -> Result<Vec<u8>, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.fetch_listing().await {
                Ok(body) => {
                    debug!(attempt, "fetch_listing() succeeded");
                    return Ok(body);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "fetch_listing() exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "fetch_listing() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
