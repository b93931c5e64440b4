//! "6 Minute English" listing page scraper.
//!
//! This module scrapes the episode listing from
//! [BBC Learning English](https://www.bbc.co.uk/learningenglish/english/features/6-minute-english).
//! Episodes are `li.course-content-item` entries inside the widget container
//! that carries a `data-widget-index` attribute:
//!
//! ```html
//! <div data-widget-index="5">
//!   <ul>
//!     <li class="course-content-item">
//!       <div class="img"><a href="/…/ep-241121"><img src="https://…/p0k3w5y2.jpg"></a></div>
//!       <div class="text">
//!         <h2><a href="/…/ep-241121">The secrets to a healthy old age</a></h2>
//!         <div class="details">
//!           <h3><b>Episode 241121</b> / 21 Nov 2024</h3>
//!           <p>Is it possible to slow down the ageing process?</p>
//!         </div>
//!       </div>
//!     </li>
//!   </ul>
//! </div>
//! ```
//!
//! Every field is extracted independently. A missing element only blanks
//! that field on the record, it never drops the item or the page.

use crate::api::{HttpListingSource, ListingSource};
use crate::dates::parse_episode_date;
use crate::error::{ExtractError, ScrapeError};
use crate::models::EpisodeRecord;
use crate::utils::{non_empty, truncate_for_log};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};

const ITEM: &str = "[data-widget-index] li.course-content-item";
const ID: &str = ".details h3 b";
const HEADER: &str = ".details h3";
const TITLE_LINK: &str = ".text h2 a";
const DESCRIPTION: &str = ".details p";
const IMAGE: &str = "img";

/// Compiled selectors for one extraction pass.
struct EpisodeSelectors {
    item: Selector,
    id: Selector,
    header: Selector,
    title_link: Selector,
    description: Selector,
    image: Selector,
}

impl EpisodeSelectors {
    fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            item: compile(ITEM)?,
            id: compile(ID)?,
            header: compile(HEADER)?,
            title_link: compile(TITLE_LINK)?,
            description: compile(DESCRIPTION)?,
            image: compile(IMAGE)?,
        })
    }
}

fn compile(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Extract every episode on a listing page, in document order.
///
/// A page without the listing widget yields an empty vector.
///
/// # Errors
///
/// Only document-level failures are reported; see [`ExtractError`].
pub fn extract_episodes(html: &str) -> Result<Vec<EpisodeRecord>, ExtractError> {
    let selectors = EpisodeSelectors::new()?;
    let document = Html::parse_document(html);

    let episodes: Vec<EpisodeRecord> = document
        .select(&selectors.item)
        .map(|item| extract_episode(item, &selectors))
        .collect();

    debug!(count = episodes.len(), "Extracted episodes from listing markup");
    Ok(episodes)
}

fn extract_episode(item: ElementRef<'_>, selectors: &EpisodeSelectors) -> EpisodeRecord {
    let id = first_text(item, &selectors.id);
    let title_link = item.select(&selectors.title_link).next();

    let publication_date = item
        .select(&selectors.header)
        .next()
        .and_then(|header| parse_episode_date(&element_text(header), id.as_deref()));

    EpisodeRecord {
        title: title_link.and_then(|a| non_empty(&element_text(a))),
        description: first_text(item, &selectors.description),
        publication_date,
        image_url_text: item
            .select(&selectors.image)
            .next()
            .and_then(|img| img.value().attr("src"))
            .and_then(non_empty),
        detail_url_text: title_link
            .and_then(|a| a.value().attr("href"))
            .and_then(non_empty),
        id,
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .and_then(|e| non_empty(&element_text(e)))
}

/// Fetch the listing through `source` and extract its episodes.
///
/// A body that is not valid UTF-8 counts as a page with zero episodes.
///
/// # Errors
///
/// Network failures from `source` are passed through as
/// [`ScrapeError::Fetch`].
#[instrument(level = "info", skip_all)]
pub async fn fetch_episodes<S>(source: &S) -> Result<Vec<EpisodeRecord>, ScrapeError>
where
    S: ListingSource,
{
    let body = source.fetch_listing().await?;
    let html = match String::from_utf8(body) {
        Ok(html) => html,
        Err(e) => {
            warn!(
                error = %e,
                preview = %truncate_for_log(&String::from_utf8_lossy(e.as_bytes()), 120),
                "Listing page is not valid UTF-8; treating as empty"
            );
            return Ok(Vec::new());
        }
    };

    let episodes = extract_episodes(&html)?;
    info!(count = episodes.len(), "Indexed 6 Minute English episodes");
    Ok(episodes)
}

/// Index the listing page at `url` over plain HTTP.
#[instrument(level = "info")]
pub async fn index_episodes(url: &str) -> Result<Vec<EpisodeRecord>, ScrapeError> {
    fetch_episodes(&HttpListingSource::new(url)).await
}
