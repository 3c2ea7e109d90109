use std::future::Future;

use anyhow::Result;
use log::{info, warn};
use schoolcal_parser::{EventCollections, EventRecord, Fragment, DAY_BOX, KEY_EVENT};

use crate::cache::Cache;
use crate::navigator::Navigator;

/// Walks the calendar and collects key events plus `months` months of
/// regular events.
///
/// Key dates are read from the page as first loaded. The navigator then steps
/// back one month and forward `months` times, extracting after every forward
/// step, so the month it started on is the first one captured.
pub async fn scrape<N: Navigator>(navigator: &mut N, months: usize) -> Result<EventCollections> {
    let mut collections = EventCollections::new();

    let key_events = extract(navigator.fetch_fragments(KEY_EVENT)?, Fragment::KeyEvent)?;
    let count = collections.push_key_events(key_events);
    info!("Captured {count} key events");

    navigator.retreat_month().await?;

    for month in 1..=months {
        navigator.advance_month().await?;

        let events = extract(navigator.fetch_fragments(DAY_BOX)?, Fragment::DayBox)?;
        let count = collections.push_events(events);
        info!("Captured {count} events from month {month}/{months}");
    }

    Ok(collections)
}

fn extract(
    fragments: Vec<String>,
    shape: fn(String) -> Fragment,
) -> schoolcal_parser::Result<Vec<EventRecord>> {
    fragments
        .into_iter()
        .map(shape)
        .filter_map(|fragment| fragment.extract().transpose())
        .collect()
}

/// Returns the cached collections when complete, otherwise opens a navigator
/// and scrapes, refreshing the cache afterwards.
pub async fn load_or_scrape<N, F, Fut>(
    cache: &Cache,
    force_refresh: bool,
    months: usize,
    open: F,
) -> Result<EventCollections>
where
    N: Navigator,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<N>>,
{
    if !force_refresh {
        if let Some(collections) = cache.get()? {
            info!("Loaded {} records from cache", collections.len());
            return Ok(collections);
        }
    }

    info!("Scraping calendar data from website");
    let mut navigator = open().await?;
    let collections = scrape(&mut navigator, months).await?;
    if collections.is_empty() {
        warn!("Scrape found no events");
    } else {
        info!("Scraped {} records", collections.len());
    }

    cache.insert(&collections)?;

    Ok(collections)
}
