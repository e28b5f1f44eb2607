use std::collections::HashSet;

use anyhow::Result;
use rayon::prelude::*;

use crate::fighter_page::{FighterPage, fetch_fighter_index, fetch_fighter_page};
use crate::http_client::http_client;
use crate::stats_store::StatsStore;

#[derive(Debug, Default)]
pub struct ScrapeReport {
    pub letters: usize,
    pub profiles: usize,
    pub fighters: usize,
    pub history_rows: usize,
    pub stat_rows: usize,
    pub errors: Vec<String>,
}

pub struct ScrapeProgress {
    pub current: usize,
    pub total: usize,
    pub message: String,
}

/// Scrapes every fighter listed under `letters` into `store`. Pages are
/// fetched on a bounded pool; ids are assigned in listing order and all
/// writes happen on the calling thread.
pub fn scrape_into_store(
    store: &StatsStore,
    letters: &[char],
    fetch_parallelism: usize,
    mut on_progress: impl FnMut(ScrapeProgress),
) -> Result<ScrapeReport> {
    let client = http_client()?;
    let mut report = ScrapeReport {
        letters: letters.len(),
        ..ScrapeReport::default()
    };

    let listings: Vec<(char, Result<Vec<String>>)> = with_fetch_pool(fetch_parallelism, || {
        letters
            .par_iter()
            .map(|letter| (*letter, fetch_fighter_index(client, *letter)))
            .collect()
    });

    let mut seen = HashSet::new();
    let mut profiles = Vec::new();
    for (letter, listing) in listings {
        match listing {
            Ok(urls) => {
                tracing::debug!(%letter, count = urls.len(), "fighter index loaded");
                for url in urls {
                    if seen.insert(url.clone()) {
                        profiles.push(url);
                    }
                }
            }
            Err(err) => report.errors.push(format!("index '{letter}' failed: {err:#}")),
        }
    }
    report.profiles = profiles.len();
    on_progress(ScrapeProgress {
        current: 0,
        total: profiles.len(),
        message: format!("Found {} fighter profiles", profiles.len()),
    });

    let pages: Vec<(String, Result<FighterPage>)> = with_fetch_pool(fetch_parallelism, || {
        profiles
            .par_iter()
            .map(|url| (url.clone(), fetch_fighter_page(client, url)))
            .collect()
    });

    let mut next_id = 1i64;
    for (idx, (url, page)) in pages.into_iter().enumerate() {
        match page {
            Ok(page) => {
                let id = next_id;
                next_id += 1;
                let summary = store.persist_page(id, &page)?;
                if summary.fighter {
                    report.fighters += 1;
                    report.history_rows += summary.history;
                    report.stat_rows += summary.standing + summary.clinch + summary.ground;
                } else {
                    report.errors.push(format!("{url}: fighter row rejected"));
                }
            }
            Err(err) => report.errors.push(format!("{url}: {err:#}")),
        }
        on_progress(ScrapeProgress {
            current: idx + 1,
            total: report.profiles,
            message: url,
        });
    }

    Ok(report)
}

fn with_fetch_pool<T>(threads: usize, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(action),
        Err(_) => action(),
    }
}
