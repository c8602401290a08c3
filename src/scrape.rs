use std::thread;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use scraper::Html;
use tracing::{info, warn};
use url::Url;

use crate::fetch::{Client, Fetched};
use crate::flatten::{flatten_page, LineBuffer};

const BASE_URL: &str = "https://www.resmigazete.gov.tr/eskiler";

/// Fixed politeness delay before every request. Not configurable on
/// purpose; the archive is a shared government server.
pub const FETCH_DELAY: Duration = Duration::from_secs(1);

/// Scrape stats returned after completion.
pub struct ScrapeStats {
    pub attempted: usize,
    pub ok: usize,
    pub skipped: usize,
}

/// Daily archive URL: eskiler/<year>/<month>/<year><month><day>.htm.
pub fn page_url(year: u16, month: u32, day: u32) -> String {
    format!("{BASE_URL}/{year}/{month:02}/{year}{month:02}{day:02}.htm")
}

/// Apply one fetch outcome to the buffer. A non-200 status or a transport
/// error skips the date; the year loop continues with the next one.
fn ingest_page(
    outcome: Result<Fetched>,
    url: &str,
    date: &str,
    tags: Option<&[String]>,
    buf: &mut LineBuffer,
    stats: &mut ScrapeStats,
) -> Result<()> {
    stats.attempted += 1;
    match outcome {
        Ok(page) if page.is_ok() => {
            let base = Url::parse(url)?;
            let doc = Html::parse_document(&page.body);
            flatten_page(&doc, &base, date, tags, buf);
            stats.ok += 1;
        }
        Ok(page) => {
            warn!("Failed to retrieve {} (status {})", url, page.status);
            stats.skipped += 1;
        }
        Err(e) => {
            warn!("Failed to retrieve {}: {:#}", url, e);
            stats.skipped += 1;
        }
    }
    Ok(())
}

/// Fetch and flatten every day of a year, strictly in date order.
///
/// The date grid is the full 12x31; days that do not exist (Feb 30) or had
/// no issue simply come back non-200 and are skipped. Pages are processed
/// sequentially because the buffer's continuity state depends on traversal
/// order.
pub fn scrape_year(
    client: &Client,
    year: u16,
    tags: Option<&[String]>,
    buf: &mut LineBuffer,
) -> Result<ScrapeStats> {
    let pb = ProgressBar::new(12 * 31);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let mut stats = ScrapeStats {
        attempted: 0,
        ok: 0,
        skipped: 0,
    };

    for month in 1..=12u32 {
        for day in 1..=31u32 {
            let url = page_url(year, month, day);
            let date = format!("{year}-{month:02}-{day:02}");
            thread::sleep(FETCH_DELAY);
            ingest_page(client.get(&url), &url, &date, tags, buf, &mut stats)?;
            pb.inc(1);
        }
    }

    pb.finish_and_clear();
    info!(
        "Year {}: {} pages flattened, {} skipped of {} attempted",
        year, stats.ok, stats.skipped, stats.attempted
    );
    Ok(stats)
}
