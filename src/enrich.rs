use std::path::Path;
use std::sync::LazyLock;
use std::thread;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use scraper::{Html, Selector};
use tracing::{info, warn};
use url::Url;

use crate::fetch::Client;
use crate::scrape::FETCH_DELAY;
use crate::table::{Table, NO_HREF};

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Re-fetch each row's linked document and collect its outbound hyperlinks
/// into the `Hyperlinks` column, rewriting the table in place.
///
/// Only rows whose date falls in `[start, end]` are touched. A fetch
/// failure leaves that row's column unset and the batch continues.
pub fn update_hyperlinks(
    client: &Client,
    path: &Path,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<usize> {
    let mut table =
        Table::load_json(path).with_context(|| format!("No table to enrich at {}", path.display()))?;

    let mut updated = 0usize;
    for record in table.records_mut() {
        if !in_range(&record.date, start, end) {
            continue;
        }
        if record.link.is_empty() || record.link == NO_HREF {
            continue;
        }
        thread::sleep(FETCH_DELAY);
        match fetch_links(client, &record.link) {
            Ok(links) => {
                record.hyperlinks = links.join("; ");
                updated += 1;
            }
            Err(e) => warn!("Failed to retrieve {}: {:#}", record.link, e),
        }
    }

    table.to_json_records(path)?;
    info!("Hyperlinks updated for {} rows in {}", updated, path.display());
    Ok(updated)
}

/// Row selection: parseable date inside the inclusive range.
fn in_range(date: &str, start: NaiveDate, end: NaiveDate) -> bool {
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(d) => d >= start && d <= end,
        Err(_) => false,
    }
}

fn fetch_links(client: &Client, url: &str) -> Result<Vec<String>> {
    let page = client.get(url)?;
    if !page.is_ok() {
        bail!("status {}", page.status);
    }
    let base = Url::parse(url)?;
    Ok(extract_links(&page.body, &base))
}

/// All anchor hrefs in a document, resolved absolute against `base`.
fn extract_links(html: &str, base: &Url) -> Vec<String> {
    let doc = Html::parse_document(html);
    doc.select(&ANCHOR_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| match base.join(href) {
            Ok(resolved) => resolved.to_string(),
            Err(_) => href.to_string(),
        })
        .collect()
}
