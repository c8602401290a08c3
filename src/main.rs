mod enrich;
mod fetch;
mod flatten;
mod lines;
mod paths;
mod scrape;
mod table;
mod xpath;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::flatten::LineBuffer;
use crate::table::Table;

#[derive(Parser)]
#[command(
    name = "gazette_scraper",
    about = "Scrapes the official gazette's daily archive into tabular datasets"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a year's daily pages and save the flattened line buffer
    Scrape {
        #[arg(short, long)]
        year: u16,
        /// Tags to flatten (comma separated)
        #[arg(long, value_delimiter = ',', default_value = "a")]
        tags: Vec<String>,
        /// Flatten every element instead of a tag subset
        #[arg(long)]
        all_tags: bool,
    },
    /// Parse a saved line buffer into JSON-lines + CSV tables
    Parse {
        #[arg(short, long)]
        year: u16,
        /// Keep only lines that carry a link
        #[arg(long)]
        only_linked: bool,
    },
    /// Scrape + parse in one pipeline
    Run {
        #[arg(short, long)]
        year: u16,
        #[arg(long, value_delimiter = ',', default_value = "a")]
        tags: Vec<String>,
        #[arg(long)]
        all_tags: bool,
        #[arg(long)]
        only_linked: bool,
    },
    /// Fill the Hyperlinks column for rows in a date range
    Enrich {
        #[arg(short, long)]
        year: u16,
        /// Inclusive range start, YYYY-MM-DD
        #[arg(long)]
        start: String,
        /// Inclusive range end, YYYY-MM-DD
        #[arg(long)]
        end: String,
        /// Enrich a specific table file instead of the year's titles table
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scrape { year, tags, all_tags } => {
            run_scrape(year, effective_tags(tags, all_tags)).map(|_| ())
        }
        Commands::Parse { year, only_linked } => run_parse(year, only_linked),
        Commands::Run {
            year,
            tags,
            all_tags,
            only_linked,
        } => {
            // The pipeline parses the in-memory buffer directly; the saved
            // copy is for later re-parses.
            let buf = run_scrape(year, effective_tags(tags, all_tags))?;
            parse_and_save(buf.lines(), year, only_linked)
        }
        Commands::Enrich {
            year,
            start,
            end,
            file,
        } => run_enrich(year, &start, &end, file),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// `--all-tags` wins over any `--tags` list.
fn effective_tags(tags: Vec<String>, all_tags: bool) -> Option<Vec<String>> {
    if all_tags {
        None
    } else {
        Some(tags)
    }
}

fn run_scrape(year: u16, tags: Option<Vec<String>>) -> Result<LineBuffer> {
    paths::ensure_out_dir()?;
    let client = fetch::Client::new()?;
    let mut buf = LineBuffer::new();

    println!("Scraping gazette archive for {}...", year);
    let stats = scrape::scrape_year(&client, year, tags.as_deref(), &mut buf)?;
    println!(
        "Fetched {} pages ({} flattened, {} skipped).",
        stats.attempted, stats.ok, stats.skipped
    );

    if buf.is_empty() {
        println!("No lines collected; nothing to save.");
        return Ok(buf);
    }
    let path = paths::buffer_path(year);
    buf.save(&path)?;
    println!("{} lines saved to {}", buf.len(), path.display());
    Ok(buf)
}

fn run_parse(year: u16, only_linked: bool) -> Result<()> {
    let buffer = paths::buffer_path(year);
    if !buffer.exists() {
        println!(
            "Line buffer {} does not exist. Run 'scrape' first.",
            buffer.display()
        );
        return Ok(());
    }
    let raw = lines::load_lines(&buffer)?;
    parse_and_save(&raw, year, only_linked)
}

fn parse_and_save(raw: &[String], year: u16, only_linked: bool) -> Result<()> {
    let entries = lines::parse_lines(raw, only_linked);
    let table = Table::from_entries(entries);
    println!("Parsed {} records from {} lines.", table.len(), raw.len());

    if table.is_empty() {
        println!("No data to save.");
        return Ok(());
    }
    let json = paths::json_path(year, only_linked);
    if table.to_json_records(&json)? {
        println!("Data saved to {}", json.display());
    }
    let csv = paths::csv_path(year, only_linked);
    if table.to_csv(&csv)? {
        println!("Data saved to {}", csv.display());
    }
    Ok(())
}

fn run_enrich(year: u16, start: &str, end: &str, file: Option<PathBuf>) -> Result<()> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .context("--start must be YYYY-MM-DD")?;
    let end =
        NaiveDate::parse_from_str(end, "%Y-%m-%d").context("--end must be YYYY-MM-DD")?;
    let path = file.unwrap_or_else(|| paths::json_path(year, false));

    let client = fetch::Client::new()?;
    let updated = enrich::update_hyperlinks(&client, &path, start, end)?;
    println!("Updated hyperlinks for {} rows in {}", updated, path.display());
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
