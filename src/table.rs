use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::lines::Entry;

/// Sentinel for auxiliary columns that are intentionally empty, as opposed
/// to missing because of an error.
pub const SENTINEL: &str = "EMPTY";
pub const NO_HREF: &str = "No href available";

/// One output row. Column names are the serialized field names; the order
/// of declaration is the stable column order for CSV output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Link")]
    pub link: String,
    #[serde(rename = "Text")]
    pub text: String,
    #[serde(rename = "Legal Category")]
    pub legal_category: String,
    #[serde(rename = "Summary")]
    pub summary: String,
    #[serde(rename = "Hyperlinks")]
    pub hyperlinks: String,
    #[serde(rename = "Note1")]
    pub note1: String,
    #[serde(rename = "Note2")]
    pub note2: String,
    #[serde(rename = "Note3")]
    pub note3: String,
}

const COLUMNS: &[&str] = &[
    "Date",
    "Link",
    "Text",
    "Legal Category",
    "Summary",
    "Hyperlinks",
    "Note1",
    "Note2",
    "Note3",
];

#[derive(Debug, Default)]
pub struct Table {
    records: Vec<Record>,
}

impl Table {
    /// Assemble the final table: intermediate XPath/Tag fields are dropped,
    /// absent links get the sentinel, auxiliary columns start empty.
    pub fn from_entries(entries: Vec<Entry>) -> Self {
        let records = entries
            .into_iter()
            .map(|e| Record {
                date: e.date.unwrap_or_default(),
                link: e.link.unwrap_or_else(|| NO_HREF.to_string()),
                text: e.text,
                legal_category: SENTINEL.to_string(),
                summary: SENTINEL.to_string(),
                hyperlinks: SENTINEL.to_string(),
                note1: SENTINEL.to_string(),
                note2: SENTINEL.to_string(),
                note3: SENTINEL.to_string(),
            })
            .collect();
        Table { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write JSON-lines, one record object per line. Returns false (and
    /// writes nothing) when the table is empty.
    pub fn to_json_records(&self, path: &Path) -> Result<bool> {
        if self.records.is_empty() {
            info!("No data to save.");
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        for record in &self.records {
            serde_json::to_writer(&mut out, record)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(true)
    }

    /// Write CSV with a header row. Returns false (and writes nothing) when
    /// the table is empty.
    pub fn to_csv(&self, path: &Path) -> Result<bool> {
        if self.records.is_empty() {
            info!("No data to save.");
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        write_csv_row(&mut out, COLUMNS.iter().copied())?;
        for r in &self.records {
            write_csv_row(
                &mut out,
                [
                    r.date.as_str(),
                    r.link.as_str(),
                    r.text.as_str(),
                    r.legal_category.as_str(),
                    r.summary.as_str(),
                    r.hyperlinks.as_str(),
                    r.note1.as_str(),
                    r.note2.as_str(),
                    r.note3.as_str(),
                ],
            )?;
        }
        out.flush()?;
        Ok(true)
    }

    /// Load a previously written JSON-lines table.
    pub fn load_json(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open table: {}", path.display()))?;
        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: Record = serde_json::from_str(&line)
                .with_context(|| format!("Malformed table row in {}", path.display()))?;
            records.push(record);
        }
        Ok(Table { records })
    }
}

fn write_csv_row<'a, W, I>(out: &mut W, cells: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a str>,
{
    let mut first = true;
    for cell in cells {
        if !first {
            out.write_all(b",")?;
        }
        first = false;
        if needs_quotes(cell) {
            write!(out, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            out.write_all(cell.as_bytes())?;
        }
    }
    out.write_all(b"\n")?;
    Ok(())
}

fn needs_quotes(cell: &str) -> bool {
    cell.contains(',') || cell.contains('"') || cell.contains('\n') || cell.contains('\r')
}
