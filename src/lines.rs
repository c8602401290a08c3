use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

/// A field separator is ", " immediately followed by a known key and ": ".
/// Splitting at these match positions (keeping the key with the segment that
/// follows) means a ", Word: " inside free text never cuts a record apart.
static FIELD_SEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r", (?:Date|XPath|Tag|Text|Link): ").unwrap());

/// One logical record re-parsed from the serialized line format, before
/// table assembly. `xpath` and `tag` are intermediate diagnostics and are
/// dropped when the table is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    pub date: Option<String>,
    pub xpath: Option<String>,
    pub tag: Option<String>,
    pub link: Option<String>,
    pub text: String,
}

/// Read a persisted line buffer, one serialized record per line.
pub fn load_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read line buffer: {}", path.display()))?;
    Ok(content.lines().map(str::to_owned).collect())
}

/// Parse serialized lines back into logical records, merging consecutive
/// lines that carry the same link.
///
/// With `only_linked`, lines without a `Link:` marker are skipped before
/// parsing (the link-extraction use of the buffer). A line from which no
/// known field can be recovered degrades to a placeholder entry with empty
/// text rather than aborting the run.
pub fn parse_lines(lines: &[String], only_linked: bool) -> Vec<Entry> {
    let mut records = Vec::new();
    let mut current: Option<Entry> = None;

    for line in lines {
        if only_linked && !line.contains("Link: ") {
            continue;
        }
        let entry = parse_line(line.trim());

        match current.take() {
            Some(mut open) if open.link == entry.link => {
                open.text.push(' ');
                open.text.push_str(&entry.text);
                current = Some(open);
            }
            Some(open) => {
                records.push(open);
                current = Some(entry);
            }
            None => current = Some(entry),
        }
    }

    if let Some(open) = current {
        records.push(open);
    }
    records
}

fn parse_line(line: &str) -> Entry {
    let mut entry = Entry::default();
    let mut recognized = false;

    for segment in split_fields(line) {
        // Segments without a key/value separator are dropped.
        let Some((key, value)) = segment.split_once(": ") else {
            continue;
        };
        // Duplicate keys keep the last occurrence, matching how the fields
        // were overlaid when the line was written.
        match key.trim() {
            "Date" => entry.date = Some(value.trim().to_string()),
            "XPath" => entry.xpath = Some(value.trim().to_string()),
            "Tag" => entry.tag = Some(value.trim().to_string()),
            "Link" => entry.link = Some(value.trim().to_string()),
            "Text" => entry.text = value.trim().to_string(),
            _ => continue,
        }
        recognized = true;
    }

    if !recognized {
        // Degraded placeholder: keeps downstream merging deterministic and
        // leaves a visible empty record instead of silently dropping input.
        return Entry::default();
    }
    entry
}

/// Cut the line at every separator match; the matched key stays with the
/// following segment (only the leading ", " is consumed).
fn split_fields(line: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    for sep in FIELD_SEP_RE.find_iter(line) {
        segments.push(&line[start..sep.start()]);
        start = sep.start() + 2;
    }
    segments.push(&line[start..]);
    segments
}
