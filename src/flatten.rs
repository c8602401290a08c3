use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::debug;
use url::Url;

use crate::xpath::derive_path;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Page furniture that carries no content: pagination arrows, decorative
/// glyphs left over from the Wingdings-era layout, and the "back to top"
/// label present on every daily page.
const FURNITURE: &[&str] = &["Å", "Æ", "Sayfa Başı", "ÖNCEKİ", "SONRAKİ"];

/// Accumulator threaded through the whole multi-page scrape.
///
/// `last_link` deliberately survives page boundaries: if the first fragment
/// of a day resolves to the same link as the last fragment of the previous
/// day, the two merge. That is how the line format is defined, and the line
/// parser applies the same rule when it re-reads the buffer.
#[derive(Debug, Default)]
pub struct LineBuffer {
    lines: Vec<String>,
    last_link: Option<String>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn last_link(&self) -> Option<&str> {
        self.last_link.as_deref()
    }

    fn emit(&mut self, line: String, link: Option<String>) {
        self.lines.push(line);
        self.last_link = link;
    }

    fn continue_last(&mut self, text: &str) {
        if let Some(last) = self.lines.last_mut() {
            last.push(' ');
            last.push_str(text);
        }
    }

    /// Persist one line per logical record; continuation merges have already
    /// been applied in memory.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.lines.join("\n"))
            .with_context(|| format!("Failed to write line buffer: {}", path.display()))
    }
}

/// Flatten one parsed page into the buffer.
///
/// Walks every element in document order, restricted to `tags` when given
/// (the daily archive is usually scraped anchors-only). Each element's
/// normalized text either continues the previous line (same resolved link)
/// or opens a new one in the fixed field order
/// `Date, XPath, Tag, [Link,] Text`.
pub fn flatten_page(
    doc: &Html,
    page_url: &Url,
    date: &str,
    tags: Option<&[String]>,
    buf: &mut LineBuffer,
) {
    for node in doc.tree.root().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        let name = element.value().name();
        if let Some(wanted) = tags {
            if !wanted.iter().any(|t| t == name) {
                continue;
            }
        }

        let text = normalize_text(&element.text().collect::<String>());
        if text.is_empty() || FURNITURE.contains(&text.as_str()) {
            continue;
        }

        let link = if name == "a" {
            element
                .value()
                .attr("href")
                .map(|href| resolve_href(page_url, href))
        } else {
            None
        };

        if !buf.is_empty() && link == buf.last_link {
            buf.continue_last(&text);
            continue;
        }

        let xpath = derive_path(node);
        let line = match &link {
            Some(url) => format!(
                "Date: {}, XPath: {}, Tag: {}, Link: {}, Text: {}",
                date, xpath, name, url, text
            ),
            None => format!("Date: {}, XPath: {}, Tag: {}, Text: {}", date, xpath, name, text),
        };
        debug!(line = %line, "emit");
        buf.emit(line, link);
    }
}

/// Collapse runs of whitespace to single spaces, trim, and drop the stray
/// U+0094 control character that the legacy pages embed.
fn normalize_text(raw: &str) -> String {
    let cleaned = raw.replace('\u{0094}', "");
    WHITESPACE_RE.replace_all(&cleaned, " ").trim().to_string()
}

fn resolve_href(base: &Url, href: &str) -> String {
    match base.join(href) {
        Ok(resolved) => resolved.to_string(),
        // Malformed href (rare, hand-edited pages): keep it verbatim so the
        // record still groups consistently.
        Err(_) => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATE: &str = "2024-01-01";

    fn base() -> Url {
        Url::parse("https://www.resmigazete.gov.tr/eskiler/2024/01/20240101.htm").unwrap()
    }

    fn flatten(html: &str, tags: Option<&[String]>, buf: &mut LineBuffer) {
        let doc = Html::parse_document(html);
        flatten_page(&doc, &base(), DATE, tags, buf);
    }

    fn anchors_only() -> Vec<String> {
        vec!["a".to_string()]
    }

    #[test]
    fn single_anchor_single_line() {
        let mut buf = LineBuffer::new();
        flatten(
            "<html><body><a href='/doc.htm'>Title A</a></body></html>",
            Some(&anchors_only()),
            &mut buf,
        );
        assert_eq!(buf.len(), 1);
        assert_eq!(
            buf.lines()[0],
            "Date: 2024-01-01, XPath: /html[1]/body[1]/a[1], Tag: a, \
             Link: https://www.resmigazete.gov.tr/doc.htm, Text: Title A"
        );
    }

    #[test]
    fn same_link_fragments_merge() {
        let mut buf = LineBuffer::new();
        flatten(
            "<html><body><a href='/doc.htm'>Title</a><a href='/doc.htm'>Continued</a></body></html>",
            Some(&anchors_only()),
            &mut buf,
        );
        assert_eq!(buf.len(), 1);
        assert!(buf.lines()[0].ends_with("Text: Title Continued"));
    }

    #[test]
    fn different_links_start_new_lines() {
        let mut buf = LineBuffer::new();
        flatten(
            "<html><body><a href='/a.htm'>One</a><a href='/b.htm'>Two</a></body></html>",
            Some(&anchors_only()),
            &mut buf,
        );
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn furniture_text_is_dropped() {
        let mut buf = LineBuffer::new();
        flatten(
            "<html><body><a href='/top'>Sayfa Başı</a><a href='/n'>ÖNCEKİ</a></body></html>",
            Some(&anchors_only()),
            &mut buf,
        );
        assert!(buf.is_empty());
        assert_eq!(buf.last_link(), None);
    }

    #[test]
    fn empty_page_leaves_state_unchanged() {
        let mut buf = LineBuffer::new();
        flatten(
            "<html><body><a href='/doc.htm'>Title</a></body></html>",
            Some(&anchors_only()),
            &mut buf,
        );
        let before = buf.len();
        let last = buf.last_link().map(str::to_owned);
        flatten("<html><body><p>no anchors here</p></body></html>", Some(&anchors_only()), &mut buf);
        assert_eq!(buf.len(), before);
        assert_eq!(buf.last_link(), last.as_deref());
    }

    #[test]
    fn continuity_spans_page_boundaries() {
        let mut buf = LineBuffer::new();
        flatten(
            "<html><body><a href='/doc.htm'>Part one</a></body></html>",
            Some(&anchors_only()),
            &mut buf,
        );
        flatten(
            "<html><body><a href='/doc.htm'>part two</a></body></html>",
            Some(&anchors_only()),
            &mut buf,
        );
        assert_eq!(buf.len(), 1);
        assert!(buf.lines()[0].ends_with("Text: Part one part two"));
    }

    #[test]
    fn whitespace_collapsed_and_control_char_stripped() {
        let mut buf = LineBuffer::new();
        flatten(
            "<html><body><a href='/doc.htm'>  Some\n\n  title\u{0094}  text </a></body></html>",
            Some(&anchors_only()),
            &mut buf,
        );
        assert!(buf.lines()[0].ends_with("Text: Some title text"));
    }

    #[test]
    fn anchor_without_href_has_no_link_field() {
        let mut buf = LineBuffer::new();
        flatten("<html><body><a name='top'>Bookmark</a></body></html>", Some(&anchors_only()), &mut buf);
        assert_eq!(buf.len(), 1);
        assert!(!buf.lines()[0].contains("Link: "));
        assert!(buf.lines()[0].contains("Tag: a, Text: Bookmark"));
    }

    #[test]
    fn linkless_fragments_merge_with_each_other() {
        // Continuity key is the resolved link; two consecutive link-less
        // fragments share the absent key and collapse into one line.
        let mut buf = LineBuffer::new();
        flatten(
            "<html><body><table><tr><td>Cell one</td><td>cell two</td></tr></table></body></html>",
            Some(&["td".to_string()]),
            &mut buf,
        );
        assert_eq!(buf.len(), 1);
        assert!(buf.lines()[0].ends_with("Text: Cell one cell two"));
    }

    #[test]
    fn all_tags_walks_every_element() {
        let mut buf = LineBuffer::new();
        flatten(
            "<html><body><p>Intro</p><a href='/doc.htm'>Title</a></body></html>",
            None,
            &mut buf,
        );
        // html/body/p share the absent link and collapse into one line; the
        // anchor's link breaks continuity and opens the second.
        assert_eq!(buf.len(), 2);
        assert!(buf.lines()[0].contains("Tag: html,"));
        assert!(buf.lines()[1].contains("Tag: a,"));
    }

    #[test]
    fn relative_href_resolved_against_page_url() {
        let mut buf = LineBuffer::new();
        flatten(
            "<html><body><a href='20240101-1.pdf'>Karar</a></body></html>",
            Some(&anchors_only()),
            &mut buf,
        );
        assert!(buf.lines()[0]
            .contains("Link: https://www.resmigazete.gov.tr/eskiler/2024/01/20240101-1.pdf"));
    }

    #[test]
    fn fixture_day_page() {
        let html = std::fs::read_to_string("tests/fixtures/20240101.htm").unwrap();
        let mut buf = LineBuffer::new();
        flatten(&html, Some(&anchors_only()), &mut buf);

        // Three documents; the split "Karar Sayısı" anchors merge, the
        // furniture anchors produce nothing.
        assert_eq!(buf.len(), 3);
        assert!(buf.lines()[0]
            .ends_with("Text: Karar Sayısı: 8001, Bazı Maddelerin İthalatına İlişkin Karar"));
        assert!(buf.lines()[1].contains("Link: https://www.resmigazete.gov.tr/eskiler/2024/01/20240101-2.pdf"));
        assert!(buf.lines()[2]
            .ends_with("Text: Enerji Piyasası Düzenleme Kurulunun 06/12/2023 Tarihli Kararları"));
        assert!(!buf.lines().iter().any(|l| l.contains("Sayfa Başı")));
        assert!(!buf.lines().iter().any(|l| l.contains("ÖNCEKİ")));
    }

    #[test]
    fn save_writes_one_line_per_record() {
        let mut buf = LineBuffer::new();
        flatten(
            "<html><body><a href='/a.htm'>One</a><a href='/b.htm'>Two</a></body></html>",
            Some(&anchors_only()),
            &mut buf,
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("XPaths_gazette_2024.txt");
        buf.save(&path).unwrap();
        let saved = std::fs::read_to_string(&path).unwrap();
        assert_eq!(saved.lines().count(), 2);
    }
}
