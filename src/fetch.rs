use std::time::Duration;

use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_8};

const USER_AGENT: &str = concat!("gazette_scraper/", env!("CARGO_PKG_VERSION"));
const TIMEOUT: Duration = Duration::from_secs(30);

/// One fetched page. A non-200 status is a normal outcome here, not an
/// error; callers decide whether to skip.
pub struct Fetched {
    pub status: u16,
    pub body: String,
}

impl Fetched {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

pub struct Client {
    inner: reqwest::blocking::Client,
}

impl Client {
    pub fn new() -> Result<Self> {
        let inner = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Client { inner })
    }

    /// GET a page and decode it using the declared or sniffed charset.
    /// The gazette archive predates UTF-8 adoption; older pages declare
    /// windows-1254 in a meta tag rather than the Content-Type header.
    pub fn get(&self, url: &str) -> Result<Fetched> {
        let response = self
            .inner
            .get(url)
            .send()
            .with_context(|| format!("Request failed: {}", url))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = response
            .bytes()
            .with_context(|| format!("Failed to read body: {}", url))?;

        let body = decode_body(&bytes, content_type.as_deref());
        Ok(Fetched { status, body })
    }
}

fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_from)
        .or_else(|| sniff_meta_charset(bytes))
        .unwrap_or(UTF_8);
    let (decoded, _, _) = encoding.decode(bytes);
    decoded.into_owned()
}

/// Pull the charset out of a Content-Type value like
/// "text/html; charset=windows-1254".
fn charset_from(value: &str) -> Option<&'static Encoding> {
    let rest = value.split("charset=").nth(1)?;
    let label = rest
        .split(|c: char| c == ';' || c == ' ' || c == '"')
        .next()?
        .trim();
    Encoding::for_label(label.as_bytes())
}

/// Look for a <meta charset=...> or http-equiv declaration in the head.
/// Only the first 1024 bytes are inspected, which is where browsers stop too.
fn sniff_meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(1024)];
    let text = String::from_utf8_lossy(head).to_lowercase();
    let idx = text.find("charset=")?;
    let rest = &text[idx + "charset=".len()..];
    let label = rest
        .trim_start_matches(['"', '\''])
        .split(|c: char| c == '"' || c == '\'' || c == '>' || c == ' ' || c == ';' || c == '/')
        .next()?
        .trim();
    Encoding::for_label(label.as_bytes())
}
