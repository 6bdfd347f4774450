//! Fetches a web page and reduces it to readable paragraph text.
//!
//! Fetch failures never propagate: the fetcher returns a string describing
//! the failure so the web responder can report that no content was found.

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

/// Paragraph elements, including attributes, across line breaks.
static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p(?:\s[^>]*)?>(.*?)</p\s*>").unwrap());

/// Prefix of the placeholder returned when a page cannot be fetched.
pub const FETCH_FAILURE_PREFIX: &str = "Failed to fetch content:";

#[async_trait]
pub trait WebFetcher: Send + Sync {
    /// Return the visible text of `url`, or a failure description.
    async fn fetch(&self, url: &str) -> String;
}

pub struct HttpWebFetcher {
    client: reqwest::Client,
    max_chars: usize,
}

impl HttpWebFetcher {
    pub fn new(timeout_secs: u64, max_chars: usize) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .user_agent(concat!("lexgate/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            max_chars,
        }
    }

    async fn try_fetch(&self, url: &str) -> anyhow::Result<String> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        let html = resp.text().await?;
        Ok(truncate_chars(&extract_paragraph_text(&html), self.max_chars))
    }
}

#[async_trait]
impl WebFetcher for HttpWebFetcher {
    async fn fetch(&self, url: &str) -> String {
        match self.try_fetch(url).await {
            Ok(text) => {
                tracing::debug!(url, chars = text.chars().count(), "Fetched web content");
                text
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "Web fetch failed, using placeholder content");
                format!("{FETCH_FAILURE_PREFIX} {e}")
            }
        }
    }
}

/// Text of every non-empty `<p>` element, one per line.
pub fn extract_paragraph_text(html: &str) -> String {
    PARAGRAPH
        .captures_iter(html)
        .filter_map(|cap| cap.get(1))
        .map(|m| nanohtml2text::html2text(m.as_str()))
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// First `max` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
