//! A web scraper implementing the `qanun::loader::Loader` trait.
//!
//! This module provides a `WebScraper` struct that fetches a law page and
//! extracts its text with a series of increasingly permissive strategies,
//! stopping at the first one that yields substantial text.

use std::time::Duration;

use async_trait::async_trait;
use qanun::document::Document;
use qanun::loader::{Loader, LoaderError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DOCUMENT_ID: &str = "persian_law";

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const LAW_DIV_MIN_CHARS: usize = 100;
const MAIN_CONTENT_MIN_CHARS: usize = 200;
const WHOLE_PAGE_MIN_CHARS: usize = 300;

/// Configuration structure for the web scraper.
///
/// # Examples
///
/// ```json
/// {
///     "url": "https://rc.majlis.ir/fa/law/show/1791612",
///     "timeout_secs": 10,
///     "document_id": "persian_law"
/// }
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Config {
    url: String,
    timeout_secs: Option<u64>,
    document_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum WebScraperError {
    #[error("Invalid scraper config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Fetches one law page and turns it into a single [`Document`].
///
/// Extraction tries, in order:
/// 1. a `div.law_text` element
/// 2. any `div` whose class mentions `law` or `text`, if it holds more than 100 characters
/// 3. the `main` element or `div.container-xxl`, if it holds more than 200 characters
/// 4. the whole page, if it holds more than 300 characters
///
/// Extracted text is normalized to its trimmed non-empty lines joined by `\n`.
pub struct WebScraper {
    url: String,
    document_id: String,
    client: reqwest::Client,
}

impl WebScraper {
    /// Creates a new `WebScraper` from a JSON configuration string
    /// # Errors
    ///  - The provided JSON is malformed, has unknown fields or a zero timeout
    ///  - The HTTP client cannot be built
    pub fn new(json_str: &str) -> Result<Self, WebScraperError> {
        let config: Config = serde_json::from_str(json_str)?;
        let timeout_secs = config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(WebScraperError::Config(serde::de::Error::custom(
                "timeout_secs must be at least one second",
            )));
        }
        let client = reqwest::Client::builder()
            .default_headers(browser_headers())
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                error!(error = %e, "Failed to build HTTP client");
                WebScraperError::Client(e)
            })?;

        Ok(Self {
            url: config.url,
            document_id: config.document_id.unwrap_or(DEFAULT_DOCUMENT_ID.to_string()),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetches the page and extracts its law text
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn scrape(&self) -> Result<String, LoaderError> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            error!(error = %e, "Request failed");
            LoaderError::Request(e.to_string())
        })?;

        let status = response.status();
        debug!(%status, "Received page");
        if status != reqwest::StatusCode::OK {
            return Err(LoaderError::Http {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| LoaderError::Request(e.to_string()))?;
        let html = String::from_utf8_lossy(&bytes);

        extract_law_text(&html).ok_or_else(|| {
            warn!("No substantial text found");
            LoaderError::NoSubstantialText(self.url.clone())
        })
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers
}

/// Runs the extraction strategies over an HTML page.
pub fn extract_law_text(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    if let Some(law_div) = select(&document, "div.law_text").next() {
        let text = clean_text(law_div.text());
        if !text.is_empty() {
            info!(strategy = "law_text", chars = char_len(&text), "Extracted text");
            return Some(text);
        }
    }

    for div in select(&document, "div[class]") {
        let classes = div.value().attr("class").unwrap_or_default().to_lowercase();
        if classes.contains("law") || classes.contains("text") {
            let text = clean_text(div.text());
            if char_len(&text) > LAW_DIV_MIN_CHARS {
                info!(strategy = "law_class", %classes, chars = char_len(&text), "Extracted text");
                return Some(text);
            }
        }
    }

    let main_content = select(&document, "main")
        .next()
        .or_else(|| select(&document, "div.container-xxl").next());
    if let Some(main) = main_content {
        let text = clean_text(main.text());
        if char_len(&text) > MAIN_CONTENT_MIN_CHARS {
            info!(strategy = "main_content", chars = char_len(&text), "Extracted text");
            return Some(text);
        }
    }

    let text = clean_text(document.root_element().text());
    if char_len(&text) > WHOLE_PAGE_MIN_CHARS {
        info!(strategy = "whole_page", chars = char_len(&text), "Extracted text");
        return Some(text);
    }
    None
}

fn select<'a>(document: &'a Html, css: &str) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    let selector = Selector::parse(css).ok();
    let matches: Vec<ElementRef<'a>> = selector
        .map(|s| document.select(&s).collect())
        .unwrap_or_default();
    matches.into_iter()
}

fn clean_text<'a>(fragments: impl Iterator<Item = &'a str>) -> String {
    fragments
        .collect::<String>()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[async_trait]
impl Loader for WebScraper {
    async fn load(&self) -> Result<Vec<Document>, LoaderError> {
        let text = self.scrape().await?;
        Ok(vec![Document::new(self.document_id.clone(), text)])
    }
}
