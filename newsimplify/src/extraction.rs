//! Article extraction: static download first, headless browser render as the single fallback.
//!
//! Both stages feed the same parser (readability for the body, scraper for metadata).
//! A stage is successful only when the parsed body text is non-empty after trimming.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const STATUS_STANDARD: &str = "Article extracted using the standard method.";
pub const STATUS_BROWSER: &str = "Article extracted using the headless browser.";
pub const STATUS_FAILED: &str = "Failed to extract article content using both methods.";
const EMPTY_AFTER_BROWSER: &str = "Empty article text even after using the browser.";

/// Width used when flattening the article HTML to text
const TEXT_WIDTH: usize = 100;

/// Result of extracting one article. Either `text` or `error` is set, never both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    /// Human-readable trace of which extraction path was taken
    pub status: String,
    pub title: Option<String>,
    pub authors: Vec<String>,
    /// `YYYY-MM-DD`
    pub publish_date: Option<String>,
    pub text: Option<String>,
    pub error: Option<String>,
}

impl ArticleRecord {
    fn success(status: &str, article: ParsedArticle) -> Self {
        Self {
            status: status.to_string(),
            title: article.title,
            authors: article.authors,
            publish_date: article.publish_date,
            text: Some(article.text),
            error: None,
        }
    }

    fn failure(error: String) -> Self {
        Self {
            status: STATUS_FAILED.to_string(),
            error: Some(error),
            ..Self::default()
        }
    }
}

/// Parsed content of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArticle {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub publish_date: Option<String>,
    pub text: String,
}

/// Outcome of one extraction stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Success(ParsedArticle),
    /// Page parsed but carried no body text
    Empty,
    Failure(String),
}

/// Something that can turn a URL into HTML
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_html(&self, url: &str) -> Result<String>;
}

#[async_trait::async_trait]
pub trait ArticleExtractor: Send + Sync {
    /// Extract an article. Failures are reported inside the record, never as `Err`.
    async fn extract(&self, url: &str) -> ArticleRecord;
}

/// Plain HTTP download
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    pub fn new(cfg: &common::ExtractionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .user_agent(cfg.user_agent.as_str())
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await.context("failed to fetch article page")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("article fetch failed with status: {}", status));
        }

        response.text().await.context("failed to read response body")
    }
}

/// Static download first, browser render second
pub struct TwoStageExtractor {
    primary: Arc<dyn PageSource>,
    fallback: Arc<dyn PageSource>,
}

impl TwoStageExtractor {
    pub fn new(primary: Arc<dyn PageSource>, fallback: Arc<dyn PageSource>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait::async_trait]
impl ArticleExtractor for TwoStageExtractor {
    async fn extract(&self, url: &str) -> ArticleRecord {
        match run_stage(self.primary.as_ref(), url).await {
            StageOutcome::Success(article) => {
                info!(%url, chars = article.text.len(), "extraction: standard method succeeded");
                return ArticleRecord::success(STATUS_STANDARD, article);
            }
            StageOutcome::Empty => {
                warn!(%url, "extraction: standard method returned empty text, falling back to browser");
            }
            StageOutcome::Failure(e) => {
                warn!(%url, error = %e, "extraction: standard method failed, falling back to browser");
            }
        }

        match run_stage(self.fallback.as_ref(), url).await {
            StageOutcome::Success(article) => {
                info!(%url, chars = article.text.len(), "extraction: browser method succeeded");
                ArticleRecord::success(STATUS_BROWSER, article)
            }
            StageOutcome::Empty => {
                warn!(%url, "extraction: browser method returned empty text");
                ArticleRecord::failure(format!("Browser method exception: {}", EMPTY_AFTER_BROWSER))
            }
            StageOutcome::Failure(e) => {
                warn!(%url, error = %e, "extraction: browser method failed");
                ArticleRecord::failure(format!("Browser method exception: {}", e))
            }
        }
    }
}

async fn run_stage(source: &dyn PageSource, url: &str) -> StageOutcome {
    let html = match source.fetch_html(url).await {
        Ok(html) => html,
        Err(e) => return StageOutcome::Failure(format!("{:#}", e)),
    };

    match parse_article(&html, url) {
        Ok(article) if article.text.trim().is_empty() => StageOutcome::Empty,
        Ok(article) => StageOutcome::Success(article),
        Err(e) => StageOutcome::Failure(format!("{:#}", e)),
    }
}

/// Parse an already downloaded page. Body and title come from readability,
/// authors and publish date from the document's metadata.
pub fn parse_article(html: &str, url: &str) -> Result<ParsedArticle> {
    let url_obj = url::Url::parse(url).context("failed to parse article URL")?;

    let mut reader = Cursor::new(html.as_bytes());
    let product = readability::extractor::extract(&mut reader, &url_obj)
        .map_err(|e| anyhow::anyhow!("readability failed: {:?}", e))?;

    let text = match html2text::from_read(product.content.as_bytes(), TEXT_WIDTH) {
        Ok(text) => text,
        Err(e) => {
            warn!("extraction: failed to flatten article HTML: {}", e);
            product.text
        }
    };

    let document = Html::parse_document(html);
    let title = Some(product.title.trim().to_string()).filter(|t| !t.is_empty());

    Ok(ParsedArticle {
        title,
        authors: find_authors(&document),
        publish_date: find_publish_date(&document),
        text: text.trim().to_string(),
    })
}

fn meta_contents<'a>(document: &'a Html, selectors: &[&str]) -> Vec<&'a str> {
    selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .flat_map(|sel| document.select(&sel).collect::<Vec<_>>())
        .filter_map(|el| el.value().attr("content").or_else(|| el.value().attr("datetime")))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn find_authors(document: &Html) -> Vec<String> {
    let mut authors: Vec<String> = Vec::new();
    let candidates = meta_contents(
        document,
        &[r#"meta[name="author"]"#, r#"meta[property="article:author"]"#],
    );

    for candidate in candidates {
        // Profile links are not names
        if candidate.starts_with("http") {
            continue;
        }
        for name in candidate.split([',', ';']).map(str::trim).filter(|n| !n.is_empty()) {
            if !authors.iter().any(|a| a == name) {
                authors.push(name.to_string());
            }
        }
    }
    authors
}

fn find_publish_date(document: &Html) -> Option<String> {
    meta_contents(
        document,
        &[
            r#"meta[property="article:published_time"]"#,
            r#"meta[name="pubdate"]"#,
            r#"meta[itemprop="datePublished"]"#,
            "time[datetime]",
        ],
    )
    .into_iter()
    .find_map(normalize_date)
}

/// Normalize a date string to `YYYY-MM-DD`
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive().format("%Y-%m-%d").to_string());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.date_naive().format("%Y-%m-%d").to_string());
    }
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .map(|d| d.format("%Y-%m-%d").to_string())
}
