//! News search through DuckDuckGo's news endpoint.
//!
//! The backend is queried with the topic plus the current year-month so that
//! results lean towards recent coverage. Results from the blocked domain are
//! dropped before the desired count is taken.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// One news hit offered to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub href: String,
    pub source: String,
}

/// What a search produced: a ranked list, or a plain-text notice when nothing survived filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Results(Vec<SearchResult>),
    NoResults(String),
}

#[async_trait::async_trait]
pub trait WebSearchProvider: Send + Sync {
    /// Search recent news for `topic`, returning at most `count` results
    async fn search(&self, topic: &str, count: usize) -> Result<SearchOutcome>;
}

/// Raw item as returned by the backend, before filtering
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNewsItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Append the year-month of `now` to bias the backend towards recent news
pub fn decorate_query(topic: &str, now: DateTime<Utc>) -> String {
    format!("{} {}", topic, now.format("%Y-%m"))
}

/// Filter raw items and cut the list at `count`.
///
/// An item whose URL contains `blocked_domain` (case-insensitive) is skipped.
/// Collection stops as soon as `count` results are kept.
pub fn select_results(
    topic: &str,
    raw: Vec<RawNewsItem>,
    blocked_domain: &str,
    count: usize,
) -> SearchOutcome {
    let blocked = blocked_domain.to_lowercase();
    let mut results = Vec::new();

    for item in raw {
        let href = item.url.unwrap_or_else(|| "No URL".to_string());
        if !blocked.is_empty() && href.to_lowercase().contains(&blocked) {
            debug!(%href, "search: skipping blocked domain");
            continue;
        }

        results.push(SearchResult {
            title: item.title.unwrap_or_else(|| "No Title".to_string()),
            href,
            source: item.source.unwrap_or_else(|| "Unknown Source".to_string()),
        });

        if results.len() >= count {
            break;
        }
    }

    if results.is_empty() {
        SearchOutcome::NoResults(format!(
            "Could not find news results for '{}' from allowed sources.",
            topic
        ))
    } else {
        SearchOutcome::Results(results)
    }
}

/// Pull the `vqd` token out of the DuckDuckGo search page
pub fn extract_vqd(body: &str) -> Option<String> {
    for (open, close) in [("vqd=\"", '"'), ("vqd='", '\''), ("vqd=", '&')] {
        if let Some(start) = body.find(open) {
            let rest = &body[start + open.len()..];
            if let Some(end) = rest.find(close) {
                let token = &rest[..end];
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }
    None
}

/// DuckDuckGo news backend
pub struct DuckDuckGoNews {
    client: Client,
    endpoint: String,
    region: String,
    max_raw_results: usize,
    blocked_domain: String,
}

impl DuckDuckGoNews {
    pub fn new(cfg: &common::SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .user_agent("Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0")
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            client,
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            region: cfg.region.clone(),
            max_raw_results: cfg.max_raw_results,
            blocked_domain: cfg.blocked_domain.clone(),
        })
    }

    async fn fetch_vqd(&self, query: &str) -> Result<String> {
        let response = self
            .client
            .get(format!("{}/", self.endpoint))
            .query(&[("q", query)])
            .send()
            .await
            .context("failed to fetch search token page")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("search token request failed with status: {}", status);
        }

        let body = response.text().await.context("failed to read search token page")?;
        extract_vqd(&body).context("search token (vqd) not found in response")
    }

    /// Fetch up to `max_raw_results` raw news items for an already decorated query
    pub async fn fetch_news(&self, query: &str) -> Result<Vec<RawNewsItem>> {
        let vqd = self.fetch_vqd(query).await?;

        let response = self
            .client
            .get(format!("{}/news.js", self.endpoint))
            .query(&[
                ("l", self.region.as_str()),
                ("o", "json"),
                ("noamp", "1"),
                ("q", query),
                ("vqd", vqd.as_str()),
                ("p", "-1"),
            ])
            .send()
            .await
            .context("failed to query news endpoint")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("news search failed with status: {}", status);
        }

        let body: NewsResponse = response
            .json()
            .await
            .context("failed to parse news search response")?;

        Ok(body.results.into_iter().take(self.max_raw_results).collect())
    }
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    results: Vec<RawNewsItem>,
}

#[async_trait::async_trait]
impl WebSearchProvider for DuckDuckGoNews {
    async fn search(&self, topic: &str, count: usize) -> Result<SearchOutcome> {
        let query = decorate_query(topic, Utc::now());
        info!(%query, count, "search: querying news backend");

        let raw = self.fetch_news(&query).await?;
        let outcome = select_results(topic, raw, &self.blocked_domain, count);

        match &outcome {
            SearchOutcome::Results(r) => info!("search: {} results kept for '{}'", r.len(), topic),
            SearchOutcome::NoResults(_) => info!("search: no allowed results for '{}'", topic),
        }
        Ok(outcome)
    }
}
