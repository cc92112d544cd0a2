use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use newsimplify::extraction::{
    ArticleExtractor, HttpPageSource, PageSource, TwoStageExtractor, STATUS_BROWSER, STATUS_FAILED,
    STATUS_STANDARD,
};

const ARTICLE_PAGE: &str = r#"<html><head>
    <title>City council approves new transit plan</title>
    <meta name="author" content="Alex Reporter">
    <meta property="article:published_time" content="2024-12-28T17:45:00Z">
    </head><body>
    <nav><a href="/">Home</a></nav>
    <article>
    <h1>City council approves new transit plan</h1>
    <p>The city council voted on Tuesday to approve a long-debated plan that expands bus service to the northern districts.</p>
    <p>Supporters said the plan would cut commute times for thousands of residents who currently rely on a single crowded line.</p>
    <p>Opponents questioned the cost, but the measure passed with a comfortable majority after a lengthy public hearing.</p>
    </article>
    </body></html>"#;

const SHELL_PAGE: &str = r#"<html><head></head><body><div id="root"></div></body></html>"#;

/// Serves a fixed page (or error) and counts how often it was asked
struct CountingSource {
    page: Result<&'static str, &'static str>,
    calls: AtomicUsize,
}

impl CountingSource {
    fn serving(page: &'static str) -> Arc<Self> {
        Arc::new(Self { page: Ok(page), calls: AtomicUsize::new(0) })
    }

    fn failing(message: &'static str) -> Arc<Self> {
        Arc::new(Self { page: Err(message), calls: AtomicUsize::new(0) })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PageSource for CountingSource {
    async fn fetch_html(&self, _url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.page.map(str::to_string).map_err(|e| anyhow::anyhow!(e))
    }
}

const URL: &str = "https://news.example.com/transit-plan";

#[tokio::test]
async fn standard_success_skips_browser() {
    let primary = CountingSource::serving(ARTICLE_PAGE);
    let fallback = CountingSource::serving(ARTICLE_PAGE);
    let extractor = TwoStageExtractor::new(primary.clone(), fallback.clone());

    let record = extractor.extract(URL).await;

    assert_eq!(record.status, STATUS_STANDARD);
    assert!(record.text.as_deref().unwrap().contains("expands bus service"));
    assert_eq!(record.authors, vec!["Alex Reporter"]);
    assert_eq!(record.publish_date.as_deref(), Some("2024-12-28"));
    assert!(record.error.is_none());
    assert_eq!(primary.calls(), 1);
    assert_eq!(fallback.calls(), 0);
}

#[tokio::test]
async fn empty_static_page_triggers_exactly_one_render() {
    let primary = CountingSource::serving(SHELL_PAGE);
    let fallback = CountingSource::serving(ARTICLE_PAGE);
    let extractor = TwoStageExtractor::new(primary.clone(), fallback.clone());

    let record = extractor.extract(URL).await;

    assert_eq!(record.status, STATUS_BROWSER);
    assert!(record.text.is_some());
    assert!(record.error.is_none());
    assert_eq!(primary.calls(), 1);
    assert_eq!(fallback.calls(), 1);
}

#[tokio::test]
async fn download_error_triggers_render() {
    let primary = CountingSource::failing("connection refused");
    let fallback = CountingSource::serving(ARTICLE_PAGE);
    let extractor = TwoStageExtractor::new(primary.clone(), fallback.clone());

    let record = extractor.extract(URL).await;

    assert_eq!(record.status, STATUS_BROWSER);
    assert_eq!(fallback.calls(), 1);
}

#[tokio::test]
async fn both_stages_failing_yields_error_record() {
    let primary = CountingSource::serving(SHELL_PAGE);
    let fallback = CountingSource::failing("chrome not found");
    let extractor = TwoStageExtractor::new(primary.clone(), fallback.clone());

    let record = extractor.extract(URL).await;

    assert_eq!(record.status, STATUS_FAILED);
    assert_eq!(record.error.as_deref(), Some("Browser method exception: chrome not found"));
    assert!(record.text.is_none());
    assert!(record.title.is_none());
    assert!(record.authors.is_empty());
    assert!(record.publish_date.is_none());
    assert_eq!(fallback.calls(), 1);
}

#[tokio::test]
async fn empty_render_is_a_failure() {
    let primary = CountingSource::serving(SHELL_PAGE);
    let fallback = CountingSource::serving(SHELL_PAGE);
    let extractor = TwoStageExtractor::new(primary.clone(), fallback.clone());

    let record = extractor.extract(URL).await;

    assert_eq!(record.status, STATUS_FAILED);
    assert!(record.error.as_deref().unwrap().starts_with("Browser method exception: "));
    assert!(record.text.is_none());
    assert_eq!(primary.calls(), 1);
    assert_eq!(fallback.calls(), 1);
}

#[tokio::test]
async fn http_source_downloads_page() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/transit-plan")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(ARTICLE_PAGE)
        .create_async()
        .await;

    let primary = Arc::new(HttpPageSource::new(&common::ExtractionConfig::default()).unwrap());
    let fallback = CountingSource::failing("should not be used");
    let extractor = TwoStageExtractor::new(primary, fallback.clone());

    let record = extractor.extract(&format!("{}/transit-plan", server.url())).await;

    assert_eq!(record.status, STATUS_STANDARD);
    assert_eq!(fallback.calls(), 0);
    mock.assert_async().await;
}

#[tokio::test]
async fn http_error_status_falls_back() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/paywalled")
        .with_status(403)
        .create_async()
        .await;

    let primary = Arc::new(HttpPageSource::new(&common::ExtractionConfig::default()).unwrap());
    let fallback = CountingSource::serving(ARTICLE_PAGE);
    let extractor = TwoStageExtractor::new(primary, fallback.clone());

    let record = extractor.extract(&format!("{}/paywalled", server.url())).await;

    assert_eq!(record.status, STATUS_BROWSER);
    assert_eq!(fallback.calls(), 1);
}
