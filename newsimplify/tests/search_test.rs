use common::SearchConfig;
use mockito::Matcher;
use newsimplify::search::{DuckDuckGoNews, SearchOutcome, WebSearchProvider};

const NEWS_BODY: &str = r#"{
    "results": [
        {"date": 1735500000, "title": "Tesla on MSN", "url": "https://www.msn.com/en-us/money/tesla", "source": "MSN"},
        {"date": 1735500000, "title": "Tesla earnings beat", "url": "https://www.reuters.com/tesla", "source": "Reuters", "excerpt": "..."},
        {"date": 1735500000, "title": "What Tesla said", "url": "https://apnews.com/tesla", "source": "AP"},
        {"date": 1735500000, "title": "Tesla shares jump", "url": "https://www.bbc.co.uk/tesla"},
        {"date": 1735500000, "title": "Fourth allowed", "url": "https://www.cnn.com/tesla", "source": "CNN"}
    ]
}"#;

fn config(endpoint: String) -> SearchConfig {
    SearchConfig {
        endpoint,
        ..SearchConfig::default()
    }
}

#[tokio::test]
async fn news_search_filters_and_truncates() {
    let mut server = mockito::Server::new_async().await;

    let token = server
        .mock("GET", "/")
        .match_query(Matcher::Regex("q=tesla".to_string()))
        .with_status(200)
        .with_body(r#"<html><script>vqd="4-123456";</script></html>"#)
        .create_async()
        .await;

    let news = server
        .mock("GET", "/news.js")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("vqd".to_string(), "4-123456".to_string()),
            Matcher::UrlEncoded("o".to_string(), "json".to_string()),
            Matcher::UrlEncoded("l".to_string(), "us-en".to_string()),
            Matcher::Regex("q=tesla".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(NEWS_BODY)
        .create_async()
        .await;

    let provider = DuckDuckGoNews::new(&config(server.url())).unwrap();
    let outcome = provider.search("tesla", 3).await.unwrap();

    let SearchOutcome::Results(results) = outcome else {
        panic!("expected results, got {:?}", outcome);
    };
    let titles: Vec<_> = results.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Tesla earnings beat", "What Tesla said", "Tesla shares jump"]);
    assert_eq!(results[0].href, "https://www.reuters.com/tesla");
    assert_eq!(results[2].source, "Unknown Source");

    token.assert_async().await;
    news.assert_async().await;
}

#[tokio::test]
async fn news_search_with_only_blocked_results_returns_notice() {
    let mut server = mockito::Server::new_async().await;

    let _token = server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_body("vqd='4-1'")
        .create_async()
        .await;
    let _news = server
        .mock("GET", "/news.js")
        .match_query(Matcher::Any)
        .with_header("content-type", "application/json")
        .with_body(r#"{"results": [{"title": "x", "url": "https://msn.com/x", "source": "MSN"}]}"#)
        .create_async()
        .await;

    let provider = DuckDuckGoNews::new(&config(server.url())).unwrap();
    let outcome = provider.search("niche topic", 3).await.unwrap();

    assert_eq!(
        outcome,
        SearchOutcome::NoResults("Could not find news results for 'niche topic' from allowed sources.".to_string())
    );
}

#[tokio::test]
async fn news_search_without_token_fails() {
    let mut server = mockito::Server::new_async().await;

    let _token = server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_body("<html>rate limited</html>")
        .create_async()
        .await;

    let provider = DuckDuckGoNews::new(&config(server.url())).unwrap();
    let err = provider.search("tesla", 3).await.unwrap_err();
    assert!(format!("{:#}", err).contains("vqd"));
}
