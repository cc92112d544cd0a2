use std::sync::Arc;

use newsimplify::browser::ChromiumPageSource;
use newsimplify::extraction::{ArticleExtractor, HttpPageSource, TwoStageExtractor};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        eprintln!("usage: test_extract <url> [<url> ...]");
        std::process::exit(2);
    }

    let cfg = common::ExtractionConfig::default();
    let extractor = TwoStageExtractor::new(
        Arc::new(HttpPageSource::new(&cfg).expect("build http client")),
        Arc::new(ChromiumPageSource::new((&cfg).into())),
    );

    for url in urls {
        println!("\n{}", "=".repeat(60));
        println!("Testing: {}", url);
        println!("{}", "=".repeat(60));

        let record = extractor.extract(&url).await;
        println!("  Status: {}", record.status);
        match (&record.text, &record.error) {
            (Some(text), _) => {
                println!("✓ Success!");
                println!("  Title: {:?}", record.title);
                println!("  Authors: {:?}", record.authors);
                println!("  Published: {:?}", record.publish_date);
                println!("  Text: {} chars", text.len());
                println!("  Preview: {}", text.chars().take(300).collect::<String>());
            }
            (None, Some(error)) => println!("✗ Failed: {}", error),
            (None, None) => println!("✗ No text and no error"),
        }
    }
}
