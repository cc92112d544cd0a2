use newsimplify::llm::remote::RemoteLlmProvider;
use newsimplify::llm::{ChatCompletion, ChatMessage};
use newsimplify::tools::detect_tool_call;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    dotenv::dotenv().ok();

    let defaults = common::LlmConfig::default();
    let api_key = std::env::var(&defaults.api_key_env)
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .expect("Set GROQ_API_KEY or OPENAI_API_KEY environment variable");

    // Allow custom base URL or use the Groq default
    let base_url = std::env::var("LLM_BASE_URL").unwrap_or(defaults.api_url.clone());
    let model = std::env::var("LLM_MODEL").unwrap_or(defaults.model.clone());

    println!("\n{}", "=".repeat(60));
    println!("Testing chat completion");
    println!("Base URL: {}", base_url);
    println!("Model: {}", model);
    println!("{}", "=".repeat(60));

    let provider = RemoteLlmProvider::new(&base_url, &api_key, &model).with_defaults(
        defaults.timeout_seconds,
        defaults.max_tokens,
        defaults.temperature,
        defaults.top_p,
    );

    let system = newsimplify::prompt::system_prompt(chrono::Utc::now().date_naive());
    let mut messages = vec![ChatMessage::system(system)];

    // Test 1: greeting, no tool call expected
    println!("\n[Test 1] Greeting...");
    match provider.complete(&messages).await {
        Ok(response) => {
            println!("✓ Success!");
            println!("  Reply: {}", response.content);
            println!("  Tool call: {:?}", detect_tool_call(&response.content));
            println!("  Usage: {} tokens", response.usage.total_tokens);
            messages.push(ChatMessage::assistant(response.content));
        }
        Err(e) => {
            eprintln!("✗ Failed: {:#}", e);
            return;
        }
    }

    // Test 2: a topic should produce a search_web directive
    messages.push(ChatMessage::user("tesla earnings"));
    println!("\n[Test 2] Topic...");
    match provider.complete(&messages).await {
        Ok(response) => {
            println!("✓ Success!");
            println!("  Reply: {}", response.content);
            match detect_tool_call(&response.content) {
                Some(d) => println!("  Tool call: {} with {}", d.tool_name, d.raw_arguments),
                None => println!("  No tool call detected"),
            }
        }
        Err(e) => eprintln!("✗ Failed: {:#}", e),
    }

    println!("\n{}", "=".repeat(60));
    println!("Tests completed");
    println!("{}", "=".repeat(60));
}
