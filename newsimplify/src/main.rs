/*
newsimplify - main.rs
Starts the conversational news assistant, either as an HTTP server with a
single-page UI or as an interactive terminal chat.
*/

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use newsimplify::browser::ChromiumPageSource;
use newsimplify::extraction::{HttpPageSource, TwoStageExtractor};
use newsimplify::llm::remote::RemoteLlmProvider;
use newsimplify::llm::Role;
use newsimplify::search::DuckDuckGoNews;
use newsimplify::server::launch_rocket;
use newsimplify::sessions::{Conversation, Session, TurnOutcome};
use newsimplify::tools::Toolbox;

#[derive(Parser, Debug)]
#[command(name = "newsimplify", about = "NEWSimplify conversational news assistant")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Serve the web UI and JSON API (default)
    Serve,
    /// Chat in the terminal
    Chat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr so the terminal chat keeps stdout to itself
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    if let Ok(path) = dotenv::dotenv() {
        info!(path = ?path, "loaded environment file");
    }

    let default_path = PathBuf::from("config.default.toml");
    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let config = match Config::load_with_defaults(Some(&default_path), override_path.as_deref()).await {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(%e, "failed to load configuration");
            return Err(e);
        }
    };
    info!(default = ?default_path, override = ?override_path, "configuration loaded");

    // Without a credential no turn can be served
    let api_key = match read_api_key(&config.llm.api_key_env) {
        Ok(key) => key,
        Err(e) => {
            error!("{:#}", e);
            return Err(e);
        }
    };

    let conversation = Arc::new(build_conversation(&config, api_key)?);
    info!(model = %config.llm.model, "conversation pipeline ready");

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => launch_rocket(&config, conversation).await?,
        Command::Chat => run_chat(&conversation).await?,
    }

    info!("Shutdown complete");
    Ok(())
}

fn read_api_key(var: &str) -> Result<String> {
    let key = std::env::var(var).with_context(|| format!("LLM API key env var '{}' not set", var))?;
    if key.trim().is_empty() {
        anyhow::bail!("LLM API key env var '{}' is empty", var);
    }
    Ok(key)
}

/// Wire the model client, the search backend and the two-stage extractor together
fn build_conversation(config: &Config, api_key: String) -> Result<Conversation> {
    let llm = RemoteLlmProvider::from_config(&config.llm, api_key);

    let search = DuckDuckGoNews::new(&config.search)?;
    let extractor = TwoStageExtractor::new(
        Arc::new(HttpPageSource::new(&config.extraction)?),
        Arc::new(ChromiumPageSource::new((&config.extraction).into())),
    );

    let tools = Toolbox::new(Arc::new(search), Arc::new(extractor), config.search.default_count);
    Ok(Conversation::new(Arc::new(llm), tools))
}

/// Terminal front end over the same conversation loop. `/quit` or EOF ends the session.
async fn run_chat(conversation: &Conversation) -> Result<()> {
    let mut session = conversation.start_session().await?;
    let mut shown = print_new_replies(&session, 0);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\nYou: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }

        match conversation.handle_user_input(&mut session, line).await {
            Ok(TurnOutcome::Replied) => {}
            Ok(TurnOutcome::SelectionRejected { warning }) => println!("! {}", warning),
            Ok(TurnOutcome::ToolAborted(e)) => eprintln!("(tool call skipped: {})", e),
            Err(e) => eprintln!("error: {:#}", e),
        }
        shown = print_new_replies(&session, shown);
    }

    info!(session_id = %session.id, "chat session ended");
    Ok(())
}

/// Print assistant messages that became visible since `shown`; returns the new count
fn print_new_replies(session: &Session, shown: usize) -> usize {
    let visible = session.visible_messages();
    for msg in visible.iter().skip(shown).filter(|m| m.role == Role::Assistant) {
        println!("\nAssistant: {}", msg.content);
    }
    visible.len()
}
