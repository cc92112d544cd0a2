//! Tool-call protocol
//!
//! The model invokes a tool by writing a directive into its reply:
//!
//! ```text
//! <function=search_web>{"topic": "artificial intelligence"}</function>
//! ```
//!
//! Only the first directive of a message is recognised. Its argument text is the
//! interior of a JSON object; it is wrapped in braces and decoded before the
//! named tool runs. The tool result is flattened to text for the transcript.

use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::extraction::{ArticleExtractor, ArticleRecord};
use crate::search::{SearchOutcome, SearchResult, WebSearchProvider};

const DIRECTIVE_OPEN: &str = "<function=";
const ARGS_OPEN: &str = ">{";
const DIRECTIVE_CLOSE: &str = "}</function>";

/// A tool call found in assistant text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallDirective {
    pub tool_name: String,
    /// Object interior, without the surrounding braces
    pub raw_arguments: String,
}

impl ToolCallDirective {
    /// Directive the assistant would have written to extract `href`
    pub fn for_extraction(href: &str) -> Self {
        Self {
            tool_name: ToolName::ExtractArticle.to_string(),
            raw_arguments: format!("\"url\": {}", json!(href)),
        }
    }
}

impl fmt::Display for ToolCallDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}>{{{}}}</function>", DIRECTIVE_OPEN, self.tool_name, self.raw_arguments)
    }
}

/// Failures of the tool-call protocol. None of them are fatal to the session.
#[derive(Debug, thiserror::Error)]
pub enum ToolCallError {
    #[error("malformed tool arguments: {0}")]
    MalformedArguments(#[source] serde_json::Error),
    #[error("invalid arguments for '{tool}': {source}")]
    InvalidArguments {
        tool: ToolName,
        #[source]
        source: serde_json::Error,
    },
    #[error("tool '{0}' is not available")]
    UnknownTool(String),
    #[error("tool '{tool}' failed: {message}")]
    Execution { tool: ToolName, message: String },
}

/// Registered tools
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    SearchWeb,
    ExtractArticle,
}

impl ToolName {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::SearchWeb => "search_web",
            ToolName::ExtractArticle => "extract_article",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolCallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "search_web" => Ok(ToolName::SearchWeb),
            "extract_article" => Ok(ToolName::ExtractArticle),
            other => Err(ToolCallError::UnknownTool(other.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchArgs {
    topic: String,
    #[serde(default)]
    url_count: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExtractArgs {
    url: String,
}

/// A decoded, validated tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocation {
    SearchWeb { topic: String, url_count: Option<usize> },
    ExtractArticle { url: String },
}

impl ToolInvocation {
    pub fn tool(&self) -> ToolName {
        match self {
            ToolInvocation::SearchWeb { .. } => ToolName::SearchWeb,
            ToolInvocation::ExtractArticle { .. } => ToolName::ExtractArticle,
        }
    }
}

/// Raw result of a tool, before it is flattened for the transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    Articles(Vec<SearchResult>),
    Article(ArticleRecord),
    Text(String),
}

impl From<SearchOutcome> for ToolOutput {
    fn from(outcome: SearchOutcome) -> Self {
        match outcome {
            SearchOutcome::Results(results) => ToolOutput::Articles(results),
            SearchOutcome::NoResults(text) => ToolOutput::Text(text),
        }
    }
}

/// Find the first directive in `text`. Spans newlines.
pub fn detect_tool_call(text: &str) -> Option<ToolCallDirective> {
    let start = text.find(DIRECTIVE_OPEN)? + DIRECTIVE_OPEN.len();
    let name_len = text[start..].find(ARGS_OPEN)?;
    let args_start = start + name_len + ARGS_OPEN.len();
    let args_len = text[args_start..].find(DIRECTIVE_CLOSE)?;

    Some(ToolCallDirective {
        tool_name: text[start..start + name_len].trim().to_string(),
        raw_arguments: text[args_start..args_start + args_len].trim().to_string(),
    })
}

/// Decode the argument interior as a JSON object
pub fn decode_arguments(raw_arguments: &str) -> Result<Map<String, Value>, ToolCallError> {
    serde_json::from_str(&format!("{{{}}}", raw_arguments)).map_err(ToolCallError::MalformedArguments)
}

/// Decode, resolve and validate a directive.
/// Argument decoding happens before the tool name is checked.
pub fn prepare_invocation(directive: &ToolCallDirective) -> Result<ToolInvocation, ToolCallError> {
    let args = Value::Object(decode_arguments(&directive.raw_arguments)?);
    let tool: ToolName = directive.tool_name.parse()?;

    let invalid = |source| ToolCallError::InvalidArguments { tool, source };
    match tool {
        ToolName::SearchWeb => {
            let a: SearchArgs = serde_json::from_value(args).map_err(invalid)?;
            Ok(ToolInvocation::SearchWeb { topic: a.topic, url_count: a.url_count })
        }
        ToolName::ExtractArticle => {
            let a: ExtractArgs = serde_json::from_value(args).map_err(invalid)?;
            Ok(ToolInvocation::ExtractArticle { url: a.url })
        }
    }
}

/// Flatten a tool result into transcript text
pub fn format_tool_output(output: &ToolOutput) -> String {
    match output {
        ToolOutput::Text(text) => text.clone(),
        ToolOutput::Articles(articles) => {
            let mut formatted = String::new();
            for (idx, article) in articles.iter().enumerate() {
                formatted.push_str(&format!("{}. {}\n", idx + 1, article.title));
                formatted.push_str(&format!("   Source: {}\n", article.source));
                formatted.push_str(&format!("   Link: {}\n\n", article.href));
            }
            formatted.trim().to_string()
        }
        ToolOutput::Article(record) => match &record.error {
            Some(error) => format!("Error extracting article: {}", error),
            None => record.text.clone().unwrap_or_default(),
        },
    }
}

/// The two registered tools, bound to their backends
pub struct Toolbox {
    search: Arc<dyn WebSearchProvider>,
    extractor: Arc<dyn ArticleExtractor>,
    default_count: usize,
}

impl Toolbox {
    pub fn new(
        search: Arc<dyn WebSearchProvider>,
        extractor: Arc<dyn ArticleExtractor>,
        default_count: usize,
    ) -> Self {
        Self {
            search,
            extractor,
            default_count: default_count.max(1),
        }
    }

    pub async fn execute(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolCallError> {
        match invocation {
            ToolInvocation::SearchWeb { topic, url_count } => {
                let count = url_count.filter(|c| *c > 0).unwrap_or(self.default_count);
                info!(%topic, count, "tool: searching the web");
                let outcome = self.search.search(topic, count).await.map_err(|e| {
                    warn!(error = %e, "tool: search failed");
                    ToolCallError::Execution {
                        tool: ToolName::SearchWeb,
                        message: format!("{:#}", e),
                    }
                })?;
                Ok(outcome.into())
            }
            ToolInvocation::ExtractArticle { url } => {
                info!(%url, "tool: extracting article");
                let record = self.extractor.extract(url).await;
                info!(status = %record.status, "tool: extraction finished");
                Ok(ToolOutput::Article(record))
            }
        }
    }
}
