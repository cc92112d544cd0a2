//! Turn processing: user input → assistant reply → at most one tool round-trip.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use super::{Selection, Session};
use crate::llm::{ChatCompletion, ChatMessage};
use crate::prompt::system_prompt;
use crate::tools::{
    detect_tool_call, format_tool_output, prepare_invocation, ToolCallDirective, ToolCallError,
    ToolName, ToolOutput, Toolbox,
};

pub const INVALID_SELECTION: &str = "Invalid selection. Please try again.";

/// How a turn ended. Completion failures are returned as `Err` instead.
#[derive(Debug)]
pub enum TurnOutcome {
    /// The assistant replied, possibly after running a tool
    Replied,
    /// A directive was found but no tool ran; the directive stays in the transcript
    ToolAborted(ToolCallError),
    /// The numeric selection did not match an offered article; nothing was recorded
    SelectionRejected { warning: String },
}

/// Drives sessions through the model and the tools. Holds no per-session state.
pub struct Conversation {
    llm: Arc<dyn ChatCompletion>,
    tools: Toolbox,
}

impl Conversation {
    pub fn new(llm: Arc<dyn ChatCompletion>, tools: Toolbox) -> Self {
        Self { llm, tools }
    }

    /// Create a session seeded with the system prompt and let the assistant greet
    pub async fn start_session(&self) -> Result<Session> {
        let mut session = Session::new(system_prompt(Utc::now().date_naive()));
        info!(session_id = %session.id, "session: starting");

        let outcome = self.assistant_turn(&mut session).await?;
        if let TurnOutcome::ToolAborted(e) = &outcome {
            warn!(session_id = %session.id, error = %e, "session: greeting carried an unusable tool call");
        }
        Ok(session)
    }

    /// Process one user input
    pub async fn handle_user_input(&self, session: &mut Session, input: &str) -> Result<TurnOutcome> {
        let input = input.trim();
        info!(session_id = %session.id, "user: {}", input);

        match session.resolve_selection(input) {
            Selection::OutOfRange => {
                warn!(
                    session_id = %session.id,
                    offered = session.offered_articles().len(),
                    "selection '{}' out of range",
                    input
                );
                Ok(TurnOutcome::SelectionRejected {
                    warning: INVALID_SELECTION.to_string(),
                })
            }
            Selection::Article(idx) => {
                session.push(ChatMessage::user(input));
                let href = session.offered_articles()[idx].href.clone();
                let directive = ToolCallDirective::for_extraction(&href);
                info!(session_id = %session.id, "assistant (synthesized): {}", directive);
                session.push(ChatMessage::assistant(directive.to_string()));
                self.run_tool(session, &directive).await
            }
            Selection::NotASelection => {
                session.push(ChatMessage::user(input));
                self.assistant_turn(session).await
            }
        }
    }

    async fn assistant_turn(&self, session: &mut Session) -> Result<TurnOutcome> {
        let reply = self.complete_into(session).await?;

        match detect_tool_call(&reply) {
            Some(directive) => self.run_tool(session, &directive).await,
            None => Ok(TurnOutcome::Replied),
        }
    }

    /// Execute a directive, append its output and the assistant's reaction.
    /// The reaction is not scanned for further directives.
    async fn run_tool(&self, session: &mut Session, directive: &ToolCallDirective) -> Result<TurnOutcome> {
        info!(
            session_id = %session.id,
            tool = %directive.tool_name,
            arguments = %directive.raw_arguments,
            "tool requested"
        );

        let invocation = match prepare_invocation(directive) {
            Ok(invocation) => invocation,
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "tool call aborted");
                return Ok(TurnOutcome::ToolAborted(e));
            }
        };

        let output = match self.tools.execute(&invocation).await {
            Ok(output) => output,
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "tool call aborted");
                return Ok(TurnOutcome::ToolAborted(e));
            }
        };

        let tool = invocation.tool();
        if tool == ToolName::SearchWeb {
            let offered = match &output {
                ToolOutput::Articles(articles) => articles.clone(),
                _ => Vec::new(),
            };
            session.replace_offered(offered);
        }

        let formatted = format_tool_output(&output);
        info!(session_id = %session.id, %tool, chars = formatted.len(), "tool output:\n{}", formatted);
        session.push(ChatMessage::function(tool.as_str(), formatted));

        self.complete_into(session).await?;
        Ok(TurnOutcome::Replied)
    }

    async fn complete_into(&self, session: &mut Session) -> Result<String> {
        let response = self
            .llm
            .complete(session.messages())
            .await
            .context("completion request failed")?;

        info!(session_id = %session.id, model = %response.model, "assistant: {}", response.content);
        session.push(ChatMessage::assistant(response.content.clone()));
        Ok(response.content)
    }
}
