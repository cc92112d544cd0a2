#![allow(dead_code)]

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use newsimplify::extraction::{ArticleExtractor, ArticleRecord, STATUS_STANDARD};
use newsimplify::llm::{ChatCompletion, ChatMessage, LlmResponse, UsageMetadata};
use newsimplify::search::{SearchOutcome, SearchResult, WebSearchProvider};
use newsimplify::sessions::Conversation;
use newsimplify::tools::Toolbox;

/// Replays canned assistant replies and records every transcript it was sent
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
    pub seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedLlm {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn last_transcript(&self) -> Vec<ChatMessage> {
        self.seen.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl ChatCompletion for ScriptedLlm {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<LlmResponse> {
        self.seen.lock().unwrap().push(messages.to_vec());
        let content = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .context("script exhausted")?;
        Ok(LlmResponse {
            content,
            usage: UsageMetadata::default(),
            model: "scripted".to_string(),
        })
    }
}

pub struct FakeSearch {
    outcome: Result<SearchOutcome, String>,
    pub calls: Mutex<Vec<(String, usize)>>,
}

impl FakeSearch {
    pub fn returning(outcome: SearchOutcome) -> Self {
        Self { outcome: Ok(outcome), calls: Mutex::new(Vec::new()) }
    }

    pub fn failing(message: &str) -> Self {
        Self { outcome: Err(message.to_string()), calls: Mutex::new(Vec::new()) }
    }
}

#[async_trait::async_trait]
impl WebSearchProvider for FakeSearch {
    async fn search(&self, topic: &str, count: usize) -> Result<SearchOutcome> {
        self.calls.lock().unwrap().push((topic.to_string(), count));
        self.outcome.clone().map_err(|e| anyhow::anyhow!(e))
    }
}

pub struct FakeExtractor {
    record: ArticleRecord,
    pub calls: Mutex<Vec<String>>,
}

impl FakeExtractor {
    pub fn returning(record: ArticleRecord) -> Self {
        Self { record, calls: Mutex::new(Vec::new()) }
    }

    pub fn with_text(text: &str) -> Self {
        Self::returning(ArticleRecord {
            status: STATUS_STANDARD.to_string(),
            title: Some("Tesla beats estimates".to_string()),
            text: Some(text.to_string()),
            ..ArticleRecord::default()
        })
    }
}

#[async_trait::async_trait]
impl ArticleExtractor for FakeExtractor {
    async fn extract(&self, url: &str) -> ArticleRecord {
        self.calls.lock().unwrap().push(url.to_string());
        self.record.clone()
    }
}

pub fn three_results() -> Vec<SearchResult> {
    (1..=3)
        .map(|i| SearchResult {
            title: format!("Tesla story {}", i),
            href: format!("https://news.example.com/tesla-{}", i),
            source: format!("Source {}", i),
        })
        .collect()
}

pub struct Harness {
    pub llm: Arc<ScriptedLlm>,
    pub search: Arc<FakeSearch>,
    pub extractor: Arc<FakeExtractor>,
    pub conversation: Conversation,
}

pub fn harness(replies: &[&str], search: FakeSearch, extractor: FakeExtractor) -> Harness {
    let llm = Arc::new(ScriptedLlm::new(replies));
    let search = Arc::new(search);
    let extractor = Arc::new(extractor);
    let tools = Toolbox::new(search.clone(), extractor.clone(), 3);
    let conversation = Conversation::new(llm.clone(), tools);
    Harness { llm, search, extractor, conversation }
}
