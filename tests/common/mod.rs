#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use search_intent::config::Config;
use search_intent::pipeline::llm::{ChatModel, LlmError, Message, MessageRole};
use search_intent::pipeline::loader::{LoadError, PageLoader};
use search_intent::pipeline::search::{ResultCount, ResultLister, SearchError};
use search_intent::pipeline::SearchResult;
use search_intent::session::Handlers;

pub const STUB_SUMMARY: &str = "Stub summary.";
pub const STUB_INTENT: &str = "Intent type: Know\nAttributes: homeowners";

pub fn test_config() -> Config {
    let vars: HashMap<&str, &str> = [("SERPAPI_API_KEY", "serp-test"), ("OPENAI_API_KEY", "sk-test")]
        .into_iter()
        .collect();
    Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).expect("test config")
}

pub fn results(links: &[(&str, &str)]) -> Vec<SearchResult> {
    links
        .iter()
        .map(|(link, title)| SearchResult {
            link: link.to_string(),
            title: title.to_string(),
        })
        .collect()
}

/// Returns a fixed listing, truncated to k, and counts calls.
pub struct StubLister {
    listing: Mutex<Vec<SearchResult>>,
    fail: bool,
    calls: Mutex<Vec<String>>,
}

impl StubLister {
    pub fn new(listing: Vec<SearchResult>) -> Self {
        Self {
            listing: Mutex::new(listing),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn set_listing(&self, listing: Vec<SearchResult>) {
        *self.listing.lock().unwrap() = listing;
    }

    pub fn keywords(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultLister for StubLister {
    async fn list_top_results(
        &self,
        keyword: &str,
        k: ResultCount,
    ) -> Result<Vec<SearchResult>, SearchError> {
        self.calls.lock().unwrap().push(keyword.to_string());
        if self.fail {
            return Err(SearchError::Engine(String::from("Invalid API key.")));
        }
        Ok(self.listing.lock().unwrap().iter().take(k.get()).cloned().collect())
    }
}

/// Serves page text from memory; URLs in `broken` fail with a 404.
#[derive(Default)]
pub struct StubLoader {
    pages: HashMap<String, String>,
    broken: HashSet<String>,
}

impl StubLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, text: &str) -> Self {
        self.pages.insert(url.to_string(), text.to_string());
        self
    }

    pub fn broken(mut self, url: &str) -> Self {
        self.broken.insert(url.to_string());
        self
    }
}

#[async_trait]
impl PageLoader for StubLoader {
    async fn load(&self, url: &str) -> Result<String, LoadError> {
        if self.broken.contains(url) {
            return Err(LoadError::Status {
                url: url.to_string(),
                status: 404,
            });
        }
        Ok(self
            .pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| format!("Page body of {url}.")))
    }
}

/// Answers summary prompts with `STUB_SUMMARY` and intent prompts (the ones with
/// a system persona) with `STUB_INTENT`. Every call is recorded.
#[derive(Default)]
pub struct ScriptedModel {
    calls: Mutex<Vec<Vec<Message>>>,
    fail_intent_containing: Option<String>,
    summary_reply: Option<String>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intent prompts whose text contains `marker` fail with an API error.
    pub fn failing_intent_for(marker: &str) -> Self {
        Self {
            fail_intent_containing: Some(marker.to_string()),
            ..Self::default()
        }
    }

    /// Answers every summary prompt with `reply` instead of `STUB_SUMMARY`.
    pub fn summarizing_with(reply: &str) -> Self {
        Self {
            summary_reply: Some(reply.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn intent_prompts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|m| m.first().map(|m| m.role) == Some(MessageRole::System))
            .filter_map(|m| m.last().map(|m| m.content.clone()))
            .collect()
    }

    pub fn summary_prompts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|m| m.first().map(|m| m.role) == Some(MessageRole::User))
            .filter_map(|m| m.last().map(|m| m.content.clone()))
            .collect()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(messages.to_vec());

        let is_intent = messages.first().map(|m| m.role) == Some(MessageRole::System);
        if !is_intent {
            return Ok(self.summary_reply.clone().unwrap_or_else(|| STUB_SUMMARY.to_string()));
        }

        let prompt = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        if let Some(marker) = &self.fail_intent_containing {
            if prompt.contains(marker.as_str()) {
                return Err(LlmError::Api {
                    status: 429,
                    body: String::from("rate limited"),
                });
            }
        }
        Ok(STUB_INTENT.to_string())
    }
}

pub struct Harness {
    pub lister: Arc<StubLister>,
    pub model: Arc<ScriptedModel>,
    pub handlers: Handlers,
}

pub fn harness(lister: StubLister, loader: StubLoader, model: ScriptedModel) -> Harness {
    let lister = Arc::new(lister);
    let model = Arc::new(model);
    let handlers = Handlers::with_collaborators(
        lister.clone(),
        Arc::new(loader),
        model.clone(),
        &test_config(),
    );
    Harness {
        lister,
        model,
        handlers,
    }
}
