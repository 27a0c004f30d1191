use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::pipeline::record::SearchResult;

/// SerpAPI reports an empty result page as an error; it is a valid outcome here.
const NO_RESULTS_MARKER: &str = "hasn't returned any results";

pub const MIN_RESULT_COUNT: u32 = 1;
pub const MAX_RESULT_COUNT: u32 = 5;
pub const DEFAULT_RESULT_COUNT: u32 = 2;

#[derive(thiserror::Error, Debug)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("SerpAPI error: {status} {body}")]
    Api { status: u16, body: String },
    #[error("SerpAPI error: {0}")]
    Engine(String),
}

/// How many top results to analyze. Always within `MIN_RESULT_COUNT..=MAX_RESULT_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultCount(u32);

impl ResultCount {
    pub fn new(k: u32) -> Option<Self> {
        if (MIN_RESULT_COUNT..=MAX_RESULT_COUNT).contains(&k) {
            Some(Self(k))
        } else {
            None
        }
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }
}

impl Default for ResultCount {
    fn default() -> Self {
        Self(DEFAULT_RESULT_COUNT)
    }
}

#[async_trait]
pub trait ResultLister: Send + Sync {
    async fn list_top_results(
        &self,
        keyword: &str,
        k: ResultCount,
    ) -> Result<Vec<SearchResult>, SearchError>;
}

#[derive(Debug, Deserialize)]
struct SerpResult {
    link: Option<String>,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<SerpResult>,
    error: Option<String>,
}

pub struct SerpApiLister {
    client: Client,
    url: String,
    api_key: String,
    engine: String,
    gl: String,
    hl: String,
}

impl SerpApiLister {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            url: config.serp_api_url.clone(),
            api_key: config.serp_api_key.clone(),
            engine: config.search_engine.clone(),
            gl: config.search_gl.clone(),
            hl: config.search_hl.clone(),
        }
    }
}

#[async_trait]
impl ResultLister for SerpApiLister {
    async fn list_top_results(
        &self,
        keyword: &str,
        k: ResultCount,
    ) -> Result<Vec<SearchResult>, SearchError> {
        debug!(keyword, "SerpAPI search request");

        let res = self
            .client
            .get(&self.url)
            .query(&[
                ("q", keyword),
                ("api_key", self.api_key.as_str()),
                ("engine", self.engine.as_str()),
                ("gl", self.gl.as_str()),
                ("hl", self.hl.as_str()),
            ])
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await?;
            if body.contains(NO_RESULTS_MARKER) {
                return Ok(Vec::new());
            }
            return Err(SearchError::Api { status: status.as_u16(), body });
        }

        let json = res.json::<SerpApiResponse>().await?;
        parse_listing(json, k)
    }
}

fn parse_listing(res: SerpApiResponse, k: ResultCount) -> Result<Vec<SearchResult>, SearchError> {
    if let Some(error) = res.error {
        if error.contains(NO_RESULTS_MARKER) {
            return Ok(Vec::new());
        }
        return Err(SearchError::Engine(error));
    }

    let mut seen = HashSet::new();
    Ok(res
        .organic_results
        .into_iter()
        .filter_map(|r| r.link.map(|link| SearchResult { link, title: r.title }))
        .filter(|r| seen.insert(r.link.clone()))
        .take(k.get())
        .collect())
}
