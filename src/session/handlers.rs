use std::sync::Arc;

use reqwest::Client;
use thiserror::Error;
use tracing::{info, warn};

use super::session::{DownloadFlags, SessionState};
use crate::config::Config;
use crate::pipeline::intent::IntentInferencer;
use crate::pipeline::llm::{ChatModel, LlmError, OpenAiChat};
use crate::pipeline::loader::{PageLoader, WebPageLoader};
use crate::pipeline::record::RunReport;
use crate::pipeline::search::search::{MAX_RESULT_COUNT, MIN_RESULT_COUNT};
use crate::pipeline::search::{ResultCount, ResultLister, SerpApiLister};
use crate::pipeline::summarize::{
    AggregateSummarizer, MapReduceSummarizer, PageSummarizer, TextSplitter,
};
use crate::pipeline::{Pipeline, PipelineError};

pub const RESPONSES_FILENAME: &str = "search_intent_responses.txt";
pub const SUMMARY_FILENAME: &str = "search_intent_summary.txt";

#[derive(Error, Debug)]
pub enum ActionError {
    #[error("Number of results must be between {min} and {max}, got {0}", min = MIN_RESULT_COUNT, max = MAX_RESULT_COUNT)]
    InvalidCount(u32),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("Summarizing the responses failed: {0}")]
    Summarize(#[from] LlmError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: &'static str,
    pub content: String,
}

/// One method per user action. Each takes the caller's session and updates it in
/// place; a failed action leaves accumulated responses untouched.
pub struct Handlers {
    pipeline: Pipeline,
    aggregate: AggregateSummarizer,
}

impl Handlers {
    pub fn new(pipeline: Pipeline, aggregate: AggregateSummarizer) -> Self {
        Self {
            pipeline,
            aggregate,
        }
    }

    /// Wires the SerpAPI, web loader and OpenAI collaborators from config.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.fetch_timeout).build()?;
        let model_client = Client::builder().timeout(config.llm_timeout).build()?;

        let lister: Arc<dyn ResultLister> = Arc::new(SerpApiLister::new(client.clone(), config));
        let loader: Arc<dyn PageLoader> = Arc::new(WebPageLoader::new(client));
        let model: Arc<dyn ChatModel> = Arc::new(OpenAiChat::new(model_client, config));

        Ok(Self::with_collaborators(lister, loader, model, config))
    }

    pub fn with_collaborators(
        lister: Arc<dyn ResultLister>,
        loader: Arc<dyn PageLoader>,
        model: Arc<dyn ChatModel>,
        config: &Config,
    ) -> Self {
        let splitter = TextSplitter::new(config.chunk_size, config.chunk_overlap);
        let reducer = MapReduceSummarizer::new(model.clone()).with_reduce_limit(config.reduce_limit);

        let summarizer = PageSummarizer::new(loader, splitter.clone(), config.max_chunks, reducer.clone());
        let inferencer = IntentInferencer::new(model, config.response_language.clone());

        Self::new(
            Pipeline::new(lister, summarizer, inferencer),
            AggregateSummarizer::new(splitter, reducer),
        )
    }

    pub async fn run(
        &self,
        session: &mut SessionState,
        keyword: &str,
        k: u32,
    ) -> Result<RunReport, ActionError> {
        session.keyword = keyword.trim().to_string();
        session.downloads = DownloadFlags::default();
        session.notice = None;
        session.failures.clear();

        let result = match ResultCount::new(k) {
            Some(count) => {
                session.k = k;
                self.pipeline.run(keyword, count).await.map_err(ActionError::from)
            }
            None => Err(ActionError::InvalidCount(k)),
        };

        match result {
            Ok(report) => {
                session.append(report.formatted());
                session.failures = report.failures.clone();
                if report.listed == 0 {
                    session.notice = Some(format!("No search results for \"{}\"", report.keyword));
                }
                info!(
                    added = report.records.len(),
                    total = session.responses.len(),
                    "responses accumulated"
                );
                Ok(report)
            }
            Err(err) => {
                warn!(error = %err, "run failed");
                session.fail(err.to_string());
                Err(err)
            }
        }
    }

    /// `None` when there is nothing to download yet.
    pub fn download_responses(&self, session: &mut SessionState) -> Option<Download> {
        if !session.has_responses() {
            return None;
        }
        session.downloads.responses = true;
        Some(Download {
            filename: RESPONSES_FILENAME,
            content: session.all_content(),
        })
    }

    /// Summarizes every response accumulated so far, not just the latest run.
    pub async fn summarize_further(&self, session: &mut SessionState) -> Result<String, ActionError> {
        session.downloads = DownloadFlags::default();
        session.notice = None;

        match self.aggregate.combine(&session.responses).await {
            Ok(summary) => {
                session.overall_summary = Some(summary.clone());
                Ok(summary)
            }
            Err(err) => {
                let err = ActionError::from(err);
                warn!(error = %err, "summarize further failed");
                session.fail(err.to_string());
                Err(err)
            }
        }
    }

    pub fn download_summary(&self, session: &mut SessionState) -> Option<Download> {
        let content = session.overall_summary.clone()?;
        session.downloads.summary = true;
        Some(Download {
            filename: SUMMARY_FILENAME,
            content,
        })
    }
}
