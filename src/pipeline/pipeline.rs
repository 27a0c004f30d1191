use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use super::intent::IntentInferencer;
use super::record::{IntentRecord, PageSummary, RunReport, Step, UrlFailure};
use super::search::{ResultCount, ResultLister, SearchError};
use super::summarize::PageSummarizer;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Keyword must not be empty")]
    EmptyKeyword,
    #[error(transparent)]
    Search(#[from] SearchError),
}

/// keyword → top results → page summaries → intent analyses.
///
/// Every step runs one at a time in listing order. A page that cannot be
/// summarized or analyzed is reported in `RunReport::failures` and the run moves
/// on to the next URL; only a failed search aborts the run.
pub struct Pipeline {
    lister: Arc<dyn ResultLister>,
    summarizer: PageSummarizer,
    inferencer: IntentInferencer,
}

impl Pipeline {
    pub fn new(
        lister: Arc<dyn ResultLister>,
        summarizer: PageSummarizer,
        inferencer: IntentInferencer,
    ) -> Self {
        Self {
            lister,
            summarizer,
            inferencer,
        }
    }

    pub async fn run(&self, keyword: &str, k: ResultCount) -> Result<RunReport, PipelineError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(PipelineError::EmptyKeyword);
        }

        info!(keyword, k = k.get(), "starting run");
        let results = self.lister.list_top_results(keyword, k).await?;
        info!(count = results.len(), "URLs and titles fetched");

        let listed = results.len();
        let mut failures: Vec<(usize, UrlFailure)> = Vec::new();

        let mut summaries = Vec::with_capacity(listed);
        for (rank, result) in results.into_iter().enumerate() {
            info!(url = %result.link, "summarizing");
            match self.summarizer.summarize(&result.link).await {
                Ok(summary) => summaries.push((
                    rank,
                    PageSummary {
                        url: result.link,
                        title: result.title,
                        summary,
                    },
                )),
                Err(err) => {
                    warn!(url = %result.link, error = %err, "summarize failed");
                    failures.push((
                        rank,
                        UrlFailure {
                            url: result.link,
                            title: result.title,
                            step: Step::Summarize,
                            message: err.to_string(),
                        },
                    ));
                }
            }
        }

        let mut records = Vec::with_capacity(summaries.len());
        for (rank, summary) in summaries {
            info!(url = %summary.url, "inferring intent");
            match self.inferencer.infer_intent(keyword, &summary.summary).await {
                Ok(intent_text) => records.push(IntentRecord {
                    url: summary.url,
                    title: summary.title,
                    intent_text,
                }),
                Err(err) => {
                    warn!(url = %summary.url, error = %err, "intent inference failed");
                    failures.push((
                        rank,
                        UrlFailure {
                            url: summary.url,
                            title: summary.title,
                            step: Step::InferIntent,
                            message: err.to_string(),
                        },
                    ));
                }
            }
        }

        failures.sort_by_key(|(rank, _)| *rank);
        info!(records = records.len(), failures = failures.len(), "run complete");

        Ok(RunReport {
            keyword: keyword.to_string(),
            listed,
            records,
            failures: failures.into_iter().map(|(_, f)| f).collect(),
        })
    }
}
