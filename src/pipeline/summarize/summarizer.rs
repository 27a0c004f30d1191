use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use super::splitter::TextSplitter;
use crate::pipeline::llm::{ChatModel, LlmError, Message};
use crate::pipeline::loader::{LoadError, PageLoader};

pub const DEFAULT_MAX_CHUNKS: usize = 3;

/// Upper bound, in chars, on the text handed to one reduce call.
pub const DEFAULT_REDUCE_LIMIT: usize = 4000;

const PARTIAL_SEPARATOR: &str = "\n\n";

/// Shown between accumulated analyses when they are summarized together.
pub const AGGREGATE_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Model(#[from] LlmError),
}

pub fn concise_summary_prompt(text: &str) -> String {
    format!("Write a concise summary of the following:\n\n\n\"{text}\"\n\n\nCONCISE SUMMARY:")
}

/// Summarizes every chunk on its own, then summarizes the partial summaries.
///
/// When the partial summaries together are longer than `reduce_limit` chars they
/// are grouped and summarized again, until the final reduce prompt fits.
#[derive(Clone)]
pub struct MapReduceSummarizer {
    model: Arc<dyn ChatModel>,
    reduce_limit: usize,
}

impl MapReduceSummarizer {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            reduce_limit: DEFAULT_REDUCE_LIMIT,
        }
    }

    pub fn with_reduce_limit(mut self, reduce_limit: usize) -> Self {
        self.reduce_limit = reduce_limit.max(1);
        self
    }

    pub async fn summarize_chunks(&self, chunks: &[String]) -> Result<String, LlmError> {
        if chunks.is_empty() {
            return Ok(String::new());
        }

        let mut partials = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            debug!(chunk = i + 1, of = chunks.len(), "map step");
            partials.push(self.summarize_once(chunk).await?);
        }

        while partials.len() > 1 && joined_len(&partials) > self.reduce_limit {
            let groups = group_partials(&partials, self.reduce_limit);
            debug!(partials = partials.len(), groups = groups.len(), "collapse step");

            let mut collapsed = Vec::with_capacity(groups.len());
            for group in groups {
                collapsed.push(self.summarize_once(&group.join(PARTIAL_SEPARATOR)).await?);
            }
            partials = collapsed;
        }

        debug!("reduce step");
        self.summarize_once(&partials.join(PARTIAL_SEPARATOR)).await
    }

    async fn summarize_once(&self, text: &str) -> Result<String, LlmError> {
        let summary = self
            .model
            .complete(&[Message::user(concise_summary_prompt(text))])
            .await?;
        Ok(summary.trim().to_string())
    }
}

fn joined_len(partials: &[String]) -> usize {
    let separators = partials.len().saturating_sub(1) * PARTIAL_SEPARATOR.len();
    partials.iter().map(|p| p.chars().count()).sum::<usize>() + separators
}

/// Greedy groups of consecutive partials that fit in `limit` chars. A group always
/// takes at least two partials when it can, so every collapse round shrinks the list.
fn group_partials(partials: &[String], limit: usize) -> Vec<&[String]> {
    let mut groups = Vec::new();
    let mut start = 0;
    while start < partials.len() {
        let mut end = start + 1;
        while end < partials.len()
            && (end - start < 2 || joined_len(&partials[start..=end]) <= limit)
        {
            end += 1;
        }
        groups.push(&partials[start..end]);
        start = end;
    }
    groups
}

pub struct PageSummarizer {
    loader: Arc<dyn PageLoader>,
    splitter: TextSplitter,
    max_chunks: usize,
    reducer: MapReduceSummarizer,
}

impl PageSummarizer {
    pub fn new(
        loader: Arc<dyn PageLoader>,
        splitter: TextSplitter,
        max_chunks: usize,
        reducer: MapReduceSummarizer,
    ) -> Self {
        Self {
            loader,
            splitter,
            max_chunks: max_chunks.max(1),
            reducer,
        }
    }

    /// The chunks that get summarized: the first `max_chunks` in document order.
    pub fn select_chunks(&self, text: &str) -> Vec<String> {
        let mut chunks = self.splitter.split_text(text);
        if chunks.len() > self.max_chunks {
            debug!(total = chunks.len(), kept = self.max_chunks, "truncating document");
            chunks.truncate(self.max_chunks);
        }
        chunks
    }

    pub async fn summarize(&self, url: &str) -> Result<String, SummarizeError> {
        let text = self.loader.load(url).await?;
        let chunks = self.select_chunks(&text);
        Ok(self.reducer.summarize_chunks(&chunks).await?)
    }
}

/// Summarizes everything accumulated in a session into one text.
pub struct AggregateSummarizer {
    splitter: TextSplitter,
    reducer: MapReduceSummarizer,
}

impl AggregateSummarizer {
    pub fn new(splitter: TextSplitter, reducer: MapReduceSummarizer) -> Self {
        Self { splitter, reducer }
    }

    pub async fn combine(&self, texts: &[String]) -> Result<String, LlmError> {
        let joined = texts.join(AGGREGATE_SEPARATOR);
        let chunks = self.splitter.split_text(&joined);
        self.reducer.summarize_chunks(&chunks).await
    }
}
