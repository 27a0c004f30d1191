pub mod intent;
pub mod llm;
pub mod loader;
pub mod pipeline;
pub mod record;
pub mod search;
pub mod summarize;

pub use pipeline::{Pipeline, PipelineError};
pub use record::{IntentRecord, PageSummary, RunReport, SearchResult, Step, UrlFailure};
