pub mod splitter;
pub mod summarizer;

pub use splitter::TextSplitter;
pub use summarizer::{
    AggregateSummarizer, MapReduceSummarizer, PageSummarizer, SummarizeError, AGGREGATE_SEPARATOR,
};
