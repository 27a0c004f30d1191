pub mod search;

pub use search::{ResultCount, ResultLister, SearchError, SerpApiLister};
