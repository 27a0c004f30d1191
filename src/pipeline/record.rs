use std::fmt;

/// Separator between formatted records in the accumulated report.
pub const RECORD_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub link: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSummary {
    pub url: String,
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRecord {
    pub url: String,
    pub title: String,
    pub intent_text: String,
}

impl IntentRecord {
    pub fn format(&self) -> String {
        format!("URL: {}\nTitle: {}\n\n{}", self.url, self.title, self.intent_text)
    }
}

/// Which step of the per-URL pipeline failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Summarize,
    InferIntent,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Summarize => write!(f, "summarize"),
            Step::InferIntent => write!(f, "infer intent"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlFailure {
    pub url: String,
    pub title: String,
    pub step: Step,
    pub message: String,
}

impl fmt::Display for UrlFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.url, self.step, self.message)
    }
}

/// Outcome of one pipeline run. Both lists keep the listing's rank order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub keyword: String,
    pub listed: usize,
    pub records: Vec<IntentRecord>,
    pub failures: Vec<UrlFailure>,
}

impl RunReport {
    pub fn formatted(&self) -> Vec<String> {
        self.records.iter().map(IntentRecord::format).collect()
    }
}

pub fn join_formatted<S: AsRef<str>>(formatted: &[S]) -> String {
    formatted
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(RECORD_SEPARATOR)
}
