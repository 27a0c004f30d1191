use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::debug;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
const SKIP_ELEMENTS: &str = "script, style, noscript, aside, nav, header, footer, form, input, button, svg, canvas, iframe, object, embed, video, audio, picture, figure, link, meta, template";
const BLOCK_ELEMENTS: &str = "h1, h2, h3, h4, h5, h6, p, li, pre, blockquote, td, th, dt, dd";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Unsupported URL '{0}'")]
    UnsupportedUrl(String),
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("{url} is not a text document ({content_type})")]
    NonText { url: String, content_type: String },
    #[error("{0} contains no readable text")]
    Empty(String),
}

#[async_trait]
pub trait PageLoader: Send + Sync {
    /// Fetches `url` and returns its readable text.
    async fn load(&self, url: &str) -> Result<String, LoadError>;
}

pub struct WebPageLoader {
    client: Client,
}

impl WebPageLoader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageLoader for WebPageLoader {
    async fn load(&self, url: &str) -> Result<String, LoadError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(LoadError::UnsupportedUrl(url.to_string()));
        }
        debug!(url, "fetching page");

        let request_err = |source| LoadError::Request { url: url.to_string(), source };
        let res = self.client.get(url).send().await.map_err(request_err)?;

        let status = res.status();
        if !status.is_success() {
            return Err(LoadError::Status { url: url.to_string(), status: status.as_u16() });
        }

        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_ascii_lowercase();
        let body = res.text().await.map_err(request_err)?;

        let text = if content_type.contains("html") {
            extract_text_from_html(&body)
        } else if content_type.starts_with("text/") {
            body.trim().to_string()
        } else {
            return Err(LoadError::NonText { url: url.to_string(), content_type });
        };

        if text.is_empty() {
            return Err(LoadError::Empty(url.to_string()));
        }
        Ok(text)
    }
}

struct Selectors {
    skip: Selector,
    blocks: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            skip: Selector::parse(SKIP_ELEMENTS).unwrap(),
            blocks: Selector::parse(BLOCK_ELEMENTS).unwrap(),
        }
    }

    /// A block element, or an element that has one somewhere inside it.
    fn breaks_paragraph(&self, element: &ElementRef) -> bool {
        self.blocks.matches(element) || element.select(&self.blocks).next().is_some()
    }
}

/// Paragraphs found so far plus the inline text run still being collected.
#[derive(Default)]
struct Paragraphs {
    done: Vec<String>,
    run: String,
}

impl Paragraphs {
    fn flush(&mut self) {
        let clean = WHITESPACE.replace_all(&self.run, " ");
        let clean = clean.trim();
        if !clean.is_empty() {
            self.done.push(clean.to_string());
        }
        self.run.clear();
    }
}

/// Visible text of a document. Each block element becomes its own paragraph, and
/// so does any run of loose text between blocks, so the splitter can break on
/// paragraph boundaries.
pub fn extract_text_from_html(html: &str) -> String {
    let document = Html::parse_document(html);
    let body_selector = Selector::parse("body").unwrap();
    let selectors = Selectors::new();

    let mut paragraphs = Paragraphs::default();
    for body in document.select(&body_selector) {
        collect_paragraphs(body, &selectors, &mut paragraphs);
    }
    paragraphs.flush();

    paragraphs.done.join("\n\n")
}

fn collect_paragraphs(element: ElementRef, selectors: &Selectors, paragraphs: &mut Paragraphs) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            paragraphs.run.push_str(text);
            paragraphs.run.push(' ');
            continue;
        }
        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };
        if selectors.skip.matches(&child) {
            continue;
        }

        if selectors.breaks_paragraph(&child) {
            paragraphs.flush();
            collect_paragraphs(child, selectors, paragraphs);
            paragraphs.flush();
        } else {
            push_inline_text(child, selectors, &mut paragraphs.run);
        }
    }
}

fn push_inline_text(element: ElementRef, selectors: &Selectors, run: &mut String) {
    for node in element.descendants() {
        if let Some(text) = node.value().as_text() {
            let skipped = node
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|a| selectors.skip.matches(&a));
            if !skipped {
                run.push_str(text);
                run.push(' ');
            }
        }
    }
}
