use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use minijinja::Environment;
use serde::Deserialize;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::pages;
use crate::session::{Download, Handlers, SessionId, SessionStore};

pub const SESSION_COOKIE: &str = "search_intent_session";

#[derive(Error, Debug)]
pub enum WebError {
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        error!(error = %self, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

pub struct AppState {
    pub handlers: Handlers,
    pub sessions: SessionStore,
    pub templates: Environment<'static>,
}

impl AppState {
    pub fn new(handlers: Handlers, sessions: SessionStore) -> Result<Self, WebError> {
        Ok(Self {
            handlers,
            sessions,
            templates: pages::templates()?,
        })
    }
}

#[derive(Deserialize)]
pub struct RunForm {
    keyword: String,
    k: u32,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/run", post(run))
        .route("/download", get(download_responses))
        .route("/summarize", post(summarize_further))
        .route("/summary/download", get(download_summary))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
}

pub async fn serve(state: Arc<AppState>, addr: &str) -> Result<(), WebError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Search intent UI available at http://{addr}/");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// Every handler uses `try_lock`: while a run or summarize holds the session, other
// requests for it get the busy page instead of waiting minutes on the lock.

async fn index(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Response, WebError> {
    let (id, session, created) = state.sessions.open(session_id(&headers)).await;
    let html = match session.try_lock() {
        Ok(session) => pages::render_index(&state.templates, &session)?,
        Err(_) => pages::render_busy(&state.templates)?,
    };
    Ok(with_session(Html(html).into_response(), id, created))
}

async fn run(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<RunForm>, FormRejection>,
) -> Response {
    let (id, session, created) = state.sessions.open(session_id(&headers)).await;
    match session.try_lock() {
        Ok(mut session) => match form {
            Ok(Form(form)) => {
                // Failures are recorded on the session and shown on the next page load.
                let _ = state.handlers.run(&mut session, &form.keyword, form.k).await;
            }
            Err(rejection) => {
                warn!(error = %rejection, "invalid run form");
                session.fail(format!("Invalid input: {}", rejection.body_text()));
            }
        },
        Err(_) => info!(session = %id, "run requested while session is busy"),
    }
    with_session(Redirect::to("/").into_response(), id, created)
}

async fn summarize_further(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let (id, session, created) = state.sessions.open(session_id(&headers)).await;
    match session.try_lock() {
        Ok(mut session) => {
            let _ = state.handlers.summarize_further(&mut session).await;
        }
        Err(_) => info!(session = %id, "summarize requested while session is busy"),
    }
    with_session(Redirect::to("/").into_response(), id, created)
}

async fn download_responses(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let (id, session, created) = state.sessions.open(session_id(&headers)).await;
    let download = match session.try_lock() {
        Ok(mut session) => state.handlers.download_responses(&mut session),
        Err(_) => None,
    };
    with_session(attachment_or_home(download), id, created)
}

async fn download_summary(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let (id, session, created) = state.sessions.open(session_id(&headers)).await;
    let download = match session.try_lock() {
        Ok(mut session) => state.handlers.download_summary(&mut session),
        Err(_) => None,
    };
    with_session(attachment_or_home(download), id, created)
}

fn attachment_or_home(download: Option<Download>) -> Response {
    match download {
        Some(download) => (
            [
                (CONTENT_TYPE, String::from("text/plain; charset=utf-8")),
                (
                    CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", download.filename),
                ),
            ],
            download.content,
        )
            .into_response(),
        None => Redirect::to("/").into_response(),
    }
}

/// Reads the session id from the request's cookies.
pub fn session_id(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

fn with_session(mut response: Response, id: SessionId, created: bool) -> Response {
    if created {
        let cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().insert(SET_COOKIE, value);
        }
    }
    response
}
