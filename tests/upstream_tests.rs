use std::collections::HashMap;
use std::error::Error;

use axum::extract::Query;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Client;
use search_intent::config::Config;
use search_intent::pipeline::llm::{ChatModel, LlmError, Message, OpenAiChat};
use search_intent::pipeline::loader::{LoadError, PageLoader, WebPageLoader};
use search_intent::pipeline::search::{ResultCount, ResultLister, SearchError, SerpApiLister};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// Serves `app` on an ephemeral local port and returns its base URL.
async fn spawn(app: Router) -> Result<String, Box<dyn Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

fn config_for(base: &str) -> Result<Config, Box<dyn Error>> {
    let vars: HashMap<&str, String> = [
        ("SERPAPI_API_KEY", String::from("serp-test")),
        ("OPENAI_API_KEY", String::from("sk-test")),
        ("SERPAPI_BASE_URL", format!("{base}/search")),
        ("OPENAI_BASE_URL", format!("{base}/v1/")),
    ]
    .into_iter()
    .collect();
    Ok(Config::from_lookup(|key| vars.get(key).cloned())?)
}

fn pages() -> Router {
    Router::new()
        .route(
            "/article",
            get(|| async {
                Html("<html><body><nav>Menu</nav>Intro.<p>Renovation costs vary.</p></body></html>")
            }),
        )
        .route(
            "/notes.txt",
            get(|| async { ([(CONTENT_TYPE, "text/plain; charset=utf-8")], "  plain notes \n") }),
        )
        .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "not here") }))
        .route(
            "/photo.png",
            get(|| async { ([(CONTENT_TYPE, "image/png")], vec![0x89u8, 0x50, 0x4e, 0x47]) }),
        )
        .route("/empty", get(|| async { Html("<html><body><script>x()</script></body></html>") }))
}

#[tokio::test]
async fn loader_reads_html_and_plain_text() -> Result<(), Box<dyn Error>> {
    let base = spawn(pages()).await?;
    let loader = WebPageLoader::new(Client::new());

    let text = loader.load(&format!("{base}/article")).await?;
    assert_eq!(text, "Intro.\n\nRenovation costs vary.");

    let text = loader.load(&format!("{base}/notes.txt")).await?;
    assert_eq!(text, "plain notes");
    Ok(())
}

#[tokio::test]
async fn loader_rejects_bad_status_non_text_and_empty_pages() -> Result<(), Box<dyn Error>> {
    let base = spawn(pages()).await?;
    let loader = WebPageLoader::new(Client::new());

    let err = loader.load(&format!("{base}/missing")).await.unwrap_err();
    assert!(matches!(err, LoadError::Status { status: 404, .. }));

    let err = loader.load(&format!("{base}/photo.png")).await.unwrap_err();
    assert!(matches!(err, LoadError::NonText { ref content_type, .. } if content_type == "image/png"));

    let err = loader.load(&format!("{base}/empty")).await.unwrap_err();
    assert!(matches!(err, LoadError::Empty(_)));
    Ok(())
}

#[tokio::test]
async fn loader_reports_unreachable_hosts() -> Result<(), Box<dyn Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let loader = WebPageLoader::new(Client::new());
    let err = loader.load(&format!("http://{addr}/")).await.unwrap_err();
    assert!(matches!(err, LoadError::Request { .. }));
    Ok(())
}

async fn serp(Query(params): Query<HashMap<String, String>>) -> Response {
    if params.get("api_key").map(String::as_str) != Some("serp-test") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Invalid API key."}))).into_response();
    }
    match params.get("q").map(String::as_str) {
        Some("nothing") => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Google hasn't returned any results for this query."})),
        )
            .into_response(),
        Some("down") => (StatusCode::SERVICE_UNAVAILABLE, "upstream down").into_response(),
        Some("quota") => Json(json!({"error": "Your account has run out of searches."})).into_response(),
        _ => Json(json!({
            "search_parameters": {"engine": params.get("engine"), "gl": params.get("gl")},
            "organic_results": [
                {"position": 1, "link": "https://a.example", "title": "A"},
                {"position": 2, "link": "https://b.example", "title": "B"},
                {"position": 3, "link": "https://c.example", "title": "C"}
            ]
        }))
        .into_response(),
    }
}

#[tokio::test]
async fn serpapi_listing_over_http() -> Result<(), Box<dyn Error>> {
    let base = spawn(Router::new().route("/search", get(serp))).await?;
    let lister = SerpApiLister::new(Client::new(), &config_for(&base)?);
    let k = ResultCount::new(2).ok_or("bad count")?;

    let results = lister.list_top_results("apartment renovation", k).await?;
    let links: Vec<_> = results.iter().map(|r| r.link.as_str()).collect();
    assert_eq!(links, vec!["https://a.example", "https://b.example"]);

    assert!(lister.list_top_results("nothing", k).await?.is_empty());

    let err = lister.list_top_results("down", k).await.unwrap_err();
    assert!(matches!(err, SearchError::Api { status: 503, .. }));

    let err = lister.list_top_results("quota", k).await.unwrap_err();
    assert!(matches!(err, SearchError::Engine(ref message) if message.contains("run out")));
    Ok(())
}

async fn chat_completions(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let authorized = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "Bearer sk-test");
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "bad key").into_response();
    }

    let last = body["messages"]
        .as_array()
        .and_then(|m| m.last())
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default()
        .to_string();
    match last.as_str() {
        "overload" => (StatusCode::SERVICE_UNAVAILABLE, "model overloaded").into_response(),
        "silent" => Json(json!({"choices": []})).into_response(),
        _ => Json(json!({
            "choices": [{"message": {
                "role": "assistant",
                "content": format!("{} says: {last}", body["model"].as_str().unwrap_or_default())
            }}]
        }))
        .into_response(),
    }
}

#[tokio::test]
async fn openai_chat_over_http() -> Result<(), Box<dyn Error>> {
    let base = spawn(Router::new().route("/v1/chat/completions", post(chat_completions))).await?;
    let model = OpenAiChat::new(Client::new(), &config_for(&base)?);

    let reply = model
        .complete(&[Message::system("You are an SEO consultant."), Message::user("hello")])
        .await?;
    assert_eq!(reply, "gpt-3.5-turbo says: hello");

    let err = model.complete(&[Message::user("overload")]).await.unwrap_err();
    assert!(matches!(err, LlmError::Api { status: 503, ref body } if body == "model overloaded"));

    let err = model.complete(&[Message::user("silent")]).await.unwrap_err();
    assert!(matches!(err, LlmError::EmptyResponse));
    Ok(())
}
