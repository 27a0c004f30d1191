use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_SERPAPI_URL: &str = "https://serpapi.com/search";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Required environment variable '{0}' is not set")]
    Missing(&'static str),
    #[error("Invalid value '{value}' for '{key}'")]
    Invalid { key: &'static str, value: String },
    #[error("CHUNK_OVERLAP ({overlap}) must be smaller than CHUNK_SIZE ({size})")]
    OverlapTooLarge { overlap: usize, size: usize },
}

/// Runtime settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub serp_api_key: String,
    pub serp_api_url: String,
    pub search_engine: String,
    pub search_gl: String,
    pub search_hl: String,

    pub openai_api_key: String,
    pub openai_base_url: String,
    pub model: String,
    pub temperature: f32,

    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_chunks: usize,
    pub reduce_limit: usize,
    pub fetch_timeout: Duration,
    pub llm_timeout: Duration,
    pub response_language: String,

    pub host: String,
    pub port: u16,
    pub session_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup. `from_env` is the production caller.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let serp_api_key = get("SERPAPI_API_KEY")
            .or_else(|| get("SERP_API_KEY"))
            .ok_or(ConfigError::Missing("SERPAPI_API_KEY"))?;
        let openai_api_key = get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        let chunk_size: usize = parse_or(&get, "CHUNK_SIZE", 1000)?;
        let chunk_overlap: usize = parse_or(&get, "CHUNK_OVERLAP", 20)?;
        let max_chunks: usize = parse_or(&get, "MAX_CHUNKS", 3)?;
        let reduce_limit: usize = parse_or(&get, "REDUCE_MAX_CHARS", 4000)?;
        if chunk_size == 0 {
            return Err(ConfigError::Invalid { key: "CHUNK_SIZE", value: String::from("0") });
        }
        if max_chunks == 0 {
            return Err(ConfigError::Invalid { key: "MAX_CHUNKS", value: String::from("0") });
        }
        if reduce_limit == 0 {
            return Err(ConfigError::Invalid { key: "REDUCE_MAX_CHARS", value: String::from("0") });
        }
        if chunk_overlap >= chunk_size {
            return Err(ConfigError::OverlapTooLarge { overlap: chunk_overlap, size: chunk_size });
        }

        Ok(Self {
            serp_api_key,
            serp_api_url: get("SERPAPI_BASE_URL").unwrap_or_else(|| DEFAULT_SERPAPI_URL.to_string()),
            search_engine: get("SEARCH_ENGINE").unwrap_or_else(|| String::from("google")),
            search_gl: get("SEARCH_GL").unwrap_or_else(|| String::from("us")),
            search_hl: get("SEARCH_HL").unwrap_or_else(|| String::from("en")),

            openai_api_key,
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            model: get("OPENAI_MODEL").unwrap_or_else(|| String::from("gpt-3.5-turbo")),
            temperature: parse_or(&get, "OPENAI_TEMPERATURE", 0.0)?,

            chunk_size,
            chunk_overlap,
            max_chunks,
            reduce_limit,
            fetch_timeout: Duration::from_secs(parse_or(&get, "FETCH_TIMEOUT_SECS", 30)?),
            llm_timeout: Duration::from_secs(parse_or(&get, "LLM_TIMEOUT_SECS", 120)?),
            response_language: get("RESPONSE_LANGUAGE").unwrap_or_else(|| String::from("Japanese")),

            host: get("HOST").unwrap_or_else(|| String::from("127.0.0.1")),
            port: parse_or(&get, "PORT", 8501)?,
            session_ttl: Duration::from_secs(parse_or(&get, "SESSION_TTL_SECS", 3600)?),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => Ok(value),
            Err(_) => Err(ConfigError::Invalid { key, value: raw }),
        },
        None => Ok(default),
    }
}
