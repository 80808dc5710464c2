use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
///
/// Nothing here is strictly required: without `ANTHROPIC_API_KEY` every
/// request resolves deterministic-only, and without `REDIS_URL` the AI
/// response cache falls back to a process-local map.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub redis_url: Option<String>,
    pub ai_api_key: Option<String>,
    /// Hard ceiling on a single AI analysis call, including retries.
    pub ai_timeout_secs: u64,
    /// Lifetime of cached AI analyses, keyed by job-specification hash.
    pub cache_ttl_secs: u64,
    pub max_upload_bytes: usize,
    pub max_concurrent_requests: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            redis_url: optional_env("REDIS_URL"),
            ai_api_key: optional_env("ANTHROPIC_API_KEY"),
            ai_timeout_secs: std::env::var("AI_TIMEOUT_SECS")
                .unwrap_or_else(|_| "20".to_string())
                .parse::<u64>()
                .context("AI_TIMEOUT_SECS must be a number of seconds")?,
            cache_ttl_secs: std::env::var("CACHE_TTL_SECS")
                .unwrap_or_else(|_| "3600".to_string())
                .parse::<u64>()
                .context("CACHE_TTL_SECS must be a number of seconds")?,
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| "10485760".to_string())
                .parse::<usize>()
                .context("MAX_UPLOAD_BYTES must be a byte count")?,
            max_concurrent_requests: std::env::var("MAX_CONCURRENT_REQUESTS")
                .unwrap_or_else(|_| "256".to_string())
                .parse::<usize>()
                .context("MAX_CONCURRENT_REQUESTS must be a count")?,
        })
    }
}

/// Reads an optional env var, treating empty or whitespace values as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
