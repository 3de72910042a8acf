use std::env;
use std::time::Duration;

pub const DEFAULT_UPSTREAM_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:2222/api/chat";

/// Configuration for the proxy relay. Read from the environment once at
/// startup and handed to the router through `AppState`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub upstream_url: String,
    pub upstream_api_key: String,
    pub upstream_timeout: Duration,
    pub default_model: String,
    pub max_tokens: u32,
    pub window_size: usize,
    pub shared_secret: Option<String>,
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let upstream_url =
            env::var("ERRORIFY_UPSTREAM_URL").unwrap_or_else(|_| DEFAULT_UPSTREAM_URL.to_string());
        let upstream_api_key =
            env::var("OPENAI_API_KEY").unwrap_or_else(|_| "thiswontworkforopenai".to_string());
        let upstream_timeout = Duration::from_secs(env_parse("ERRORIFY_UPSTREAM_TIMEOUT_SECS", 60));
        let default_model =
            env::var("ERRORIFY_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let max_tokens = env_parse("ERRORIFY_MAX_TOKENS", 600);
        let window_size = env_parse("ERRORIFY_WINDOW", 12);
        let shared_secret = non_empty(env::var("ERRORIFY_PASSWORD").ok());
        let allowed_origins = env::var("ERRORIFY_ALLOWED_ORIGINS")
            .map(|v| split_list(&v))
            .unwrap_or_default();

        Self {
            upstream_url,
            upstream_api_key,
            upstream_timeout,
            default_model,
            max_tokens,
            window_size,
            shared_secret,
            allowed_origins,
        }
    }
}

/// Configuration for the client relay (the terminal chat).
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub endpoint: String,
    pub shared_secret: Option<String>,
    pub model: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: env::var("ERRORIFY_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string()),
            shared_secret: non_empty(env::var("ERRORIFY_PASSWORD").ok()),
            model: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(v) => v.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value for {}: {}", key, v);
            default
        }),
        Err(_) => default,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Split a comma separated list, dropping blank entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
