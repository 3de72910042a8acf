mod config;
mod logging;
pub use config::{AppConfig, ClientConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_UPSTREAM_URL};
pub use logging::{chat_filter, init_tracing, server_filter};
