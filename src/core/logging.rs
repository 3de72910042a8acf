use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used by the server when `RUST_LOG` is not set.
pub fn server_filter() -> String {
    // axum logs rejections from built-in extractors with the `axum::rejection`
    // target, at `TRACE` level. `axum::rejection=trace` enables showing those events
    format!(
        "{}=debug,tower_http=debug,axum::rejection=trace",
        env!("CARGO_CRATE_NAME")
    )
}

/// Filter used by the chat client when `RUST_LOG` is not set. Quiet by
/// default so log lines do not interleave with the conversation.
pub fn chat_filter() -> String {
    format!("{}=warn", env!("CARGO_CRATE_NAME"))
}

/// Install the global subscriber. `RUST_LOG` wins over `default_filter`.
/// Logs go to stderr so they never mix with replies printed to stdout.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    if let Err(err) = result {
        eprintln!("Tracing already initialized: {}", err);
    }
}
