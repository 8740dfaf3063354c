//! Start a zai-proxy server programmatically.
//!
//! Usage:
//!   export UPSTREAM_TOKEN=eyJ...   # optional, with DEFAULT_KEY for fixed-key mode
//!   cargo run --example basic_proxy

use std::sync::Arc;
use zai_proxy::{build_router, AppState, ProxyConfig, SharedLogger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut config = ProxyConfig::find_and_load(None)?;
    config.apply_process_env()?;

    println!("Upstream: {}", config.upstream.url);

    let logger = SharedLogger::new("proxy-example.log", config.debug_mode)?;
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let port = config.port;
    let state = Arc::new(AppState {
        config,
        client,
        logger,
    });

    let app = build_router(state);
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("Listening on http://{}", addr);
    println!();
    println!("  OPENAI_BASE_URL=http://localhost:{}/v1", port);

    axum::serve(listener, app).await?;
    Ok(())
}
