use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zai_proxy::auth::AuthMode;
use zai_proxy::config::config_search_paths;
use zai_proxy::{build_router, AppState, ProxyConfig, SharedLogger};

#[derive(Parser)]
#[command(
    name = "zai-proxy",
    about = "OpenAI-compatible gateway for the chat.z.ai streaming chat API",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config and PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable debug logging (overrides config and DEBUG_MODE)
    #[arg(long)]
    debug: bool,

    /// Log file path
    #[arg(long, default_value = "zai-proxy.log")]
    log_file: PathBuf,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zai_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        return Ok(());
    }

    let mut config = ProxyConfig::find_and_load(cli.config.as_deref())?;
    config.apply_process_env()?;

    if let Some(port) = cli.port {
        config.port = port;
    }
    if cli.debug {
        config.debug_mode = true;
    }

    let logger = SharedLogger::new(&cli.log_file, config.debug_mode)?;

    let auth_mode = match config.auth.mode() {
        AuthMode::FixedKey { .. } => "fixed key",
        AuthMode::Passthrough => "passthrough",
    };

    info!("╔═══════════════════════════════════════════════════════╗");
    info!("║           zai-proxy v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚═══════════════════════════════════════════════════════╝");
    info!("  Upstream:  {}", config.upstream.url);
    info!("  Auth:      {}", auth_mode);
    info!("  Stream:    {}", if config.default_stream { "on by default" } else { "off by default" });
    info!("  Debug:     {}", config.debug_mode);
    info!("  Port:      {}", config.port);
    info!("  Log file:  {}", cli.log_file.display());

    logger.info(
        "startup",
        format!(
            "Starting zai-proxy upstream={} auth={} port={}",
            config.upstream.url, auth_mode, config.port
        ),
    );

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
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);
    info!("");
    info!("  Point any OpenAI client at:");
    info!("    OPENAI_BASE_URL=http://localhost:{}/v1", port);
    info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
