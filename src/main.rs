use anyhow::{anyhow, Context, Result};
use clap::Parser;
use live_interpreter::recognition::dashscope::DashScopeRecognizerFactory;
use live_interpreter::{
    create_router, AppState, Config, DashScopeTranslator, SessionConfig, SessionController,
    Translator,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tracing::{info, warn};

/// Live speech transcription and translation server
#[derive(Parser, Debug)]
#[command(name = "live-interpreter")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (extension optional)
    #[arg(short = 'c', long = "config", default_value = "config/live-interpreter")]
    config: String,

    /// Override the bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the HTTP port
    #[arg(short = 'p', long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Both rustls providers can end up linked in; pick one before any TLS connection
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();
    let mut cfg = Config::load(&cli.config)?;
    if let Some(bind) = cli.bind {
        cfg.service.http.bind = bind;
    }
    if let Some(port) = cli.port {
        cfg.service.http.port = port;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!(
        "Transcoder: {} {}",
        cfg.transcoder.program,
        cfg.transcoder.args.join(" ")
    );
    info!(
        "Recognition model: {} ({} Hz {})",
        cfg.recognition.model, cfg.recognition.sample_rate, cfg.recognition.format
    );
    info!("Translation model: {}", cfg.translation.model);

    if cfg.translation.api_key().is_none() {
        warn!("No translation API key configured; translations will fail");
    }

    let recognizers = Arc::new(DashScopeRecognizerFactory::new(
        cfg.recognition.clone(),
        Handle::current(),
    ));
    let translator: Arc<dyn Translator> = Arc::new(DashScopeTranslator::new(&cfg.translation)?);

    let sessions = SessionController::new(
        SessionConfig::from_config(&cfg),
        recognizers,
        Some(translator),
    );
    let app = create_router(AppState::new(sessions));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
