//! Codepad server binary

use anyhow::{Context, Result};
use codepad::CodepadConfig;
use codepad::TeamBackend;
use codepad::api::{ApiState, create_router};
use codepad::dispatch::Dispatcher;
use codepad::explain::ChatExplainer;
use codepad::normalize::Normalizer;
use codepad::sandbox::PistonSandbox;
use codepad::share::ChatWebhook;
use codepad::store::{FileStore, MemoryStore, WorkspaceStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting codepad server v{}", env!("CARGO_PKG_VERSION"));

    // Load config from file, falling back to defaults
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "codepad.toml".to_string());

    let config = if Path::new(&config_path).exists() {
        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        CodepadConfig::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", config_path))?
    } else {
        warn!(config_path = config_path, "Config file not found, using defaults");
        CodepadConfig::default()
    };

    let timeout = Duration::from_secs(config.sandbox.timeout_secs);
    let sandbox = PistonSandbox::with_base_url(&config.sandbox.base_url, timeout)
        .context("Failed to create sandbox client")?;
    info!(
        sandbox = "piston",
        base_url = config.sandbox.base_url,
        timeout_secs = config.sandbox.timeout_secs,
        "Configured sandbox"
    );

    let store: Arc<dyn WorkspaceStore> = match config.team.backend {
        TeamBackend::Memory => {
            info!("Team document kept in memory");
            Arc::new(MemoryStore::new())
        }
        TeamBackend::File => {
            info!(path = ?config.team.path, "Team document stored on disk");
            Arc::new(FileStore::new(&config.team.path))
        }
    };

    // Webhook URL from environment wins over the config file
    let webhook_url = std::env::var("CODEPAD_WEBHOOK_URL")
        .ok()
        .or_else(|| config.share.webhook_url.clone());
    if webhook_url.is_none() {
        warn!("No chat webhook configured (set CODEPAD_WEBHOOK_URL); /share will fail");
    }
    let webhook = ChatWebhook::new(webhook_url, config.share.max_chars, timeout)
        .context("Failed to create webhook client")?;

    // Explanation API key only from the environment
    let explain_key = std::env::var("CODEPAD_EXPLAIN_API_KEY")
        .ok()
        .or_else(|| std::env::var("GROQ_API_KEY").ok());
    let explainer = ChatExplainer::with_base_url(
        &config.explain.base_url,
        explain_key,
        &config.explain.model,
        Duration::from_secs(config.explain.timeout_secs),
    )
    .context("Failed to create explanation client")?;
    if !explainer.has_api_key() {
        warn!("No explanation API key (set CODEPAD_EXPLAIN_API_KEY); sending unauthenticated");
    }
    info!(
        base_url = %config.explain.base_url,
        model = %config.explain.model,
        "Configured code explanations"
    );

    let state = Arc::new(ApiState {
        normalizer: Normalizer::new(config.decode.sniff_fallback),
        dispatcher: Dispatcher::new(Arc::new(sandbox)),
        store,
        webhook,
        explainer: Arc::new(explainer),
    });

    // Check the sandbox once without holding up startup
    let checker = state.clone();
    tokio::spawn(async move {
        let health = checker.dispatcher.sandbox().health_check().await;
        if health.healthy {
            info!(latency_ms = ?health.latency_ms, "Sandbox reachable");
        } else {
            warn!(error = ?health.error, "Sandbox health check failed");
        }
    });

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!("Listening on {}", config.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}
