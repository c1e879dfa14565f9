use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use registration_progress::config::EngineConfig;
use registration_progress::registration::{Dashboard, HttpProgressSource, registration_routes};
use registration_progress::store::{LibSqlCache, LocalCache, MemoryCache};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = EngineConfig::from_env();
    config.validate()?;

    eprintln!("Registration progress v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {}", config.api_base_url);
    eprintln!("   Local cache: {}", config.db_path);
    eprintln!("   Draft debounce: {:?}", config.draft_debounce);
    eprintln!("   API: http://0.0.0.0:{}/api/registration/state\n", config.port);

    // ── Local caches ────────────────────────────────────────────────────
    let durable: Arc<dyn LocalCache> = Arc::new(
        LibSqlCache::new_local(Path::new(&config.db_path))
            .await
            .with_context(|| format!("Failed to open local cache at {}", config.db_path))?,
    );
    let session: Arc<dyn LocalCache> = Arc::new(MemoryCache::new());

    // ── Progress source ─────────────────────────────────────────────────
    let source = Arc::new(HttpProgressSource::new(
        config.api_base_url.clone(),
        config.request_timeout,
        Arc::clone(&durable),
    )?);

    let dashboard = Arc::new(Dashboard::new(
        source,
        durable,
        session,
        config.draft_debounce,
    ));

    let app = registration_routes(dashboard);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("Failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Registration API started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
