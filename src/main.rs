use anyhow::{Context, Result};
use clap::Parser;
use ssv_verifier::{
    args::Arguments,
    config::Config,
    keys::{HttpKeySource, KeyStore},
    routes,
    verifier::CallbackVerifier,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = Arguments::parse();
    let config = Config::load(&args).await?;
    debug!("Config: {:#?}", config);

    let source = HttpKeySource::new(config.keys.urls.clone(), config.keys.fetch_timeout())
        .context("failed to build key fetch client")?;
    let keys = Arc::new(KeyStore::new(source, config.keys.cache_ttl()));
    let app = routes::build(Arc::new(CallbackVerifier::new(keys)));

    let listener = TcpListener::bind(config.server.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.server.listen))?;
    info!("{} listening on {}", ssv_verifier::agent_string(), listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shut down cleanly.");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received.");
}
