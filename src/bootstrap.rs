use anyhow::{Context, Result};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::{app_state::AppState, config};

/// Installs the global tracing subscriber. `RUST_LOG` controls the filter;
/// the default keeps request and order logs visible without debug noise.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

pub fn init_env() {
    dotenvy::dotenv().ok();
}

/// Builds the shared state, attaches request tracing and serves the app
/// until the process is stopped.
pub async fn bootstrap(service_name: &str, app: Router<AppState>) -> Result<()> {
    let config = config::load()?;
    let state = AppState::from_config(&config).await?;

    let app = app
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let listener = tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port))
        .await
        .with_context(|| {
            format!(
                "Failed to bind {}:{}",
                config.server.host, config.server.port
            )
        })?;

    tracing::info!(
        "{} listening on {}",
        service_name,
        listener.local_addr().context("Failed to read bound address")?
    );

    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}
