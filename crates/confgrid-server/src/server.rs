//! HTTP server lifecycle

use crate::api::{self, AppState};
use crate::config::ServerConfig;
use crate::error::ServerError;
use confgrid_core::ConfigurationRepository;
use std::future::Future;

/// Serve until Ctrl-C
///
/// # Errors
/// `ServerError` if the address is invalid or cannot be bound
pub async fn run(
    config: &ServerConfig,
    repository: ConfigurationRepository,
) -> Result<(), ServerError> {
    run_until(config, repository, shutdown_signal()).await
}

/// Serve until `shutdown` resolves; in-flight requests are drained first
///
/// # Errors
/// `ServerError` if the address is invalid or cannot be bound
pub async fn run_until<S>(
    config: &ServerConfig,
    repository: ConfigurationRepository,
    shutdown: S,
) -> Result<(), ServerError>
where
    S: Future<Output = ()> + Send + 'static,
{
    let addr = config.socket_addr()?;
    let routes = api::routes(AppState::new(repository), &config.frontend_origin);

    let (bound, server) = warp::serve(routes).try_bind_with_graceful_shutdown(addr, shutdown)?;
    tracing::info!(
        addr = %bound,
        frontend_origin = %config.frontend_origin,
        "confgrid API listening"
    );

    server.await;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
