//! Axum server setup and startup

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use super::routes::create_router;
use super::state::AppStateHandle;
use crate::settings::ServerSettings;

/// Build the router with the middleware the settings ask for
pub fn build_app(settings: &ServerSettings, state: AppStateHandle) -> Router {
    let mut app = create_router(state)
        .layer(DefaultBodyLimit::max(settings.max_body_bytes))
        .layer(TraceLayer::new_for_http());

    if settings.cors_enabled {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Periodically drop sessions idle for longer than `ttl`
pub fn spawn_session_sweeper(
    state: AppStateHandle,
    ttl: Duration,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = state.sessions.sweep_idle(ttl);
                    if removed > 0 {
                        log::debug!("Swept {} idle try-on sessions", removed);
                    }
                }
                _ = shutdown_rx.changed() => break,
            }
        }
    })
}

/// Run the API server until the shutdown signal is received
///
/// This function is intended to be run on a tokio runtime.
pub async fn run_server(
    settings: &ServerSettings,
    state: AppStateHandle,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> Result<(), std::io::Error> {
    let ip = settings.bind_address.parse().map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid bind address {}: {}", settings.bind_address, e),
        )
    })?;
    let addr = SocketAddr::new(ip, settings.port);
    let sweeper = spawn_session_sweeper(
        state.clone(),
        settings.sessions.idle_ttl(),
        settings.sessions.sweep_interval(),
        shutdown_rx.clone(),
    );
    let app = build_app(settings, state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("VTO server listening on http://{}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            // Wait for shutdown signal
            let _ = shutdown_rx.changed().await;
            log::info!("VTO server shutting down gracefully");
        })
        .await;
    sweeper.abort();
    served
}
