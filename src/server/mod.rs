//! HTTP surface: HTML pages, the JSON API and server startup.

pub mod api;
pub mod pages;
pub mod session;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
    routing::{delete, get, post},
};
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::AppState;
use crate::config::AppConfig;
use crate::dashboard::{SessionDefaults, SessionStore};
use crate::mcp::{McpAdapter, RmcpConnector};
use crate::registry::{ImportMode, RegistryBlob, ServerRegistry};

pub use session::SESSION_COOKIE;

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let registry = seed_registry(&config)?;
    info!(
        name: "registry.seeded",
        servers = registry.len(),
        "Default server list loaded"
    );

    let adapter = McpAdapter::new(
        Arc::new(RmcpConnector::new()),
        config.mcp.connect_timeout(),
        config.mcp.call_timeout(),
    );
    let sessions = SessionStore::new(
        adapter,
        SessionDefaults {
            registry,
            theme: config.ui.theme(),
            history_limit: config.ui.history_limit,
            idle_timeout: config.ui.session_idle_timeout(),
        },
    );

    let state = AppState {
        sessions: sessions.clone(),
        config: config.clone(),
    };
    let app = build_router(state);

    let addr = config.server.address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sessions.shutdown().await;
    info!(name: "server.stopped", "Server stopped");
    Ok(())
}

/// Registry every new session starts from.
fn seed_registry(config: &AppConfig) -> anyhow::Result<ServerRegistry> {
    let Some(path) = &config.mcp.servers_file else {
        return Ok(ServerRegistry::with_default_server());
    };
    let blob = RegistryBlob::load(path)?;
    let mut registry = ServerRegistry::new();
    registry.import(blob, ImportMode::Replace)?;
    Ok(registry)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(name: "server.shutdown", "Shutdown requested");
}

/// All routes with their middleware.
pub fn build_router(state: AppState) -> Router {
    let timeout_duration = state.config.server.request_timeout();

    let dashboard = Router::new()
        .route("/", get(pages::index))
        .route("/connect", post(pages::connect_all))
        .route("/disconnect", post(pages::disconnect_all))
        .route("/refresh", post(pages::refresh))
        .route("/tools/{server}/{tool}", get(pages::tool_form).post(pages::run_tool))
        .route("/history/clear", post(pages::clear_history))
        .route("/servers", get(pages::servers).post(pages::add_server))
        .route("/servers/{name}/connect", post(pages::connect_server))
        .route("/servers/{name}/disconnect", post(pages::disconnect_server))
        .route("/servers/{name}/remove", post(pages::remove_server))
        .route("/settings", get(pages::settings).post(pages::save_settings))
        .route("/share", get(pages::share).post(pages::import_config))
        .route("/about", get(pages::about))
        .route("/session/reset", post(pages::reset_session))
        .route("/api/servers", get(api::list_servers).post(api::add_server))
        .route("/api/servers/{name}", delete(api::remove_server))
        .route("/api/servers/{name}/connect", post(api::connect_server))
        .route("/api/servers/{name}/disconnect", post(api::disconnect_server))
        .route("/api/tools", get(api::list_tools))
        .route("/api/tools/{server}/{tool}/invoke", post(api::invoke_tool))
        .route("/api/config", get(api::export_config).post(api::import_config))
        .route("/api/history", get(api::history).delete(api::clear_history))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            session::session_middleware,
        ));

    Router::new()
        .route("/healthz", get(api::health))
        .merge(dashboard)
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(timeout_duration, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
                }
            },
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
