//! JSON API over the caller's dashboard session.

use axum::{
    Extension, Json,
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::catalog::Catalog;
use crate::dashboard::{DashboardSession, ServerView};
use crate::error::DashboardError;
use crate::execution::{InvocationResult, Outcome};
use crate::registry::{ImportMode, RegistryBlob, ServerConfig};

/// GET /healthz
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/servers
pub async fn list_servers(Extension(session): Extension<DashboardSession>) -> Json<Vec<ServerView>> {
    Json(session.view().servers)
}

/// POST /api/servers
pub async fn add_server(
    Extension(session): Extension<DashboardSession>,
    Json(config): Json<ServerConfig>,
) -> Result<(StatusCode, Json<ServerConfig>), DashboardError> {
    session.add_server(config.clone())?;
    Ok((StatusCode::CREATED, Json(config)))
}

/// DELETE /api/servers/{name}
pub async fn remove_server(
    Extension(session): Extension<DashboardSession>,
    Path(name): Path<String>,
) -> Result<Json<ServerConfig>, DashboardError> {
    session.remove_server(&name).await.map(Json)
}

/// POST /api/servers/{name}/connect
pub async fn connect_server(
    Extension(session): Extension<DashboardSession>,
    Path(name): Path<String>,
) -> Result<Json<ServerView>, DashboardError> {
    session.connect(&name).await?;
    server_view(&session, &name).map(Json)
}

/// POST /api/servers/{name}/disconnect
pub async fn disconnect_server(
    Extension(session): Extension<DashboardSession>,
    Path(name): Path<String>,
) -> Result<Json<ServerView>, DashboardError> {
    session.disconnect(&name).await?;
    server_view(&session, &name).map(Json)
}

fn server_view(session: &DashboardSession, name: &str) -> Result<ServerView, DashboardError> {
    session
        .view()
        .servers
        .into_iter()
        .find(|s| s.config.name == name)
        .ok_or_else(|| DashboardError::NotFound(format!("server '{name}'")))
}

/// GET /api/tools
pub async fn list_tools(Extension(session): Extension<DashboardSession>) -> Json<Catalog> {
    Json(session.catalog())
}

/// POST /api/tools/{server}/{tool}/invoke
///
/// The body is the argument object; an empty body means no arguments.
/// Validation failures answer 422 before anything is sent. Failed runs are
/// recorded and answered with the run itself.
pub async fn invoke_tool(
    Extension(session): Extension<DashboardSession>,
    Path((server, tool)): Path<(String, String)>,
    body: String,
) -> Result<Response, DashboardError> {
    let arguments = if body.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(&body).map_err(|e| {
            DashboardError::InvalidConfig(format!("arguments are not valid JSON: {e}"))
        })?
    };
    let result = session.invoke_json(&server, &tool, &arguments).await?;
    Ok((outcome_status(&result), Json(result)).into_response())
}

fn outcome_status(result: &InvocationResult) -> StatusCode {
    match &result.outcome {
        Outcome::Success { .. } => StatusCode::OK,
        Outcome::Error { kind: "timeout", .. } => StatusCode::GATEWAY_TIMEOUT,
        Outcome::Error { .. } => StatusCode::BAD_GATEWAY,
    }
}

/// GET /api/config - the session's registry as a shareable blob.
pub async fn export_config(Extension(session): Extension<DashboardSession>) -> Json<RegistryBlob> {
    Json(session.export())
}

#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    #[serde(default)]
    mode: ImportMode,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    servers: usize,
}

/// POST /api/config?mode=replace|merge - body is JSON or YAML in any
/// accepted layout.
pub async fn import_config(
    Extension(session): Extension<DashboardSession>,
    Query(query): Query<ImportQuery>,
    body: String,
) -> Result<Json<ImportResponse>, DashboardError> {
    session.import_text(&body, query.mode).await?;
    Ok(Json(ImportResponse {
        servers: session.servers().len(),
    }))
}

/// GET /api/history - most recent first.
pub async fn history(Extension(session): Extension<DashboardSession>) -> Json<Vec<InvocationResult>> {
    Json(session.history())
}

/// DELETE /api/history
pub async fn clear_history(Extension(session): Extension<DashboardSession>) -> StatusCode {
    session.clear_history();
    StatusCode::NO_CONTENT
}
