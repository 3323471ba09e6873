//! HTML handlers. Each post does its work and either redirects or
//! re-renders the page with the outcome.

use std::collections::BTreeMap;

use axum::{
    Extension, Form,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use tracing::info;

use super::session::forget;
use crate::AppState;
use crate::dashboard::DashboardSession;
use crate::error::DashboardError;
use crate::forms::FormValues;
use crate::registry::{ImportMode, ServerConfig, Transport};
use crate::theme::{HexColor, Theme, ThemeMode};
use crate::ui::html::shell;
use crate::ui::pages::{self, Flash, ServerDraft, ToolPanel};

fn page(session: &DashboardSession, title: &str, active: &str, body: &str) -> Html<String> {
    Html(shell(title, active, &session.theme(), body))
}

fn dashboard_page(
    session: &DashboardSession,
    status: StatusCode,
    panel: Option<&ToolPanel<'_>>,
    messages: &[Flash],
) -> Response {
    let body = pages::dashboard(&session.view(), panel, messages);
    (status, page(session, "Dashboard", "/", &body)).into_response()
}

fn dashboard_error(session: &DashboardSession, error: &DashboardError) -> Response {
    dashboard_page(session, error.status(), None, &[Flash::Error(error.to_string())])
}

/// GET /
pub async fn index(Extension(session): Extension<DashboardSession>) -> Response {
    dashboard_page(&session, StatusCode::OK, None, &[])
}

/// POST /connect - connect every registered server.
pub async fn connect_all(Extension(session): Extension<DashboardSession>) -> Redirect {
    // Failures are kept per server and shown as warnings.
    session.connect_all().await;
    Redirect::to("/")
}

/// POST /disconnect
pub async fn disconnect_all(Extension(session): Extension<DashboardSession>) -> Redirect {
    session.disconnect_all().await;
    Redirect::to("/")
}

/// POST /refresh - list tools again on every connected server.
pub async fn refresh(Extension(session): Extension<DashboardSession>) -> Redirect {
    session.refresh_tools().await;
    Redirect::to("/")
}

/// POST /servers/{name}/connect
pub async fn connect_server(
    Extension(session): Extension<DashboardSession>,
    Path(name): Path<String>,
) -> Response {
    match session.connect(&name).await {
        Ok(()) => Redirect::to("/").into_response(),
        Err(e @ DashboardError::NotFound(_)) => dashboard_error(&session, &e),
        // Shown through the server's warning.
        Err(_) => Redirect::to("/").into_response(),
    }
}

/// POST /servers/{name}/disconnect
pub async fn disconnect_server(
    Extension(session): Extension<DashboardSession>,
    Path(name): Path<String>,
) -> Response {
    match session.disconnect(&name).await {
        Ok(()) => Redirect::to("/").into_response(),
        Err(e) => dashboard_error(&session, &e),
    }
}

/// GET /tools/{server}/{tool} - form for one tool, filled with schema defaults.
pub async fn tool_form(
    Extension(session): Extension<DashboardSession>,
    Path((server, tool)): Path<(String, String)>,
) -> Response {
    let Some(descriptor) = session.tool(&server, &tool) else {
        return dashboard_error(
            &session,
            &DashboardError::NotFound(format!("tool '{server}/{tool}'")),
        );
    };
    let values = FormValues::from_defaults(&descriptor.schema);
    let panel = ToolPanel {
        tool: &descriptor,
        values: &values,
        errors: None,
        result: None,
    };
    dashboard_page(&session, StatusCode::OK, Some(&panel), &[])
}

/// POST /tools/{server}/{tool} - either edit a repeatable field or run the tool.
pub async fn run_tool(
    Extension(session): Extension<DashboardSession>,
    Path((server, tool)): Path<(String, String)>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response {
    let Some(descriptor) = session.tool(&server, &tool) else {
        return dashboard_error(
            &session,
            &DashboardError::NotFound(format!("tool '{server}/{tool}'")),
        );
    };
    let (mut values, op) = FormValues::from_pairs(pairs);

    if let Some(op) = op {
        values.apply(&op);
        let panel = ToolPanel {
            tool: &descriptor,
            values: &values,
            errors: None,
            result: None,
        };
        return dashboard_page(&session, StatusCode::OK, Some(&panel), &[]);
    }

    match session.invoke_form(&server, &tool, &values).await {
        Ok(result) => {
            let panel = ToolPanel {
                tool: &descriptor,
                values: &values,
                errors: None,
                result: Some(&result),
            };
            dashboard_page(&session, StatusCode::OK, Some(&panel), &[])
        }
        Err(DashboardError::Validation(errors)) => {
            let panel = ToolPanel {
                tool: &descriptor,
                values: &values,
                errors: Some(&errors),
                result: None,
            };
            dashboard_page(&session, StatusCode::UNPROCESSABLE_ENTITY, Some(&panel), &[])
        }
        Err(e) => {
            let panel = ToolPanel {
                tool: &descriptor,
                values: &values,
                errors: None,
                result: None,
            };
            dashboard_page(&session, e.status(), Some(&panel), &[Flash::Error(e.to_string())])
        }
    }
}

/// POST /history/clear
pub async fn clear_history(Extension(session): Extension<DashboardSession>) -> Redirect {
    session.clear_history();
    Redirect::to("/")
}

fn servers_page(
    session: &DashboardSession,
    status: StatusCode,
    draft: &ServerDraft,
    messages: &[Flash],
) -> Response {
    let body = pages::servers(&session.view(), draft, &session.next_default_name(), messages);
    (status, page(session, "Servers", "/servers", &body)).into_response()
}

/// GET /servers
pub async fn servers(Extension(session): Extension<DashboardSession>) -> Response {
    servers_page(&session, StatusCode::OK, &ServerDraft::default(), &[])
}

/// POST /servers - add a server from the form.
pub async fn add_server(
    Extension(session): Extension<DashboardSession>,
    Form(draft): Form<ServerDraft>,
) -> Response {
    let added = config_from_draft(&draft, &session.next_default_name())
        .and_then(|config| {
            let name = config.name.clone();
            session.add_server(config).map(|()| name)
        });
    match added {
        Ok(name) => servers_page(
            &session,
            StatusCode::OK,
            &ServerDraft::default(),
            &[Flash::Info(format!("Added server '{name}'."))],
        ),
        Err(e) => servers_page(&session, e.status(), &draft, &[Flash::Error(e.to_string())]),
    }
}

/// Blank name takes `default_name`; args are one per line, env one
/// `KEY=VALUE` per line.
pub fn config_from_draft(
    draft: &ServerDraft,
    default_name: &str,
) -> Result<ServerConfig, DashboardError> {
    let name = match draft.name.trim() {
        "" => default_name.to_string(),
        name => name.to_string(),
    };
    let transport = if draft.transport.trim().is_empty() {
        Transport::default()
    } else {
        draft
            .transport
            .trim()
            .parse::<Transport>()?
    };

    let args = draft
        .args
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    let mut env = BTreeMap::new();
    for line in draft.env.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some((key, value)) = line.split_once('=') else {
            return Err(DashboardError::InvalidConfig(format!(
                "environment line '{line}' is not KEY=VALUE"
            )));
        };
        env.insert(key.trim().to_string(), value.trim().to_string());
    }

    let config = ServerConfig {
        name,
        transport,
        command_or_url: draft.command_or_url.trim().to_string(),
        args,
        env,
    };
    config.validate()?;
    Ok(config)
}

/// POST /servers/{name}/remove
pub async fn remove_server(
    Extension(session): Extension<DashboardSession>,
    Path(name): Path<String>,
) -> Response {
    match session.remove_server(&name).await {
        Ok(_) => servers_page(
            &session,
            StatusCode::OK,
            &ServerDraft::default(),
            &[Flash::Info(format!("Removed server '{name}'."))],
        ),
        Err(e) => servers_page(
            &session,
            e.status(),
            &ServerDraft::default(),
            &[Flash::Error(e.to_string())],
        ),
    }
}

/// GET /settings
pub async fn settings(Extension(session): Extension<DashboardSession>) -> Html<String> {
    let body = pages::settings(&session.theme(), &[]);
    page(&session, "Settings", "/settings", &body)
}

#[derive(Debug, Deserialize)]
pub struct SettingsForm {
    mode: String,
    button_color: String,
}

/// POST /settings
pub async fn save_settings(
    Extension(session): Extension<DashboardSession>,
    Form(form): Form<SettingsForm>,
) -> Response {
    let theme = form
        .mode
        .parse::<ThemeMode>()
        .and_then(|mode| {
            let button_color = form.button_color.parse::<HexColor>()?;
            Ok(Theme { mode, button_color })
        });

    match theme {
        Ok(theme) => {
            session.set_theme(theme);
            let body = pages::settings(&theme, &[Flash::Info("Settings saved.".to_string())]);
            page(&session, "Settings", "/settings", &body).into_response()
        }
        Err(e) => {
            let body = pages::settings(&session.theme(), &[Flash::Error(e.to_string())]);
            (
                StatusCode::BAD_REQUEST,
                page(&session, "Settings", "/settings", &body),
            )
                .into_response()
        }
    }
}

fn share_page(
    session: &DashboardSession,
    status: StatusCode,
    draft: &str,
    messages: &[Flash],
) -> Response {
    let export = session
        .export()
        .to_json_pretty()
        .unwrap_or_else(|e| e.to_string());
    let body = pages::share(&export, draft, messages);
    (status, page(session, "Share", "/share", &body)).into_response()
}

/// GET /share
pub async fn share(Extension(session): Extension<DashboardSession>) -> Response {
    share_page(&session, StatusCode::OK, "", &[])
}

#[derive(Debug, Deserialize)]
pub struct ImportForm {
    config: String,
    #[serde(default)]
    mode: ImportMode,
}

/// POST /share - import a pasted configuration.
pub async fn import_config(
    Extension(session): Extension<DashboardSession>,
    Form(form): Form<ImportForm>,
) -> Response {
    match session.import_text(&form.config, form.mode).await {
        Ok(()) => share_page(
            &session,
            StatusCode::OK,
            "",
            &[Flash::Info(format!(
                "Imported configuration; {} server(s) registered.",
                session.servers().len()
            ))],
        ),
        Err(e) => share_page(&session, e.status(), &form.config, &[Flash::Error(e.to_string())]),
    }
}

/// GET /about
pub async fn about(Extension(session): Extension<DashboardSession>) -> Html<String> {
    page(&session, "About", "/about", &pages::about())
}

/// POST /session/reset - end this session; the next request starts fresh.
pub async fn reset_session(
    State(state): State<AppState>,
    Extension(session): Extension<DashboardSession>,
    jar: CookieJar,
) -> impl IntoResponse {
    state.sessions.end(session.id()).await;
    info!(name: "session.reset", session = %session.id(), "Session reset by user");
    (forget(jar), Redirect::to("/"))
}
