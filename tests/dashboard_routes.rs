use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use mcp_dashboard::AppState;
use mcp_dashboard::config::{AppConfig, HttpConfig, LoggingConfig, McpConfig, UiConfig};
use mcp_dashboard::dashboard::{SessionDefaults, SessionStore};
use mcp_dashboard::error::DashboardError;
use mcp_dashboard::mcp::{CallToolResult, Connector, McpAdapter, McpSession, WireTool};
use mcp_dashboard::registry::{ServerConfig, ServerRegistry};
use mcp_dashboard::server::{SESSION_COOKIE, build_router};
use mcp_dashboard::theme::ThemeMode;
use serde_json::{Map, Value, json};
use tower::ServiceExt;

#[derive(Debug)]
struct FakeSession {
    name: String,
}

#[async_trait]
impl McpSession for FakeSession {
    fn server_name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<WireTool>, DashboardError> {
        let tools = json!([
            {
                "name": "echo",
                "description": "Echo the arguments back",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "age": { "type": "number" },
                        "tags": { "type": "array", "items": { "type": "string" } }
                    },
                    "required": ["age"]
                }
            },
            { "name": "slow", "inputSchema": { "type": "object", "properties": {} } }
        ]);
        Ok(serde_json::from_value(tools).expect("tool list"))
    }

    async fn call_tool(
        &self,
        tool: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, DashboardError> {
        if tool == "slow" {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Ok(CallToolResult::text(Value::Object(arguments).to_string()))
    }

    async fn close(&self) {}
}

/// Connects everything except servers named `down`.
#[derive(Debug)]
struct FakeConnector;

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, config: &ServerConfig) -> Result<Arc<dyn McpSession>, DashboardError> {
        if config.name == "down" {
            return Err(DashboardError::Connection {
                server: config.name.clone(),
                message: "connection refused".into(),
            });
        }
        Ok(Arc::new(FakeSession {
            name: config.name.clone(),
        }))
    }
}

fn app(servers: &[&str]) -> Router {
    let config = AppConfig {
        server: HttpConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            request_timeout_secs: 120,
        },
        mcp: McpConfig {
            servers_file: None,
            connect_timeout_secs: 1,
            call_timeout_secs: 2,
        },
        ui: UiConfig {
            theme: ThemeMode::Light,
            button_color: "#4CAF50".parse().unwrap(),
            history_limit: 10,
            session_idle_secs: 3600,
        },
        logging: LoggingConfig { json: false },
    };

    let mut registry = ServerRegistry::new();
    for name in servers {
        registry
            .add(ServerConfig::http(*name, "http://127.0.0.1:9/mcp"))
            .unwrap();
    }
    let adapter = McpAdapter::new(
        Arc::new(FakeConnector),
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
    build_router(AppState {
        sessions,
        config: Arc::new(config),
    })
}

struct Reply {
    status: StatusCode,
    set_cookie: Option<String>,
    body: String,
}

impl Reply {
    fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

async fn send(app: &Router, req: Request<Body>) -> Reply {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let set_cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    Reply {
        status,
        set_cookie,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

/// Open a session and return its `Cookie` header value.
async fn start_session(app: &Router) -> String {
    let reply = send(app, Request::get("/").body(Body::empty()).unwrap()).await;
    let set_cookie = reply.set_cookie.expect("session cookie");
    set_cookie.split(';').next().unwrap().to_string()
}

fn get(uri: &str, cookie: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

fn post_form(uri: &str, cookie: &str, form: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

fn post_json(uri: &str, cookie: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn connected(app: &Router) -> String {
    let cookie = start_session(app).await;
    let reply = send(app, post_form("/connect", &cookie, "")).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    cookie
}

#[tokio::test]
async fn new_visitor_gets_cookie_and_connect_screen() {
    let app = app(&["a"]);
    let reply = send(&app, Request::get("/").body(Body::empty()).unwrap()).await;

    assert_eq!(reply.status, StatusCode::OK);
    let cookie = reply.set_cookie.expect("cookie set");
    assert!(cookie.starts_with(&format!("{SESSION_COOKIE}=")));
    assert!(cookie.contains("HttpOnly"));
    assert!(reply.body.contains("Connect to MCP servers"));

    // The cookie is only set once.
    let cookie = cookie.split(';').next().unwrap().to_string();
    let again = send(&app, get("/", &cookie)).await;
    assert!(again.set_cookie.is_none());
}

#[tokio::test]
async fn healthz_needs_no_session() {
    let app = app(&[]);
    let reply = send(&app, Request::get("/healthz").body(Body::empty()).unwrap()).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.set_cookie.is_none());
    assert_eq!(reply.json()["status"], "ok");
}

#[tokio::test]
async fn failing_server_is_reported_without_hiding_others() {
    let app = app(&["a", "down"]);
    let cookie = connected(&app).await;

    let page = send(&app, get("/", &cookie)).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("/tools/a/echo"));
    assert!(page.body.contains("connection refused"));

    let tools = send(&app, get("/api/tools", &cookie)).await.json();
    assert_eq!(tools["tools"].as_array().unwrap().len(), 2);
    assert_eq!(tools["warnings"][0]["server"], "down");

    let servers = send(&app, get("/api/servers", &cookie)).await.json();
    assert_eq!(servers[0]["status"], "ready");
    assert_eq!(servers[0]["tool_count"], 2);
    assert_eq!(servers[1]["status"], "idle");
}

#[tokio::test]
async fn sessions_do_not_share_state() {
    let app = app(&["a"]);
    let first = connected(&app).await;
    let second = start_session(&app).await;
    assert_ne!(first, second);

    let servers = send(&app, get("/api/servers", &second)).await.json();
    assert_eq!(servers[0]["status"], "idle");
}

#[tokio::test]
async fn invalid_form_is_rejected_before_the_call() {
    let app = app(&["a"]);
    let cookie = connected(&app).await;

    let reply = send(&app, post_form("/tools/a/echo", &cookie, "age=abc")).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(reply.body.contains("age"));

    let history = send(&app, get("/api/history", &cookie)).await.json();
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn form_run_shows_result_and_records_history() {
    let app = app(&["a"]);
    let cookie = connected(&app).await;

    let form = send(&app, get("/tools/a/echo", &cookie)).await;
    assert_eq!(form.status, StatusCode::OK);
    assert!(form.body.contains("Echo the arguments back"));

    let reply = send(&app, post_form("/tools/a/echo", &cookie, "age=42")).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("&quot;age&quot;: 42"));

    let history = send(&app, get("/api/history", &cookie)).await.json();
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["tool_name"], "echo");
    assert_eq!(history[0]["outcome"]["status"], "success");
}

#[tokio::test]
async fn json_invoke_validates_and_runs() {
    let app = app(&["a"]);
    let cookie = connected(&app).await;

    let missing = send(
        &app,
        post_json("/api/tools/a/echo/invoke", &cookie, &json!({})),
    )
    .await;
    assert_eq!(missing.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(missing.json()["validation"]["missing"][0], "age");

    let ok = send(
        &app,
        post_json(
            "/api/tools/a/echo/invoke",
            &cookie,
            &json!({ "age": 7, "tags": ["x"], "ignored": true }),
        ),
    )
    .await;
    assert_eq!(ok.status, StatusCode::OK);
    let run = ok.json();
    assert_eq!(run["arguments"], json!({ "age": 7, "tags": ["x"] }));
    assert_eq!(run["outcome"]["status"], "success");

    let unknown = send(
        &app,
        post_json("/api/tools/a/nope/invoke", &cookie, &json!({})),
    )
    .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test(start_paused = true)]
async fn timed_out_call_answers_504_and_server_can_still_disconnect() {
    let app = app(&["a"]);
    let cookie = connected(&app).await;

    let reply = send(
        &app,
        post_json("/api/tools/a/slow/invoke", &cookie, &json!({})),
    )
    .await;
    assert_eq!(reply.status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(reply.json()["outcome"]["kind"], "timeout");

    let servers = send(&app, get("/api/servers", &cookie)).await.json();
    assert_eq!(servers[0]["status"], "ready");

    let disconnected = send(&app, post_json("/api/servers/a/disconnect", &cookie, &json!({}))).await;
    assert_eq!(disconnected.status, StatusCode::OK);
    assert_eq!(disconnected.json()["status"], "idle");
}

#[tokio::test]
async fn removing_a_server_drops_its_tools() {
    let app = app(&["a", "b"]);
    let cookie = connected(&app).await;

    let reply = send(
        &app,
        Request::delete("/api/servers/a")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);

    let tools = send(&app, get("/api/tools", &cookie)).await.json();
    let tools = tools["tools"].as_array().unwrap();
    assert!(tools.iter().all(|t| t["server_name"] == "b"));
    assert_eq!(tools.len(), 2);

    let again = send(&app, post_form("/servers/a/remove", &cookie, "")).await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_server_name_conflicts() {
    let app = app(&["a"]);
    let cookie = start_session(&app).await;

    let reply = send(
        &app,
        post_json(
            "/api/servers",
            &cookie,
            &json!({ "name": "a", "transport": "streamable_http", "command_or_url": "http://x/mcp" }),
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.json()["type"], "duplicate_name");

    let form = send(
        &app,
        post_form(
            "/servers",
            &cookie,
            "name=a&transport=streamable_http&command_or_url=http%3A%2F%2Fx%2Fmcp",
        ),
    )
    .await;
    assert_eq!(form.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn blank_name_gets_the_next_default() {
    let app = app(&["server_1"]);
    let cookie = start_session(&app).await;

    let reply = send(
        &app,
        post_form(
            "/servers",
            &cookie,
            "name=&transport=stdio&command_or_url=uvx&args=mcp-server-time%0A--local&env=TZ%3DUTC",
        ),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);

    let servers = send(&app, get("/api/servers", &cookie)).await.json();
    assert_eq!(servers[1]["name"], "server_2");
    assert_eq!(servers[1]["transport"], "stdio");
    assert_eq!(servers[1]["args"], json!(["mcp-server-time", "--local"]));
    assert_eq!(servers[1]["env"], json!({ "TZ": "UTC" }));
}

#[tokio::test]
async fn config_exports_and_imports_between_sessions() {
    let app = app(&["a", "b"]);
    let source = start_session(&app).await;
    let exported = send(&app, get("/api/config", &source)).await;
    assert_eq!(exported.status, StatusCode::OK);

    let target = start_session(&app).await;
    send(
        &app,
        Request::delete("/api/servers/a")
            .header(header::COOKIE, &target)
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    let imported = send(
        &app,
        Request::post("/api/config?mode=replace")
            .header(header::COOKIE, &target)
            .body(Body::from(exported.body.clone()))
            .unwrap(),
    )
    .await;
    assert_eq!(imported.status, StatusCode::OK);
    assert_eq!(imported.json()["servers"], 2);

    let again = send(&app, get("/api/config", &target)).await;
    assert_eq!(again.json(), exported.json());

    let broken = send(
        &app,
        Request::post("/api/config")
            .header(header::COOKIE, &target)
            .body(Body::from("{ not: [valid"))
            .unwrap(),
    )
    .await;
    assert_eq!(broken.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn settings_change_the_theme() {
    let app = app(&[]);
    let cookie = start_session(&app).await;

    let reply = send(
        &app,
        post_form("/settings", &cookie, "mode=dark&button_color=%23ff0000"),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);

    let page = send(&app, get("/about", &cookie)).await;
    assert!(page.body.contains(r#"data-theme="dark""#));
    assert!(page.body.contains("#ff0000"));

    let bad = send(
        &app,
        post_form("/settings", &cookie, "mode=dark&button_color=red"),
    )
    .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reset_forgets_the_session() {
    let app = app(&["a"]);
    let cookie = connected(&app).await;

    let reply = send(&app, post_form("/session/reset", &cookie, "")).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert!(
        reply
            .set_cookie
            .expect("removal cookie")
            .starts_with(&format!("{SESSION_COOKIE}="))
    );

    // The old cookie now gets a fresh, unconnected session.
    let page = send(&app, get("/", &cookie)).await;
    assert!(page.body.contains("Connect to MCP servers"));
}
