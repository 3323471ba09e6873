//! Page bodies for each screen.

use std::fmt::Write as _;

use serde::Deserialize;

use super::form::{controls, field_table};
use super::html::{escape, notice, path, post_button, status_badge};
use super::results::{history_list, result_card};
use crate::dashboard::{DashboardView, ServerStatus};
use crate::error::ValidationError;
use crate::execution::InvocationResult;
use crate::forms::{FormValues, render};
use crate::mcp::ToolDescriptor;
use crate::registry::{ServerConfig, Transport};
use crate::theme::{Theme, ThemeMode};

/// Message shown above a page's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flash {
    Info(String),
    Warning(String),
    Error(String),
}

impl Flash {
    fn render(&self) -> String {
        match self {
            Self::Info(m) => notice("info", m),
            Self::Warning(m) => notice("warning", m),
            Self::Error(m) => notice("error", m),
        }
    }
}

fn flashes(items: &[Flash]) -> String {
    items.iter().map(Flash::render).collect()
}

/// The selected tool with its form state.
#[derive(Debug)]
pub struct ToolPanel<'a> {
    pub tool: &'a ToolDescriptor,
    pub values: &'a FormValues,
    pub errors: Option<&'a ValidationError>,
    pub result: Option<&'a InvocationResult>,
}

/// `/`: connect screen until something is connected, then the tool browser.
#[must_use]
pub fn dashboard(view: &DashboardView, panel: Option<&ToolPanel<'_>>, messages: &[Flash]) -> String {
    let mut out = flashes(messages);
    for warning in view.catalog.warnings() {
        out.push_str(&notice(
            "warning",
            &format!("{}: {}", warning.server, warning.message),
        ));
    }

    if !view.any_connected() {
        out.push_str(&connect_screen(view));
        return out;
    }

    let _ = write!(
        out,
        r#"<div class="layout"><aside>{}</aside><section>"#,
        sidebar(view, panel.map(|p| p.tool))
    );

    if view.catalog.is_empty() {
        if view.servers.iter().any(|s| s.status.is_busy()) {
            out.push_str(&notice("info", "Servers are still connecting."));
        } else {
            out.push_str(&notice(
                "error",
                "No tools found. Check that the servers are running and expose tools.",
            ));
        }
    }

    match panel {
        Some(panel) => out.push_str(&tool_panel(panel)),
        None if !view.catalog.is_empty() => out.push_str(
            r#"<div class="card"><p class="muted">Pick a tool on the left to see its inputs.</p></div>"#,
        ),
        None => {}
    }

    let _ = write!(
        out,
        r#"<div class="card"><h3>History</h3>{}{}</div></section></div>"#,
        if view.history.is_empty() {
            String::new()
        } else {
            post_button("/history/clear", "Clear history", "secondary", false)
        },
        history_list(&view.history)
    );
    out
}

fn connect_screen(view: &DashboardView) -> String {
    let rows: String = view
        .servers
        .iter()
        .map(|s| {
            format!(
                "<tr><td>{}</td><td>{}</td><td><code>{}</code></td></tr>",
                escape(&s.config.name),
                s.config.transport,
                escape(&s.config.endpoint_label())
            )
        })
        .collect();

    if view.servers.is_empty() {
        return r#"<div class="card"><h2>Connect to MCP servers</h2>
<p>No servers are configured. <a href="/servers">Add a server</a> or <a href="/share">import a configuration</a>.</p></div>"#
            .to_string();
    }

    format!(
        r#"<div class="card"><h2>Connect to MCP servers</h2>
<table><thead><tr><th>Name</th><th>Transport</th><th>Endpoint</th></tr></thead><tbody>{rows}</tbody></table>
<p>{} <a href="/servers">Manage servers</a></p></div>"#,
        post_button("/connect", "Connect", "", true)
    )
}

fn sidebar(view: &DashboardView, selected: Option<&ToolDescriptor>) -> String {
    let mut out = String::from(r#"<div class="card"><h3>Servers</h3>"#);
    for server in &view.servers {
        let name = &server.config.name;
        let action = if server.status == ServerStatus::Idle {
            post_button(&path(&["servers", name, "connect"]), "Connect", "link", true)
        } else {
            post_button(&path(&["servers", name, "disconnect"]), "Disconnect", "link", false)
        };
        let _ = write!(
            out,
            "<p><strong>{}</strong> {} <br><span class=\"muted\">{} tools</span> · {action}</p>",
            escape(name),
            status_badge(server.status),
            server.tool_count
        );
    }
    let _ = write!(
        out,
        "<p>{} {}</p></div>",
        post_button("/refresh", "Refresh tools", "secondary", true),
        post_button("/disconnect", "Disconnect all", "secondary", false)
    );

    out.push_str(r#"<div class="card tool-list"><h3>Tools</h3>"#);
    let mut current_server: Option<&str> = None;
    for tool in view.catalog.tools() {
        if current_server != Some(tool.server_name.as_str()) {
            let _ = write!(out, r#"<p class="muted">{}</p>"#, escape(&tool.server_name));
            current_server = Some(&tool.server_name);
        }
        let class = if selected.is_some_and(|s| s.qualified_id() == tool.qualified_id()) {
            " class=\"selected\""
        } else {
            ""
        };
        let _ = write!(
            out,
            r#"<a href="{}"{class}>{}</a>"#,
            path(&["tools", &tool.server_name, &tool.tool_name]),
            escape(tool.display_name())
        );
    }
    out.push_str("</div>");
    out
}

fn tool_panel(panel: &ToolPanel<'_>) -> String {
    let tool = panel.tool;
    let action = path(&["tools", &tool.server_name, &tool.tool_name]);
    let description = tool
        .description
        .as_deref()
        .map(|d| format!("<p>{}</p>", escape(d)))
        .unwrap_or_default();
    let errors = panel
        .errors
        .map(|e| notice("error", &e.to_string()))
        .unwrap_or_default();
    let widgets = render(&tool.schema, panel.values);
    let result = panel.result.map(result_card).unwrap_or_default();

    format!(
        r#"<div class="card"><h2>{}</h2><p class="muted">{}</p>{description}
<details><summary>Input fields</summary>{}</details>
{errors}<form method="post" action="{action}" data-busy>{}<p><button type="submit">Run tool</button></p></form></div>{result}"#,
        escape(tool.display_name()),
        escape(&tool.qualified_id()),
        field_table(&tool.schema),
        controls(&widgets, panel.errors)
    )
}

/// Values of the add-server form, kept when re-rendering after an error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerDraft {
    pub name: String,
    pub transport: String,
    pub command_or_url: String,
    pub args: String,
    pub env: String,
}

/// `/servers`: registered servers and the add form.
#[must_use]
pub fn servers(view: &DashboardView, draft: &ServerDraft, next_name: &str, messages: &[Flash]) -> String {
    let mut out = flashes(messages);
    out.push_str(r#"<div class="card"><h2>Servers</h2>"#);
    if view.servers.is_empty() {
        out.push_str(r#"<p class="muted">No servers configured.</p>"#);
    } else {
        out.push_str("<table><thead><tr><th>Name</th><th>Transport</th><th>Endpoint</th><th>Status</th><th></th></tr></thead><tbody>");
        for server in &view.servers {
            let _ = write!(
                out,
                "<tr><td>{}</td><td>{}</td><td><code>{}</code>{}</td><td>{}</td><td>{}</td></tr>",
                escape(&server.config.name),
                server.config.transport,
                escape(&server.config.endpoint_label()),
                env_summary(&server.config),
                status_badge(server.status),
                post_button(&path(&["servers", &server.config.name, "remove"]), "Remove", "link", false)
            );
        }
        out.push_str("</tbody></table>");
    }
    out.push_str("</div>");

    let transport = if draft.transport.is_empty() {
        Transport::default().as_str()
    } else {
        draft.transport.as_str()
    };
    let options: String = Transport::ALL
        .iter()
        .map(|t| {
            let selected = if t.as_str() == transport { " selected" } else { "" };
            format!(r#"<option value="{t}"{selected}>{t}</option>"#)
        })
        .collect();

    let _ = write!(
        out,
        r#"<div class="card"><h3>Add a server</h3><form method="post" action="/servers">
<label for="name">Name</label><input type="text" id="name" name="name" placeholder="{}" value="{}">
<label for="transport">Transport</label><select id="transport" name="transport">{options}</select>
<label for="command_or_url">URL or command</label><input type="text" id="command_or_url" name="command_or_url" placeholder="http://127.0.0.1:8000/mcp" value="{}">
<label for="args">Arguments (stdio, one per line)</label><textarea id="args" name="args">{}</textarea>
<label for="env">Environment (stdio) or headers (HTTP), one KEY=VALUE per line</label><textarea id="env" name="env">{}</textarea>
<p><button type="submit">Add server</button></p></form></div>"#,
        escape(next_name),
        escape(&draft.name),
        escape(&draft.command_or_url),
        escape(&draft.args),
        escape(&draft.env)
    );
    out
}

fn env_summary(config: &ServerConfig) -> String {
    if config.env.is_empty() {
        return String::new();
    }
    let keys: Vec<String> = config.env.keys().map(|k| escape(k)).collect();
    format!(r#"<br><span class="muted">{}</span>"#, keys.join(", "))
}

/// `/settings`: theme mode and button color.
#[must_use]
pub fn settings(theme: &Theme, messages: &[Flash]) -> String {
    let options: String = [ThemeMode::Light, ThemeMode::Dark]
        .iter()
        .map(|m| {
            let selected = if *m == theme.mode { " selected" } else { "" };
            format!(r#"<option value="{m}"{selected}>{m}</option>"#)
        })
        .collect();
    format!(
        r#"{}<div class="card"><h2>Settings</h2><form method="post" action="/settings">
<label for="mode">Theme</label><select id="mode" name="mode">{options}</select>
<label for="button_color">Button color</label><input type="color" id="button_color" name="button_color" value="{}">
<p><button type="submit">Save</button></p></form>
<h3>Session</h3><p class="muted">Disconnect every server and start again from the default configuration.</p>
{}</div>"#,
        flashes(messages),
        theme.button_color,
        post_button("/session/reset", "Reset session", "secondary", false)
    )
}

/// `/share`: export the registry and import one.
#[must_use]
pub fn share(export_json: &str, draft: &str, messages: &[Flash]) -> String {
    format!(
        r#"{}<div class="card"><h2>Share configuration</h2>
<p class="muted">Copy this configuration to reproduce the server list elsewhere.</p>
<pre>{}</pre><p><a class="button" href="/api/config" download="mcp-dashboard.json">Download</a></p></div>
<div class="card"><h3>Import</h3><form method="post" action="/share">
<label for="config">Configuration (JSON or YAML; <code>mcpServers</code> files are accepted)</label>
<textarea id="config" name="config">{}</textarea>
<label for="mode">Mode</label><select id="mode" name="mode"><option value="replace">Replace current servers</option><option value="merge">Merge into current servers</option></select>
<p><button type="submit">Import</button></p></form></div>"#,
        flashes(messages),
        escape(export_json),
        escape(draft)
    )
}

/// `/about`.
#[must_use]
pub fn about() -> String {
    format!(
        r#"<div class="card"><h2>About</h2>
<p>MCP Dashboard connects to Model Context Protocol servers, lists the tools they expose and builds a form for each tool from its input schema.</p>
<ul>
<li>Servers are reached over <code>streamable_http</code> or by spawning a <code>stdio</code> process.</li>
<li>Inputs are validated against the tool's schema before anything is sent.</li>
<li>Results show text, JSON and structured content; every run is kept in the session history.</li>
<li>The server list can be shared as a JSON configuration.</li>
</ul>
<p class="muted">Version {}</p></div>"#,
        env!("CARGO_PKG_VERSION")
    )
}
