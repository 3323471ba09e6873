//! The per-browser-session dashboard context.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::status::ServerStatus;
use crate::catalog::Catalog;
use crate::error::DashboardError;
use crate::execution::{self, History, InvocationResult};
use crate::forms::{self, FormValues};
use crate::mcp::{McpAdapter, McpSession, ToolDescriptor};
use crate::registry::{ImportMode, RegistryBlob, ServerConfig, ServerRegistry};
use crate::theme::Theme;

/// Everything one user works with: registry, open sessions, per-server
/// status, discovered tools, run history and theme.
///
/// Cloning is cheap and yields a handle to the same context. The internal
/// lock is only held for bookkeeping, never across a network call.
#[derive(Debug, Clone)]
pub struct DashboardSession {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    id: String,
    adapter: McpAdapter,
    last_activity: RwLock<DateTime<Utc>>,
    state: RwLock<SessionState>,
}

#[derive(Debug)]
struct SessionState {
    registry: ServerRegistry,
    servers: HashMap<String, ServerSlot>,
    history: History,
    theme: Theme,
    attempts: u64,
}

/// Connection bookkeeping for one registered server.
#[derive(Debug, Default)]
struct ServerSlot {
    status: ServerStatus,
    session: Option<Arc<dyn McpSession>>,
    tools: Vec<ToolDescriptor>,
    warning: Option<String>,
    /// Identifies the connect attempt that owns `session`; results of
    /// superseded attempts are discarded.
    attempt: u64,
    in_flight: usize,
}

impl ServerSlot {
    fn set_status(&mut self, server: &str, next: ServerStatus) {
        debug_assert!(
            self.status.can_transition(next),
            "{server}: {} -> {next}",
            self.status
        );
        debug!(server = %server, from = %self.status, to = %next, "server status changed");
        self.status = next;
    }

    /// Back to `Idle`, handing out the session to close.
    fn reset(&mut self, server: &str, warning: Option<String>) -> Option<Arc<dyn McpSession>> {
        self.set_status(server, ServerStatus::Idle);
        self.tools.clear();
        self.in_flight = 0;
        self.warning = warning;
        self.session.take()
    }
}

/// Connect result as seen by the attempt that produced it.
enum Settled {
    Current(Arc<dyn McpSession>),
    Failed(DashboardError),
    /// A later connect, disconnect or removal took over the slot.
    Superseded(Option<Arc<dyn McpSession>>),
}

/// One outstanding call; dropping it releases the server's `Invoking` state.
struct InFlight {
    context: DashboardSession,
    server: String,
    attempt: u64,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.context.end_call(&self.server, self.attempt);
    }
}

/// Server row as shown by the dashboard and the JSON API.
#[derive(Debug, Clone, Serialize)]
pub struct ServerView {
    #[serde(flatten)]
    pub config: ServerConfig,
    pub status: ServerStatus,
    pub tool_count: usize,
    pub warning: Option<String>,
}

/// Point-in-time copy of a context for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub servers: Vec<ServerView>,
    pub catalog: Catalog,
    pub history: Vec<InvocationResult>,
    pub theme: Theme,
}

impl DashboardView {
    #[must_use]
    pub fn any_connected(&self) -> bool {
        self.servers.iter().any(|s| s.status != ServerStatus::Idle)
    }
}

impl DashboardSession {
    pub(crate) fn new(
        id: String,
        adapter: McpAdapter,
        registry: ServerRegistry,
        theme: Theme,
        history_limit: usize,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id,
                adapter,
                last_activity: RwLock::new(Utc::now()),
                state: RwLock::new(SessionState {
                    registry,
                    servers: HashMap::new(),
                    history: History::new(history_limit),
                    theme,
                    attempts: 0,
                }),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.touch();
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn touch(&self) {
        *self
            .inner
            .last_activity
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Utc::now();
    }

    /// Whether nothing touched this context for longer than `timeout`.
    #[must_use]
    pub fn is_idle_for(&self, timeout: Duration) -> bool {
        let last = *self
            .inner
            .last_activity
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        (Utc::now() - last).to_std().is_ok_and(|idle| idle > timeout)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Registry
    // ─────────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn servers(&self) -> Vec<ServerConfig> {
        self.read().registry.list().to_vec()
    }

    #[must_use]
    pub fn next_default_name(&self) -> String {
        self.read().registry.next_default_name()
    }

    pub fn add_server(&self, config: ServerConfig) -> Result<(), DashboardError> {
        let name = config.name.clone();
        self.write().registry.add(config)?;
        info!(name: "registry.server.added", session = %self.id(), server = %name, "Server added");
        Ok(())
    }

    /// Remove a server, closing its session and dropping its tools.
    pub async fn remove_server(&self, name: &str) -> Result<ServerConfig, DashboardError> {
        let (config, session) = {
            let mut state = self.write();
            let config = state
                .registry
                .remove(name)
                .ok_or_else(|| DashboardError::NotFound(format!("server '{name}'")))?;
            let session = state.servers.remove(name).and_then(|mut slot| slot.session.take());
            (config, session)
        };
        if let Some(session) = session {
            self.inner.adapter.disconnect(session.as_ref()).await;
        }
        info!(name: "registry.server.removed", session = %self.id(), server = %name, "Server removed");
        Ok(config)
    }

    #[must_use]
    pub fn export(&self) -> RegistryBlob {
        self.read().registry.export()
    }

    /// Import a blob. Servers that disappear or whose configuration changes
    /// are disconnected; on error nothing changes.
    pub async fn import(&self, blob: RegistryBlob, mode: ImportMode) -> Result<(), DashboardError> {
        let stale = {
            let mut state = self.write();
            let mut next = state.registry.clone();
            next.import(blob, mode)?;

            let changed: Vec<String> = state
                .servers
                .keys()
                .filter(|name| state.registry.get(name) != next.get(name))
                .cloned()
                .collect();
            state.registry = next;
            changed
                .iter()
                .filter_map(|name| state.servers.remove(name)?.session.take())
                .collect::<Vec<_>>()
        };
        self.close_all(stale).await;
        info!(name: "registry.imported", session = %self.id(), servers = self.read().registry.len(), "Registry imported");
        Ok(())
    }

    pub async fn import_text(&self, text: &str, mode: ImportMode) -> Result<(), DashboardError> {
        self.import(RegistryBlob::parse(text)?, mode).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Connections
    // ─────────────────────────────────────────────────────────────────────

    /// Connect (or reconnect) one server and list its tools.
    pub async fn connect(&self, name: &str) -> Result<(), DashboardError> {
        let (config, attempt, previous) = {
            let mut state = self.write();
            let config = state
                .registry
                .get(name)
                .cloned()
                .ok_or_else(|| DashboardError::NotFound(format!("server '{name}'")))?;
            state.attempts += 1;
            let attempt = state.attempts;
            let slot = state.servers.entry(name.to_string()).or_default();
            let previous = slot.reset(name, None);
            slot.set_status(name, ServerStatus::Connecting);
            slot.attempt = attempt;
            (config, attempt, previous)
        };
        if let Some(previous) = previous {
            self.inner.adapter.disconnect(previous.as_ref()).await;
        }

        let connected = self.inner.adapter.connect(&config).await;
        let session = match self.settle(name, attempt, connected) {
            Settled::Current(session) => session,
            Settled::Failed(e) => return Err(e),
            Settled::Superseded(stray) => {
                if let Some(stray) = stray {
                    self.inner.adapter.disconnect(stray.as_ref()).await;
                }
                return Ok(());
            }
        };

        let listed = self.inner.adapter.list_tools(session.as_ref()).await;
        let outcome = {
            let mut state = self.write();
            match state.servers.get_mut(name).filter(|slot| slot.attempt == attempt) {
                None => Err(None),
                Some(slot) => match listed {
                    Ok(tools) => {
                        slot.tools = tools;
                        slot.set_status(name, ServerStatus::Ready);
                        Ok(())
                    }
                    Err(e) => {
                        slot.reset(name, Some(e.to_string()));
                        Err(Some(e))
                    }
                },
            }
        };
        match outcome {
            Ok(()) => Ok(()),
            Err(e) => {
                self.inner.adapter.disconnect(session.as_ref()).await;
                e.map_or(Ok(()), Err)
            }
        }
    }

    /// Record a connect result for `attempt`.
    fn settle(
        &self,
        name: &str,
        attempt: u64,
        connected: Result<Arc<dyn McpSession>, DashboardError>,
    ) -> Settled {
        let mut state = self.write();
        let Some(slot) = state.servers.get_mut(name).filter(|slot| slot.attempt == attempt) else {
            return Settled::Superseded(connected.ok());
        };
        match connected {
            Ok(session) => {
                slot.session = Some(Arc::clone(&session));
                slot.set_status(name, ServerStatus::Connected);
                slot.set_status(name, ServerStatus::Listing);
                Settled::Current(session)
            }
            Err(e) => {
                slot.reset(name, Some(e.to_string()));
                Settled::Failed(e)
            }
        }
    }

    /// Connect every registered server concurrently. One server failing
    /// leaves the others untouched.
    pub async fn connect_all(&self) -> Vec<(String, Result<(), DashboardError>)> {
        let names: Vec<String> = self.read().registry.list().iter().map(|c| c.name.clone()).collect();
        let results = join_all(names.iter().map(|name| self.connect(name))).await;
        names.into_iter().zip(results).collect()
    }

    pub async fn disconnect(&self, name: &str) -> Result<(), DashboardError> {
        let session = {
            let mut state = self.write();
            if !state.registry.contains(name) {
                return Err(DashboardError::NotFound(format!("server '{name}'")));
            }
            state.attempts += 1;
            let attempt = state.attempts;
            state.servers.get_mut(name).and_then(|slot| {
                slot.attempt = attempt;
                slot.reset(name, None)
            })
        };
        if let Some(session) = session {
            self.inner.adapter.disconnect(session.as_ref()).await;
        }
        Ok(())
    }

    /// Close every session. Used when the context is torn down.
    pub async fn disconnect_all(&self) {
        let sessions: Vec<_> = {
            let mut state = self.write();
            state
                .servers
                .drain()
                .filter_map(|(_, mut slot)| slot.session.take())
                .collect()
        };
        self.close_all(sessions).await;
    }

    async fn close_all(&self, sessions: Vec<Arc<dyn McpSession>>) {
        let adapter = &self.inner.adapter;
        join_all(sessions.iter().map(|s| adapter.disconnect(s.as_ref()))).await;
    }

    /// Re-list tools on every ready server. Servers whose listing fails
    /// return to `Idle` with a warning.
    pub async fn refresh_tools(&self) -> Catalog {
        let targets: Vec<(Arc<dyn McpSession>, u64)> = {
            let mut state = self.write();
            let order: Vec<String> = state.registry.list().iter().map(|c| c.name.clone()).collect();
            let mut targets = Vec::new();
            for name in order {
                let Some(slot) = state.servers.get_mut(&name) else {
                    continue;
                };
                if slot.status != ServerStatus::Ready {
                    continue;
                }
                if let Some(session) = slot.session.clone() {
                    slot.set_status(&name, ServerStatus::Listing);
                    targets.push((session, slot.attempt));
                }
            }
            targets
        };

        let sessions: Vec<Arc<dyn McpSession>> = targets.iter().map(|(s, _)| Arc::clone(s)).collect();
        let listed = Catalog::aggregate(&self.inner.adapter, &sessions).await;

        let failed = {
            let mut state = self.write();
            let mut failed = Vec::new();
            for (session, attempt) in &targets {
                let name = session.server_name();
                let Some(slot) = state.servers.get_mut(name).filter(|s| s.attempt == *attempt) else {
                    continue;
                };
                match listed.warnings().iter().find(|w| w.server == name) {
                    Some(warning) => failed.extend(slot.reset(name, Some(warning.message.clone()))),
                    None => {
                        slot.tools = listed
                            .tools()
                            .iter()
                            .filter(|t| t.server_name == name)
                            .cloned()
                            .collect();
                        slot.set_status(name, ServerStatus::Ready);
                    }
                }
            }
            failed
        };
        self.close_all(failed).await;
        self.catalog()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tools and runs
    // ─────────────────────────────────────────────────────────────────────

    /// Tools of every ready server in registry order, with a warning per
    /// server whose last connect or listing failed.
    #[must_use]
    pub fn catalog(&self) -> Catalog {
        Self::catalog_of(&self.read())
    }

    fn catalog_of(state: &SessionState) -> Catalog {
        let slots = || {
            state
                .registry
                .list()
                .iter()
                .filter_map(|c| Some((c.name.as_str(), state.servers.get(&c.name)?)))
        };
        let mut catalog = Catalog::from_listings(
            slots()
                .filter(|(_, slot)| slot.session.is_some())
                .map(|(name, slot)| (name.to_string(), Ok(slot.tools.clone()))),
        );
        for (name, slot) in slots() {
            if let Some(warning) = &slot.warning {
                catalog.push_warning(name, warning.clone());
            }
        }
        catalog
    }

    #[must_use]
    pub fn tool(&self, server: &str, tool: &str) -> Option<ToolDescriptor> {
        self.read()
            .servers
            .get(server)?
            .tools
            .iter()
            .find(|t| t.tool_name == tool)
            .cloned()
    }

    #[must_use]
    pub fn status(&self, server: &str) -> Option<ServerStatus> {
        let state = self.read();
        state.registry.get(server)?;
        Some(state.servers.get(server).map_or(ServerStatus::Idle, |slot| slot.status))
    }

    /// Validate submitted form values against the tool's schema, then run it.
    pub async fn invoke_form(
        &self,
        server: &str,
        tool: &str,
        values: &FormValues,
    ) -> Result<InvocationResult, DashboardError> {
        let descriptor = self.require_tool(server, tool)?;
        let payload = forms::collect(&descriptor.schema, values)?;
        self.invoke(server, tool, into_map(payload)).await
    }

    /// Validate a JSON argument object against the tool's schema, then run it.
    pub async fn invoke_json(
        &self,
        server: &str,
        tool: &str,
        arguments: &Value,
    ) -> Result<InvocationResult, DashboardError> {
        let descriptor = self.require_tool(server, tool)?;
        let payload = forms::collect_json(&descriptor.schema, arguments)?;
        self.invoke(server, tool, into_map(payload)).await
    }

    fn require_tool(&self, server: &str, tool: &str) -> Result<ToolDescriptor, DashboardError> {
        self.tool(server, tool)
            .ok_or_else(|| DashboardError::NotFound(format!("tool '{server}/{tool}'")))
    }

    /// Run a tool with already validated arguments and record the outcome.
    ///
    /// Only a missing server or session is returned as an error; failures of
    /// the call itself are part of the recorded result. The call runs on its
    /// own task: if the caller stops waiting, it still completes (bounded by
    /// the call timeout), lands in the history and returns the server to
    /// `Ready`.
    pub async fn invoke(
        &self,
        server: &str,
        tool: &str,
        arguments: Map<String, Value>,
    ) -> Result<InvocationResult, DashboardError> {
        let (session, attempt) = {
            let mut state = self.write();
            let slot = state
                .servers
                .get_mut(server)
                .ok_or_else(|| DashboardError::NotFound(format!("server '{server}' is not connected")))?;
            let session = slot
                .session
                .clone()
                .filter(|_| slot.status.accepts_calls())
                .ok_or_else(|| DashboardError::Connection {
                    server: server.to_string(),
                    message: format!("not ready ({})", slot.status),
                })?;
            if slot.in_flight == 0 {
                slot.set_status(server, ServerStatus::Invoking);
            }
            slot.in_flight += 1;
            (session, slot.attempt)
        };

        let call = InFlight {
            context: self.clone(),
            server: server.to_string(),
            attempt,
        };
        let tool_name = tool.to_string();
        let task = tokio::spawn(async move {
            let result =
                execution::run(&call.context.inner.adapter, session.as_ref(), &tool_name, arguments)
                    .await;
            call.context.write().history.record(result.clone());
            result
        });

        task.await.map_err(|e| DashboardError::ToolExecution {
            tool: tool.to_string(),
            message: format!("invocation task failed: {e}"),
        })
    }

    /// Bookkeeping when a call on `server` ends, however it ends.
    fn end_call(&self, server: &str, attempt: u64) {
        let mut state = self.write();
        if let Some(slot) = state.servers.get_mut(server).filter(|s| s.attempt == attempt) {
            slot.in_flight = slot.in_flight.saturating_sub(1);
            if slot.in_flight == 0 && slot.status == ServerStatus::Invoking {
                slot.set_status(server, ServerStatus::Ready);
            }
        }
    }

    #[must_use]
    pub fn history(&self) -> Vec<InvocationResult> {
        self.read().history.iter().cloned().collect()
    }

    pub fn clear_history(&self) {
        self.write().history.clear();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Theme and snapshots
    // ─────────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.read().theme
    }

    pub fn set_theme(&self, theme: Theme) {
        self.write().theme = theme;
    }

    #[must_use]
    pub fn view(&self) -> DashboardView {
        let state = self.read();
        let servers = state
            .registry
            .list()
            .iter()
            .map(|config| {
                let slot = state.servers.get(&config.name);
                ServerView {
                    config: config.clone(),
                    status: slot.map_or(ServerStatus::Idle, |s| s.status),
                    tool_count: slot.map_or(0, |s| s.tools.len()),
                    warning: slot.and_then(|s| s.warning.clone()),
                }
            })
            .collect();
        DashboardView {
            servers,
            catalog: Self::catalog_of(&state),
            history: state.history.iter().cloned().collect(),
            theme: state.theme,
        }
    }
}

fn into_map(payload: Value) -> Map<String, Value> {
    match payload {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
