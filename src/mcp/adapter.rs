//! Timeouts, error mapping and logging around a [`Connector`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tracing::{info, warn};

use super::types::{ToolDescriptor, ToolOutput};
use super::{Connector, McpSession};
use crate::error::DashboardError;
use crate::registry::ServerConfig;

/// Entry point for every MCP operation the dashboard performs.
#[derive(Debug, Clone)]
pub struct McpAdapter {
    connector: Arc<dyn Connector>,
    connect_timeout: Duration,
    call_timeout: Duration,
}

impl McpAdapter {
    #[must_use]
    pub fn new(connector: Arc<dyn Connector>, connect_timeout: Duration, call_timeout: Duration) -> Self {
        Self {
            connector,
            connect_timeout,
            call_timeout,
        }
    }

    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Open a session. A handshake that does not finish within the connect
    /// timeout is a connection failure.
    pub async fn connect(&self, config: &ServerConfig) -> Result<Arc<dyn McpSession>, DashboardError> {
        config.validate()?;
        let started = Instant::now();

        let result = match tokio::time::timeout(self.connect_timeout, self.connector.connect(config)).await {
            Ok(result) => result,
            Err(_) => Err(DashboardError::Connection {
                server: config.name.clone(),
                message: format!(
                    "no handshake within {}s",
                    self.connect_timeout.as_secs_f32()
                ),
            }),
        };

        match &result {
            Ok(_) => info!(
                name: "mcp.server.connected",
                server = %config.name,
                transport = %config.transport,
                elapsed_ms = started.elapsed().as_millis(),
                "MCP server connected"
            ),
            Err(e) => warn!(
                name: "mcp.server.connect_failed",
                server = %config.name,
                error = %e,
                "MCP server connection failed"
            ),
        }
        result
    }

    /// List the session's tools in server order.
    pub async fn list_tools(&self, session: &dyn McpSession) -> Result<Vec<ToolDescriptor>, DashboardError> {
        let server = session.server_name();
        let wire = tokio::time::timeout(self.call_timeout, session.list_tools())
            .await
            .map_err(|_| DashboardError::Timeout {
                operation: format!("tools/list on '{server}'"),
                after: self.call_timeout,
            })??;

        let tools = wire
            .into_iter()
            .map(|tool| ToolDescriptor::from_wire(server, tool))
            .collect::<Result<Vec<_>, _>>()?;

        for tool in &tools {
            info!(name: "mcp.tool.discovered", tool = %tool.qualified_id(), "MCP tool discovered");
        }
        Ok(tools)
    }

    /// One `tools/call` round trip. On timeout only the local wait stops; the
    /// session stays usable.
    pub async fn invoke(
        &self,
        session: &dyn McpSession,
        tool: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, DashboardError> {
        let server = session.server_name();
        let started = Instant::now();

        let result = match tokio::time::timeout(self.call_timeout, session.call_tool(tool, arguments)).await {
            Ok(Ok(result)) => result.into_output(tool),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(DashboardError::Timeout {
                operation: format!("tool '{tool}' on '{server}'"),
                after: self.call_timeout,
            }),
        };

        info!(
            name: "mcp.tool.invoked",
            server = %server,
            tool = %tool,
            ok = result.is_ok(),
            elapsed_ms = started.elapsed().as_millis(),
            "MCP tool invoked"
        );
        result
    }

    pub async fn disconnect(&self, session: &dyn McpSession) {
        session.close().await;
        info!(name: "mcp.server.disconnected", server = %session.server_name(), "MCP server disconnected");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::types::{CallToolResult, WireTool};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct SlowSession {
        closes: AtomicUsize,
    }

    #[async_trait]
    impl McpSession for SlowSession {
        fn server_name(&self) -> &str {
            "slow"
        }

        async fn list_tools(&self) -> Result<Vec<WireTool>, DashboardError> {
            Ok(vec![serde_json::from_value(json!({ "name": "sleep" })).unwrap()])
        }

        async fn call_tool(
            &self,
            tool: &str,
            _arguments: Map<String, Value>,
        ) -> Result<CallToolResult, DashboardError> {
            if tool == "sleep" {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(CallToolResult::text("done"))
        }

        async fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Debug)]
    struct NeverConnects;

    #[async_trait]
    impl Connector for NeverConnects {
        async fn connect(&self, _config: &ServerConfig) -> Result<Arc<dyn McpSession>, DashboardError> {
            std::future::pending().await
        }
    }

    fn adapter(connector: Arc<dyn Connector>) -> McpAdapter {
        McpAdapter::new(connector, Duration::from_secs(2), Duration::from_secs(5))
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_handshake_is_a_connection_error() {
        let err = adapter(Arc::new(NeverConnects))
            .connect(&ServerConfig::http("b", "http://127.0.0.1:1/mcp"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "connection");
    }

    #[tokio::test(start_paused = true)]
    async fn invoke_timeout_then_disconnect() {
        let adapter = adapter(Arc::new(NeverConnects));
        let session = SlowSession::default();

        let err = adapter.invoke(&session, "sleep", Map::new()).await.unwrap_err();
        assert!(matches!(err, DashboardError::Timeout { after, .. } if after == Duration::from_secs(5)));

        let output = adapter.invoke(&session, "echo", Map::new()).await.unwrap();
        assert_eq!(output.content.len(), 1);

        adapter.disconnect(&session).await;
        adapter.disconnect(&session).await;
        assert_eq!(session.closes.load(Ordering::SeqCst), 2);
    }
}
