//! [`Connector`] over the `rmcp` client.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rmcp::{
    model::CallToolRequestParam,
    service::{DynService, Peer, RoleClient, RunningService, ServiceError, ServiceExt},
    transport::{
        StreamableHttpClientTransport, TokioChildProcess,
        streamable_http_client::StreamableHttpClientTransportConfig,
    },
};
use serde_json::{Map, Value};
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::debug;

use super::env::{expand_map, expand_placeholders};
use super::types::{CallToolResult, WireTool};
use super::{Connector, McpSession};
use crate::error::DashboardError;
use crate::registry::{ServerConfig, Transport};

type DynClientService = RunningService<RoleClient, Box<dyn DynService<RoleClient>>>;

/// Connects over stdio child processes or streamable HTTP.
#[derive(Debug, Clone, Copy, Default)]
pub struct RmcpConnector;

impl RmcpConnector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    async fn serve_stdio(config: &ServerConfig) -> Result<DynClientService, DashboardError> {
        let fail = |message: String| DashboardError::Connection {
            server: config.name.clone(),
            message,
        };

        // A bare command line ("uvx my-server --flag") is split on whitespace.
        let (program, args) = if config.args.is_empty() {
            let mut parts = config.command_or_url.split_whitespace().map(str::to_string);
            let program = parts.next().unwrap_or_default();
            (program, parts.collect::<Vec<_>>())
        } else {
            (config.command_or_url.trim().to_string(), config.args.clone())
        };
        if program.is_empty() {
            return Err(fail("empty command".to_string()));
        }

        let mut cmd = Command::new(&program);
        cmd.args(args.iter().map(String::as_str).map(expand_placeholders));
        for (k, v) in expand_map(&config.env) {
            cmd.env(k, v);
        }

        let transport =
            TokioChildProcess::new(cmd).map_err(|e| fail(format!("failed to spawn '{program}': {e}")))?;

        ().into_dyn()
            .serve(transport)
            .await
            .map_err(|e| fail(format!("handshake failed: {e}")))
    }

    async fn serve_http(config: &ServerConfig) -> Result<DynClientService, DashboardError> {
        let fail = |message: String| DashboardError::Connection {
            server: config.name.clone(),
            message,
        };

        let url = url::Url::parse(config.command_or_url.trim())
            .map_err(|e| fail(format!("invalid url '{}': {e}", config.command_or_url)))?;

        let mut headers = HeaderMap::new();
        for (k, v) in expand_map(&config.env) {
            let name = HeaderName::from_bytes(k.as_bytes())
                .map_err(|e| fail(format!("invalid header name '{k}': {e}")))?;
            let value =
                HeaderValue::from_str(&v).map_err(|e| fail(format!("invalid value for header '{k}': {e}")))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| fail(format!("failed to build http client: {e}")))?;

        let transport = StreamableHttpClientTransport::with_client(
            client,
            StreamableHttpClientTransportConfig::with_uri(url.to_string()),
        );

        ().into_dyn()
            .serve(transport)
            .await
            .map_err(|e| fail(format!("handshake failed: {e}")))
    }
}

#[async_trait]
impl Connector for RmcpConnector {
    async fn connect(&self, config: &ServerConfig) -> Result<Arc<dyn McpSession>, DashboardError> {
        let service = match config.transport {
            Transport::Stdio => Self::serve_stdio(config).await?,
            Transport::StreamableHttp => Self::serve_http(config).await?,
        };
        let peer = service.peer().clone();
        Ok(Arc::new(RmcpSession {
            server: config.name.clone(),
            peer,
            service: Mutex::new(Some(service)),
        }))
    }
}

/// Running `rmcp` client service for one server.
pub struct RmcpSession {
    server: String,
    peer: Peer<RoleClient>,
    service: Mutex<Option<DynClientService>>,
}

impl fmt::Debug for RmcpSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RmcpSession")
            .field("server", &self.server)
            .finish_non_exhaustive()
    }
}

impl RmcpSession {
    async fn ensure_open(&self) -> Result<(), DashboardError> {
        if self.service.lock().await.is_some() {
            Ok(())
        } else {
            Err(DashboardError::Connection {
                server: self.server.clone(),
                message: "session is closed".to_string(),
            })
        }
    }

    fn protocol(&self, message: impl fmt::Display) -> DashboardError {
        DashboardError::Protocol {
            server: self.server.clone(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl McpSession for RmcpSession {
    fn server_name(&self) -> &str {
        &self.server
    }

    async fn list_tools(&self) -> Result<Vec<WireTool>, DashboardError> {
        self.ensure_open().await?;
        let tools = self
            .peer
            .list_all_tools()
            .await
            .map_err(|e| self.protocol(format!("tools/list failed: {e}")))?;

        tools
            .into_iter()
            .map(|tool| {
                serde_json::to_value(tool)
                    .and_then(serde_json::from_value::<WireTool>)
                    .map_err(|e| self.protocol(format!("malformed tool descriptor: {e}")))
            })
            .collect()
    }

    async fn call_tool(
        &self,
        tool: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, DashboardError> {
        self.ensure_open().await?;
        let result = self
            .peer
            .call_tool(CallToolRequestParam {
                name: tool.to_string().into(),
                arguments: Some(arguments),
            })
            .await
            .map_err(|e| match e {
                ServiceError::McpError(data) => DashboardError::ToolExecution {
                    tool: tool.to_string(),
                    message: data.message.to_string(),
                },
                other => self.protocol(format!("tools/call failed: {other}")),
            })?;

        serde_json::to_value(result)
            .and_then(serde_json::from_value::<CallToolResult>)
            .map_err(|e| self.protocol(format!("malformed tools/call result: {e}")))
    }

    async fn close(&self) {
        let service = self.service.lock().await.take();
        if let Some(service) = service {
            if let Err(e) = service.cancel().await {
                debug!(server = %self.server, error = %e, "MCP service task ended abnormally");
            }
        }
    }
}
