//! Model Context Protocol (MCP) client adapter.
//!
//! Sessions are opened per registered server, over a child process speaking
//! MCP on stdio or over streamable HTTP:
//!
//! ```json
//! {
//!   "servers": [
//!     { "name": "time", "transport": "stdio",
//!       "command_or_url": "npx", "args": ["-y", "@mcpcentral/mcp-time"] },
//!     { "name": "search", "transport": "streamable_http",
//!       "command_or_url": "https://mcp.example.com/mcp",
//!       "env": { "Authorization": "Bearer ${SEARCH_TOKEN}" } }
//!   ]
//! }
//! ```
//!
//! # Layers
//!
//! - [`Connector`] / [`McpSession`]: the transport seam. [`RmcpConnector`] is
//!   the real implementation over `rmcp`.
//! - [`McpAdapter`]: timeouts, error mapping and logging on top of a connector.
//!
//! Tools are identified across servers as `server/tool`.

pub mod adapter;
pub mod env;
pub mod rmcp_client;
pub mod types;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::DashboardError;
use crate::registry::ServerConfig;

pub use adapter::McpAdapter;
pub use rmcp_client::RmcpConnector;
pub use types::{CallToolResult, ContentBlock, ToolDescriptor, ToolOutput, WireTool};

/// An open session with one MCP server.
#[async_trait]
pub trait McpSession: Send + Sync + fmt::Debug {
    fn server_name(&self) -> &str;

    /// `tools/list`, following pagination.
    async fn list_tools(&self) -> Result<Vec<WireTool>, DashboardError>;

    /// `tools/call`. Server-reported failures may arrive either as an error or
    /// as a result with `isError` set.
    async fn call_tool(
        &self,
        tool: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, DashboardError>;

    /// Release the transport. Calling it again is a no-op.
    async fn close(&self);
}

/// Opens [`McpSession`]s for server configurations.
#[async_trait]
pub trait Connector: Send + Sync + fmt::Debug {
    async fn connect(&self, config: &ServerConfig) -> Result<Arc<dyn McpSession>, DashboardError>;
}
