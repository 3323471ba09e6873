//! Tool catalog: every connected server's tools in one listing.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;

use crate::error::DashboardError;
use crate::mcp::{McpAdapter, McpSession, ToolDescriptor};

/// A server whose tools are missing from the catalog, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogWarning {
    pub server: String,
    pub message: String,
}

/// Tools ordered by server (registry order), then by server tool order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Catalog {
    tools: Vec<ToolDescriptor>,
    warnings: Vec<CatalogWarning>,
}

impl Catalog {
    /// List tools on every session concurrently. A failing server is left out
    /// and reported as a warning; the others are unaffected.
    pub async fn aggregate(adapter: &McpAdapter, sessions: &[Arc<dyn McpSession>]) -> Self {
        let listings = join_all(sessions.iter().map(|s| async move {
            (s.server_name().to_string(), adapter.list_tools(s.as_ref()).await)
        }))
        .await;
        Self::from_listings(listings)
    }

    /// Build from per-server listing outcomes, keeping their order.
    pub fn from_listings<I>(listings: I) -> Self
    where
        I: IntoIterator<Item = (String, Result<Vec<ToolDescriptor>, DashboardError>)>,
    {
        let mut catalog = Self::default();
        for (server, listing) in listings {
            match listing {
                Ok(tools) => catalog.tools.extend(tools),
                Err(e) => catalog.warnings.push(CatalogWarning {
                    server,
                    message: e.to_string(),
                }),
            }
        }
        catalog
    }

    pub fn push_warning(&mut self, server: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(CatalogWarning {
            server: server.into(),
            message: message.into(),
        });
    }

    #[must_use]
    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    #[must_use]
    pub fn warnings(&self) -> &[CatalogWarning] {
        &self.warnings
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool(server: &str, name: &str) -> ToolDescriptor {
        ToolDescriptor::from_wire(
            server,
            serde_json::from_value(json!({ "name": name, "inputSchema": { "type": "object" } })).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn same_tool_on_two_servers_gives_two_entries() {
        let catalog = Catalog::from_listings([
            ("a".to_string(), Ok(vec![tool("a", "search"), tool("a", "fetch")])),
            (
                "b".to_string(),
                Err(DashboardError::Connection {
                    server: "b".into(),
                    message: "refused".into(),
                }),
            ),
            ("c".to_string(), Ok(vec![tool("c", "search")])),
        ]);

        let ids: Vec<String> = catalog.tools().iter().map(ToolDescriptor::qualified_id).collect();
        assert_eq!(ids, ["a/search", "a/fetch", "c/search"]);
        assert_eq!(catalog.warnings().len(), 1);
        assert_eq!(catalog.warnings()[0].server, "b");
        assert!(catalog.tools().iter().all(|t| t.server_name != "b"));
    }
}
