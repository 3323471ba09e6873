//! Per-user dashboard state.
//!
//! - [`DashboardSession`]: registry, open MCP sessions, per-server
//!   [`ServerStatus`], tools, run history and theme for one browser session
//! - [`SessionStore`]: creates sessions from [`SessionDefaults`] and tears
//!   them down again

mod context;
mod status;
mod store;

pub use context::{DashboardSession, DashboardView, ServerView};
pub use status::ServerStatus;
pub use store::{SessionDefaults, SessionStore};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashboardError;
    use crate::mcp::{CallToolResult, Connector, McpAdapter, McpSession, WireTool};
    use crate::registry::{ImportMode, ServerConfig, ServerRegistry};
    use async_trait::async_trait;
    use serde_json::{Map, Value, json};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Debug)]
    struct Fake {
        name: String,
    }

    #[async_trait]
    impl McpSession for Fake {
        fn server_name(&self) -> &str {
            &self.name
        }

        async fn list_tools(&self) -> Result<Vec<WireTool>, DashboardError> {
            Ok(vec![
                serde_json::from_value(json!({
                    "name": "echo",
                    "inputSchema": {
                        "type": "object",
                        "properties": { "age": { "type": "number" } },
                        "required": ["age"]
                    }
                }))
                .unwrap(),
            ])
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
            Ok(Arc::new(Fake {
                name: config.name.clone(),
            }))
        }
    }

    fn store(servers: &[&str]) -> SessionStore {
        let mut registry = ServerRegistry::new();
        for name in servers {
            registry
                .add(ServerConfig::http(*name, "http://127.0.0.1:9/mcp"))
                .unwrap();
        }
        SessionStore::new(
            McpAdapter::new(Arc::new(FakeConnector), Duration::from_secs(1), Duration::from_secs(1)),
            SessionDefaults {
                registry,
                ..SessionDefaults::default()
            },
        )
    }

    #[tokio::test]
    async fn failing_server_does_not_hide_others() {
        let session = store(&["a", "down"]).create();
        let results = session.connect_all().await;
        assert!(results[0].1.is_ok());
        assert_eq!(results[1].1.as_ref().unwrap_err().kind(), "connection");

        let catalog = session.catalog();
        assert_eq!(catalog.tools().len(), 1);
        assert_eq!(catalog.tools()[0].qualified_id(), "a/echo");
        assert_eq!(catalog.warnings()[0].server, "down");
        assert_eq!(session.status("a"), Some(ServerStatus::Ready));
        assert_eq!(session.status("down"), Some(ServerStatus::Idle));
    }

    #[tokio::test]
    async fn invoke_validates_then_records_history() {
        let session = store(&["a"]).create();
        session.connect("a").await.unwrap();

        let err = session.invoke_json("a", "echo", &json!({})).await.unwrap_err();
        assert!(matches!(err, DashboardError::Validation(ref v) if v.mentions("age")));
        assert!(session.history().is_empty());

        let run = session.invoke_json("a", "echo", &json!({ "age": "30" })).await.unwrap();
        assert_eq!(run.arguments, json!({ "age": 30 }));
        assert!(run.outcome.is_success());
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.status("a"), Some(ServerStatus::Ready));
    }

    #[tokio::test]
    async fn removing_a_server_drops_its_tools() {
        let session = store(&["a", "b"]).create();
        session.connect_all().await;
        assert_eq!(session.catalog().len(), 2);

        session.remove_server("a").await.unwrap();
        let catalog = session.refresh_tools().await;
        assert_eq!(catalog.len(), 1);
        assert!(catalog.tools().iter().all(|t| t.server_name == "b"));
        assert!(session.remove_server("a").await.is_err());
    }

    #[tokio::test]
    async fn import_disconnects_changed_servers() {
        let session = store(&["a", "b"]).create();
        session.connect_all().await;

        session
            .import_text(
                r#"{"servers":[{"name":"a","transport":"streamable_http","command_or_url":"http://127.0.0.1:9/mcp"},
                               {"name":"b","transport":"streamable_http","command_or_url":"http://127.0.0.1:10/mcp"}]}"#,
                ImportMode::Replace,
            )
            .await
            .unwrap();
        assert_eq!(session.status("a"), Some(ServerStatus::Ready));
        assert_eq!(session.status("b"), Some(ServerStatus::Idle));
    }

    #[tokio::test]
    async fn store_hands_out_sessions_by_id() {
        let store = store(&["a"]);
        let first = store.get_or_create(None);
        let again = store.get_or_create(Some(first.id()));
        assert_eq!(first.id(), again.id());

        let bogus = store.get_or_create(Some("not-a-uuid"));
        assert_ne!(bogus.id(), "not-a-uuid");
        assert_eq!(store.len(), 2);

        assert!(store.end(first.id()).await);
        assert!(!store.end(first.id()).await);
        store.shutdown().await;
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_call_still_completes_and_is_recorded() {
        let session = store(&["a"]).create();
        session.connect("a").await.unwrap();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(100),
            session.invoke("a", "slow", Map::new()),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(session.status("a"), Some(ServerStatus::Invoking));

        // The call timeout (1s) ends the detached call.
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(session.status("a"), Some(ServerStatus::Ready));
        let history = session.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].tool_name, "slow");
        assert!(!history[0].outcome.is_success());

        // Still usable afterwards.
        let again = session.invoke("a", "echo", Map::new()).await.unwrap();
        assert!(again.outcome.is_success());
        assert_eq!(session.status("a"), Some(ServerStatus::Ready));
    }
}
