//! Tool runs and the per-session result history.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::DashboardError;
use crate::mcp::{McpAdapter, McpSession, ToolOutput};

/// How a run ended.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success { output: ToolOutput },
    Error { kind: &'static str, message: String },
}

impl Outcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl From<Result<ToolOutput, DashboardError>> for Outcome {
    fn from(result: Result<ToolOutput, DashboardError>) -> Self {
        match result {
            Ok(output) => Self::Success { output },
            Err(e) => Self::Error {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }
}

/// One recorded tool run.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationResult {
    pub id: Uuid,
    pub server_name: String,
    pub tool_name: String,
    pub arguments: Value,
    pub outcome: Outcome,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

fn as_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

/// Invoke `tool` on `session` and record the outcome, whatever it is.
pub async fn run(
    adapter: &McpAdapter,
    session: &dyn McpSession,
    tool: &str,
    arguments: Map<String, Value>,
) -> InvocationResult {
    let timestamp = Utc::now();
    let started = Instant::now();
    let recorded = Value::Object(arguments.clone());
    let result = adapter.invoke(session, tool, arguments).await;

    InvocationResult {
        id: Uuid::new_v4(),
        server_name: session.server_name().to_string(),
        tool_name: tool.to_string(),
        arguments: recorded,
        outcome: result.into(),
        timestamp,
        elapsed: started.elapsed(),
    }
}

/// Bounded run history, most recent first.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<InvocationResult>,
    limit: usize,
}

impl History {
    /// `limit` of zero is treated as one.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Prepend, dropping the oldest entry past the limit.
    pub fn record(&mut self, result: InvocationResult) {
        self.entries.push_front(result);
        self.entries.truncate(self.limit);
    }

    pub fn iter(&self) -> impl Iterator<Item = &InvocationResult> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(tool: &str) -> InvocationResult {
        InvocationResult {
            id: Uuid::new_v4(),
            server_name: "s".into(),
            tool_name: tool.into(),
            arguments: Value::Object(Map::new()),
            outcome: Outcome::Error {
                kind: "timeout",
                message: "slow".into(),
            },
            timestamp: Utc::now(),
            elapsed: Duration::from_millis(1500),
        }
    }

    #[test]
    fn history_is_newest_first_and_bounded() {
        let mut history = History::new(2);
        history.record(result("a"));
        history.record(result("b"));
        history.record(result("c"));

        let tools: Vec<&str> = history.iter().map(|r| r.tool_name.as_str()).collect();
        assert_eq!(tools, ["c", "b"]);
        assert_eq!(history.len(), 2);

        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn results_serialize_with_status_and_millis() {
        let json = serde_json::to_value(result("a")).unwrap();
        assert_eq!(json["outcome"]["status"], "error");
        assert_eq!(json["outcome"]["kind"], "timeout");
        assert_eq!(json["elapsed_ms"], 1500);
    }
}
