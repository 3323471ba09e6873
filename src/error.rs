//! Error taxonomy shared by every dashboard component.
//!
//! Each variant is produced by exactly one component and caught at that
//! component's boundary; none of them is fatal to the dashboard as a whole.

use std::fmt;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the registry, the MCP adapter and the form synthesizer.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// A server with the same name is already registered.
    #[error("a server named '{0}' is already registered")]
    DuplicateName(String),

    /// An imported or entered server configuration is malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Connecting to one server failed. Other servers are unaffected.
    #[error("failed to connect to '{server}': {message}")]
    Connection { server: String, message: String },

    /// A server answered with something that is not a valid MCP response.
    #[error("protocol error from '{server}': {message}")]
    Protocol { server: String, message: String },

    /// The server ran the tool and reported a failure.
    #[error("tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// No response within the configured bound.
    #[error("{operation} timed out after {}s", .after.as_secs_f32())]
    Timeout { operation: String, after: Duration },

    /// Form input did not satisfy the tool's input schema.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Unknown server or tool.
    #[error("not found: {0}")]
    NotFound(String),
}

impl DashboardError {
    /// Stable discriminant used by the JSON API and the result history.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateName(_) => "duplicate_name",
            Self::InvalidConfig(_) => "invalid_config",
            Self::Connection { .. } => "connection",
            Self::Protocol { .. } => "protocol",
            Self::ToolExecution { .. } => "tool_execution",
            Self::Timeout { .. } => "timeout",
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::DuplicateName(_) => StatusCode::CONFLICT,
            Self::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            Self::Connection { .. } | Self::Protocol { .. } | Self::ToolExecution { .. } => {
                StatusCode::BAD_GATEWAY
            }
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

/// A single field whose submitted value could not be coerced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidField {
    pub field: String,
    pub reason: String,
}

/// Local, synchronous form validation failure.
///
/// Carries every offending field so the form can mark all of them at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub missing: Vec<String>,
    pub invalid: Vec<InvalidField>,
}

impl ValidationError {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.invalid.is_empty()
    }

    pub fn missing(&mut self, field: impl Into<String>) {
        self.missing.push(field.into());
    }

    pub fn invalid(&mut self, field: impl Into<String>, reason: impl Into<String>) {
        self.invalid.push(InvalidField {
            field: field.into(),
            reason: reason.into(),
        });
    }

    /// Whether `field` is named by this error, either as missing or invalid.
    #[must_use]
    pub fn mentions(&self, field: &str) -> bool {
        self.missing.iter().any(|m| m == field) || self.invalid.iter().any(|i| i.field == field)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.missing.is_empty() {
            parts.push(format!(
                "missing required field(s): {}",
                self.missing.join(", ")
            ));
        }
        for inv in &self.invalid {
            parts.push(format!("invalid value for '{}': {}", inv.field, inv.reason));
        }
        if parts.is_empty() {
            return f.write_str("validation failed");
        }
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    status: u16,
    #[serde(rename = "type")]
    error_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation: Option<&'a ValidationError>,
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = self.status();
        let validation = match &self {
            Self::Validation(v) => Some(v),
            _ => None,
        };
        let body = ErrorBody {
            error: self.to_string(),
            status: status.as_u16(),
            error_type: self.kind(),
            validation,
        };
        (status, axum::Json(body)).into_response()
    }
}
