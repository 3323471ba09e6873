//! MCP wire shapes and the descriptors built from them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DashboardError;
use crate::forms::{SchemaField, parse_input_schema};

/// `Tool` as returned by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireTool {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

/// Result of `tools/call`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<Value>,
    #[serde(rename = "isError", default)]
    pub is_error: Option<bool>,
    #[serde(rename = "structuredContent", default)]
    pub structured_content: Option<Value>,
}

impl CallToolResult {
    /// Successful call with a single text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![serde_json::json!({ "type": "text", "text": text.into() })],
            ..Self::default()
        }
    }

    /// Server-reported failure with a single text block.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: Some(true),
            ..Self::text(text)
        }
    }

    /// Convert into displayable output. `isError: true` becomes
    /// [`DashboardError::ToolExecution`] carrying the text blocks as message.
    pub fn into_output(self, tool: &str) -> Result<ToolOutput, DashboardError> {
        let content: Vec<ContentBlock> = self.content.into_iter().map(ContentBlock::from_wire).collect();

        if self.is_error.unwrap_or(false) {
            let message = content
                .iter()
                .filter_map(ContentBlock::as_text)
                .collect::<Vec<_>>()
                .join("\n");
            return Err(DashboardError::ToolExecution {
                tool: tool.to_string(),
                message: if message.is_empty() {
                    "the server reported an error without details".to_string()
                } else {
                    message
                },
            });
        }

        Ok(ToolOutput {
            content,
            structured: self.structured_content,
        })
    }
}

/// A tool offered by one connected server.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub server_name: String,
    pub tool_name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub input_schema: Value,
    #[serde(skip)]
    pub schema: SchemaField,
}

impl ToolDescriptor {
    /// Build from the wire shape; an input schema the form synthesizer cannot
    /// use is a protocol error for `server`.
    pub fn from_wire(server: &str, tool: WireTool) -> Result<Self, DashboardError> {
        if tool.name.trim().is_empty() {
            return Err(DashboardError::Protocol {
                server: server.to_string(),
                message: "tool without a name".to_string(),
            });
        }
        let schema = parse_input_schema(&tool.input_schema).map_err(|e| DashboardError::Protocol {
            server: server.to_string(),
            message: format!("tool '{}' has an unusable input schema: {e}", tool.name),
        })?;

        Ok(Self {
            server_name: server.to_string(),
            tool_name: tool.name,
            title: tool.title.filter(|t| !t.trim().is_empty()),
            description: tool.description.filter(|d| !d.trim().is_empty()),
            input_schema: tool.input_schema,
            schema,
        })
    }

    /// `server/tool`, unique across the catalog.
    #[must_use]
    pub fn qualified_id(&self) -> String {
        format!("{}/{}", self.server_name, self.tool_name)
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.tool_name)
    }
}

/// One block of tool output, classified for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    /// Text that parsed as a JSON object or array.
    Json { value: Value },
    Image { mime_type: String, data: String },
    Resource { uri: String, text: Option<String> },
    Other { raw: Value },
}

impl ContentBlock {
    #[must_use]
    pub fn from_wire(block: Value) -> Self {
        let kind = block.get("type").and_then(Value::as_str).unwrap_or_default();
        match kind {
            "text" => {
                let text = block
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                match serde_json::from_str::<Value>(text.trim()) {
                    Ok(value) if value.is_object() || value.is_array() => Self::Json { value },
                    _ => Self::Text { text },
                }
            }
            "image" => Self::Image {
                mime_type: str_field(&block, "mimeType").unwrap_or("image/png").to_string(),
                data: str_field(&block, "data").unwrap_or_default().to_string(),
            },
            "resource" => {
                let resource = block.get("resource").cloned().unwrap_or_default();
                Self::Resource {
                    uri: str_field(&resource, "uri").unwrap_or_default().to_string(),
                    text: str_field(&resource, "text").map(str::to_string),
                }
            }
            "resource_link" => Self::Resource {
                uri: str_field(&block, "uri").unwrap_or_default().to_string(),
                text: None,
            },
            _ => Self::Other { raw: block },
        }
    }

    /// Plain text of this block, if it has any.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Text { text } => Some(text.clone()),
            Self::Json { value } => Some(value.to_string()),
            Self::Resource { text, .. } => text.clone(),
            Self::Image { .. } | Self::Other { .. } => None,
        }
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Successful tool output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutput {
    pub content: Vec<ContentBlock>,
    pub structured: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_blocks_holding_json_are_classified() {
        let result = CallToolResult {
            content: vec![
                json!({ "type": "text", "text": "{\"temp\": 21}" }),
                json!({ "type": "text", "text": "42" }),
                json!({ "type": "image", "data": "AAAA", "mimeType": "image/jpeg" }),
                json!({ "type": "audio", "data": "AAAA" }),
            ],
            is_error: None,
            structured_content: Some(json!({ "temp": 21 })),
        };
        let output = result.into_output("weather").unwrap();
        assert_eq!(output.content[0], ContentBlock::Json { value: json!({ "temp": 21 }) });
        assert_eq!(output.content[1], ContentBlock::Text { text: "42".into() });
        assert!(matches!(&output.content[2], ContentBlock::Image { mime_type, .. } if mime_type == "image/jpeg"));
        assert!(matches!(output.content[3], ContentBlock::Other { .. }));
        assert_eq!(output.structured, Some(json!({ "temp": 21 })));
    }

    #[test]
    fn is_error_becomes_tool_execution() {
        let err = CallToolResult::error("city not found").into_output("weather").unwrap_err();
        assert_eq!(err.kind(), "tool_execution");
        assert!(err.to_string().contains("city not found"));
    }

    #[test]
    fn descriptor_from_wire() {
        let tool: WireTool = serde_json::from_value(json!({
            "name": "search",
            "description": "",
            "inputSchema": { "type": "object", "properties": { "q": { "type": "string" } } }
        }))
        .unwrap();
        let descriptor = ToolDescriptor::from_wire("docs", tool).unwrap();
        assert_eq!(descriptor.qualified_id(), "docs/search");
        assert_eq!(descriptor.description, None);
        assert_eq!(descriptor.schema.fields().len(), 1);

        let nameless: WireTool = serde_json::from_value(json!({ "name": " " })).unwrap();
        assert_eq!(
            ToolDescriptor::from_wire("docs", nameless).unwrap_err().kind(),
            "protocol"
        );
    }
}
