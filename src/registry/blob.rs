//! Shareable configuration blob.
//!
//! The native format is what [`RegistryBlob::to_json_pretty`] writes:
//!
//! ```json
//! {
//!   "servers": [
//!     { "name": "server_1", "transport": "streamable_http",
//!       "command_or_url": "http://127.0.0.1:8000/mcp" },
//!     { "name": "time", "transport": "stdio", "command_or_url": "npx",
//!       "args": ["-y", "@mcpcentral/mcp-time"], "env": { "TZ": "UTC" } }
//!   ]
//! }
//! ```
//!
//! Import also accepts a bare array of entries and the `mcpServers` map used
//! by most MCP hosts, in JSON or YAML:
//!
//! ```json
//! { "mcpServers": {
//!     "time":   { "command": "npx", "args": ["-y", "@mcpcentral/mcp-time"] },
//!     "tavily": { "url": "https://mcp.tavily.com/mcp/", "headers": { "X-Key": "${TAVILY_API_KEY}" } }
//! } }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ServerConfig, Transport};
use crate::error::DashboardError;

/// Serialized form of a [`super::ServerRegistry`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryBlob {
    pub servers: Vec<ServerConfig>,
}

impl RegistryBlob {
    pub fn to_json_pretty(&self) -> Result<String, DashboardError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DashboardError::InvalidConfig(format!("cannot serialize registry: {e}")))
    }

    /// Parse JSON or YAML text in any of the accepted layouts.
    pub fn parse(text: &str) -> Result<Self, DashboardError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DashboardError::InvalidConfig(
                "configuration is empty".to_string(),
            ));
        }
        let value: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(json_err) => serde_yaml::from_str(text).map_err(|yaml_err| {
                DashboardError::InvalidConfig(format!(
                    "not valid JSON ({json_err}) or YAML ({yaml_err})"
                ))
            })?,
        };
        Self::from_value(&value)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DashboardError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            DashboardError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&text)
    }

    fn from_value(value: &Value) -> Result<Self, DashboardError> {
        let servers = match value {
            Value::Array(items) => parse_entries(items)?,
            Value::Object(obj) => {
                if let Some(servers) = obj.get("servers") {
                    let items = servers.as_array().ok_or_else(|| {
                        DashboardError::InvalidConfig("'servers' must be a list".to_string())
                    })?;
                    parse_entries(items)?
                } else if let Some(map) = obj.get("mcpServers") {
                    let map = map.as_object().ok_or_else(|| {
                        DashboardError::InvalidConfig("'mcpServers' must be a mapping".to_string())
                    })?;
                    parse_host_map(map)?
                } else {
                    return Err(DashboardError::InvalidConfig(
                        "expected a 'servers' list or an 'mcpServers' mapping".to_string(),
                    ));
                }
            }
            _ => {
                return Err(DashboardError::InvalidConfig(
                    "configuration must be an object or a list".to_string(),
                ));
            }
        };
        Ok(Self { servers })
    }
}

fn parse_entries(items: &[Value]) -> Result<Vec<ServerConfig>, DashboardError> {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let obj = item.as_object().ok_or_else(|| {
                DashboardError::InvalidConfig(format!("entry #{} is not an object", idx + 1))
            })?;
            let label = obj
                .get("name")
                .and_then(Value::as_str)
                .map_or_else(|| format!("#{}", idx + 1), |n| format!("'{n}'"));
            parse_entry(obj, None).map_err(|msg| {
                DashboardError::InvalidConfig(format!("entry {label}: {msg}"))
            })
        })
        .collect()
}

fn parse_host_map(map: &Map<String, Value>) -> Result<Vec<ServerConfig>, DashboardError> {
    map.iter()
        .map(|(name, item)| {
            let obj = item.as_object().ok_or_else(|| {
                DashboardError::InvalidConfig(format!("server '{name}' is not an object"))
            })?;
            parse_entry(obj, Some(name))
                .map_err(|msg| DashboardError::InvalidConfig(format!("server '{name}': {msg}")))
        })
        .collect()
}

/// Parse one entry. `name` comes from the map key in the `mcpServers` layout.
fn parse_entry(obj: &Map<String, Value>, name: Option<&str>) -> Result<ServerConfig, String> {
    let name = match name {
        Some(n) => n.to_string(),
        None => required_str(obj, "name")?.to_string(),
    };

    let explicit_transport = obj
        .get("transport")
        .or_else(|| obj.get("type"))
        .map(|v| {
            v.as_str()
                .ok_or_else(|| "'transport' must be a string".to_string())
                .and_then(|s| s.parse::<Transport>().map_err(|e| e.to_string()))
        })
        .transpose()?;

    let (transport, command_or_url) = if let Some(v) = obj.get("command_or_url") {
        let target = v
            .as_str()
            .ok_or_else(|| "'command_or_url' must be a string".to_string())?;
        let transport = explicit_transport.ok_or_else(|| "missing 'transport'".to_string())?;
        (transport, target.to_string())
    } else if let Some(url) = obj.get("url") {
        let url = url
            .as_str()
            .ok_or_else(|| "'url' must be a string".to_string())?;
        (
            explicit_transport.unwrap_or(Transport::StreamableHttp),
            url.to_string(),
        )
    } else if let Some(cmd) = obj.get("command") {
        let cmd = cmd
            .as_str()
            .ok_or_else(|| "'command' must be a string".to_string())?;
        (explicit_transport.unwrap_or(Transport::Stdio), cmd.to_string())
    } else {
        return Err("missing 'command_or_url' (or 'command' / 'url')".to_string());
    };

    let args = match obj.get("args") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|a| {
                a.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| "'args' must be a list of strings".to_string())
            })
            .collect::<Result<_, _>>()?,
        Some(_) => return Err("'args' must be a list of strings".to_string()),
    };

    let mut env = string_map(obj.get("env"), "env")?;
    env.extend(string_map(obj.get("headers"), "headers")?);

    let config = ServerConfig {
        name,
        transport,
        command_or_url,
        args,
        env,
    };
    config.validate().map_err(|e| match e {
        DashboardError::InvalidConfig(msg) => msg,
        other => other.to_string(),
    })?;
    Ok(config)
}

fn required_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<&'a str, String> {
    match obj.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(format!("'{key}' must be a string")),
        None => Err(format!("missing '{key}'")),
    }
}

fn string_map(value: Option<&Value>, key: &str) -> Result<BTreeMap<String, String>, String> {
    match value {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => Ok((k.clone(), s.clone())),
                Value::Number(n) => Ok((k.clone(), n.to_string())),
                Value::Bool(b) => Ok((k.clone(), b.to_string())),
                _ => Err(format!("'{key}.{k}' must be a string")),
            })
            .collect(),
        Some(_) => Err(format!("'{key}' must be a mapping of strings")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_map_layout() {
        let text = r#"{
          "mcpServers": {
            "time": { "command": "npx", "args": ["-y", "@mcpcentral/mcp-time"] },
            "tavily": { "url": "https://mcp.tavily.com/mcp/", "env": { "TAVILY_API_KEY": "${TAVILY_API_KEY}" } }
          }
        }"#;
        let blob = RegistryBlob::parse(text).unwrap();
        assert_eq!(blob.servers.len(), 2);

        let time = blob.servers.iter().find(|s| s.name == "time").unwrap();
        assert_eq!(time.transport, Transport::Stdio);
        assert_eq!(time.args, ["-y", "@mcpcentral/mcp-time"]);

        let tavily = blob.servers.iter().find(|s| s.name == "tavily").unwrap();
        assert_eq!(tavily.transport, Transport::StreamableHttp);
        assert_eq!(tavily.env["TAVILY_API_KEY"], "${TAVILY_API_KEY}");
    }

    #[test]
    fn parses_yaml() {
        let text = "
servers:
  - name: local
    transport: streamable_http
    command_or_url: http://127.0.0.1:8000/mcp
    headers:
      X-Trace: on
";
        let blob = RegistryBlob::parse(text).unwrap();
        assert_eq!(blob.servers[0].name, "local");
        assert_eq!(blob.servers[0].env["X-Trace"], "on");
    }

    #[test]
    fn parses_bare_list() {
        let text = r#"[{"name": "a", "url": "http://127.0.0.1:1/mcp"}]"#;
        let blob = RegistryBlob::parse(text).unwrap();
        assert_eq!(blob.servers[0].transport, Transport::StreamableHttp);
    }

    #[test]
    fn rejects_unknown_transport_naming_the_entry() {
        let text = r#"{"servers": [{"name": "weird", "transport": "smoke", "command_or_url": "x"}]}"#;
        let err = RegistryBlob::parse(text).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'weird'"), "{msg}");
        assert!(msg.contains("smoke"), "{msg}");
    }

    #[test]
    fn rejects_missing_fields() {
        for text in [
            r#"{"servers": [{"transport": "stdio", "command_or_url": "uvx"}]}"#,
            r#"{"servers": [{"name": "a", "command_or_url": "uvx"}]}"#,
            r#"{"servers": [{"name": "a", "transport": "stdio"}]}"#,
            r#"{"servers": "nope"}"#,
            r#"{"something": []}"#,
            "42",
            "",
        ] {
            assert!(
                matches!(RegistryBlob::parse(text), Err(DashboardError::InvalidConfig(_))),
                "accepted: {text}"
            );
        }
    }

    #[test]
    fn load_reports_unreadable_file() {
        let err = RegistryBlob::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, DashboardError::InvalidConfig(_)));
    }
}
