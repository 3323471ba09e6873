//! Server registry: the ordered list of MCP servers a session knows about.
//!
//! Entries keep insertion order and names are unique. The registry can be
//! exported to, and imported from, a shareable configuration blob (see
//! [`blob`]).
//!
//! ```rust
//! use mcp_dashboard::registry::{ServerConfig, ServerRegistry};
//!
//! let mut registry = ServerRegistry::new();
//! registry.add(ServerConfig::http("search", "http://127.0.0.1:8000/mcp")).unwrap();
//! assert!(registry.add(ServerConfig::http("search", "http://other/mcp")).is_err());
//! assert_eq!(registry.list().len(), 1);
//! ```

pub mod blob;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

pub use blob::RegistryBlob;

/// Endpoint used for a fresh session when no seed file is configured.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000/mcp";

/// Channel carrying MCP messages to a server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// Spawn a child process and speak MCP over its stdin/stdout.
    Stdio,
    /// Long-lived streamable HTTP session.
    #[default]
    StreamableHttp,
}

impl Transport {
    pub const ALL: [Transport; 2] = [Transport::StreamableHttp, Transport::Stdio];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::StreamableHttp => "streamable_http",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "stdio" => Ok(Self::Stdio),
            "streamable_http" | "streamable-http" | "http" => Ok(Self::StreamableHttp),
            other => Err(DashboardError::InvalidConfig(format!(
                "unknown transport '{other}' (expected 'stdio' or 'streamable_http')"
            ))),
        }
    }
}

/// One configured MCP server connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub transport: Transport,
    /// Executable (stdio) or endpoint URL (streamable HTTP).
    pub command_or_url: String,
    /// Extra arguments for the stdio executable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Process environment for stdio, extra request headers for HTTP.
    #[serde(default, alias = "headers", skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl ServerConfig {
    pub fn http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport: Transport::StreamableHttp,
            command_or_url: url.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn stdio(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            transport: Transport::Stdio,
            command_or_url: command.into(),
            args,
            env: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Check required fields.
    pub fn validate(&self) -> Result<(), DashboardError> {
        if self.name.trim().is_empty() {
            return Err(DashboardError::InvalidConfig(
                "server name cannot be empty".to_string(),
            ));
        }
        if self.command_or_url.trim().is_empty() {
            let what = match self.transport {
                Transport::Stdio => "command",
                Transport::StreamableHttp => "url",
            };
            return Err(DashboardError::InvalidConfig(format!(
                "server '{}' requires a {what}",
                self.name
            )));
        }
        if self.transport == Transport::StreamableHttp {
            url::Url::parse(self.command_or_url.trim()).map_err(|e| {
                DashboardError::InvalidConfig(format!(
                    "server '{}' has an invalid url '{}': {e}",
                    self.name, self.command_or_url
                ))
            })?;
        }
        if self.env.keys().any(|k| k.trim().is_empty()) {
            return Err(DashboardError::InvalidConfig(format!(
                "server '{}' has an empty env/header key",
                self.name
            )));
        }
        Ok(())
    }

    /// Short human label, e.g. `npx -y @mcp/time` or the URL.
    #[must_use]
    pub fn endpoint_label(&self) -> String {
        if self.args.is_empty() {
            self.command_or_url.clone()
        } else {
            format!("{} {}", self.command_or_url, self.args.join(" "))
        }
    }
}

/// How [`ServerRegistry::import`] combines the blob with existing entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Drop everything and take the blob's entries.
    #[default]
    Replace,
    /// Keep existing entries; same-named entries are overwritten in place.
    Merge,
}

/// Ordered, name-unique collection of [`ServerConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerRegistry {
    servers: Vec<ServerConfig>,
}

impl ServerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the single default HTTP server.
    #[must_use]
    pub fn with_default_server() -> Self {
        Self {
            servers: vec![ServerConfig::http("server_1", DEFAULT_SERVER_URL)],
        }
    }

    pub fn add(&mut self, config: ServerConfig) -> Result<(), DashboardError> {
        config.validate()?;
        if self.contains(&config.name) {
            return Err(DashboardError::DuplicateName(config.name));
        }
        self.servers.push(config);
        Ok(())
    }

    /// Remove a server by name, returning it if it was present.
    pub fn remove(&mut self, name: &str) -> Option<ServerConfig> {
        let idx = self.servers.iter().position(|s| s.name == name)?;
        Some(self.servers.remove(idx))
    }

    #[must_use]
    pub fn list(&self) -> &[ServerConfig] {
        &self.servers
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ServerConfig> {
        self.servers.iter().find(|s| s.name == name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Smallest unused `server_N` name.
    #[must_use]
    pub fn next_default_name(&self) -> String {
        (1..)
            .map(|n| format!("server_{n}"))
            .find(|candidate| !self.contains(candidate))
            .unwrap_or_else(|| "server".to_string())
    }

    #[must_use]
    pub fn export(&self) -> RegistryBlob {
        RegistryBlob {
            servers: self.servers.clone(),
        }
    }

    /// Apply an already-parsed blob.
    ///
    /// The whole blob is validated first; on error the registry is untouched.
    pub fn import(&mut self, blob: RegistryBlob, mode: ImportMode) -> Result<(), DashboardError> {
        let mut incoming = ServerRegistry::new();
        for entry in blob.servers {
            let name = entry.name.clone();
            incoming.add(entry).map_err(|e| match e {
                DashboardError::DuplicateName(n) => DashboardError::InvalidConfig(format!(
                    "server '{n}' appears more than once in the imported configuration"
                )),
                DashboardError::InvalidConfig(msg) => {
                    DashboardError::InvalidConfig(format!("entry '{name}': {msg}"))
                }
                other => other,
            })?;
        }

        match mode {
            ImportMode::Replace => *self = incoming,
            ImportMode::Merge => {
                for entry in incoming.servers {
                    match self.servers.iter_mut().find(|s| s.name == entry.name) {
                        Some(existing) => *existing = entry,
                        None => self.servers.push(entry),
                    }
                }
            }
        }
        Ok(())
    }

    /// Parse `text` as a blob and import it.
    pub fn import_text(&mut self, text: &str, mode: ImportMode) -> Result<(), DashboardError> {
        let blob = RegistryBlob::parse(text)?;
        self.import(blob, mode)
    }
}
