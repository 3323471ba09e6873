use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::theme::{HexColor, Theme, ThemeMode};

/// File picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Parser, Debug)]
#[command(author, version, about = "Web dashboard for Model Context Protocol servers", long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Server list every new session starts from (JSON or YAML)
    #[arg(long, env = "MCP_SERVERS_FILE")]
    pub servers: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: HttpConfig,
    pub mcp: McpConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct McpConfig {
    #[serde(default)]
    pub servers_file: Option<PathBuf>,
    pub connect_timeout_secs: u64,
    pub call_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UiConfig {
    pub theme: ThemeMode,
    pub button_color: HexColor,
    pub history_limit: usize,
    pub session_idle_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub json: bool,
}

impl HttpConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl McpConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

impl UiConfig {
    #[must_use]
    pub fn theme(&self) -> Theme {
        Theme {
            mode: self.theme,
            button_color: self.button_color,
        }
    }

    #[must_use]
    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    /// Layers, lowest first: defaults, config file, `MCPD_` environment,
    /// command line.
    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8501)?
            .set_default("server.request_timeout_secs", 120)?
            .set_default("mcp.connect_timeout_secs", 20)?
            .set_default("mcp.call_timeout_secs", 60)?
            .set_default("ui.theme", "light")?
            .set_default("ui.button_color", crate::theme::DEFAULT_BUTTON_COLOR)?
            .set_default("ui.history_limit", 50)?
            .set_default("ui.session_idle_secs", 3600)?
            .set_default("logging.json", false)?;

        let file = cli
            .config
            .clone()
            .or_else(|| Path::new(DEFAULT_CONFIG_FILE).exists().then(|| DEFAULT_CONFIG_FILE.to_string()));
        if let Some(file) = file {
            builder = builder.add_source(File::from(PathBuf::from(file)).required(true));
        }

        // E.g. MCPD_SERVER__PORT=8000
        builder = builder.add_source(
            Environment::with_prefix("MCPD")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", i64::from(port))?;
        }
        if let Some(servers) = cli.servers {
            builder = builder.set_override("mcp.servers_file", servers)?;
        }
        if cli.log_json {
            builder = builder.set_override("logging.json", true)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Timeouts must be non-zero, and a request must outlive a connect plus a
    /// call so the MCP timeouts fire before the request is cut off.
    fn validate(&self) -> Result<(), config::ConfigError> {
        let mcp = &self.mcp;
        if mcp.connect_timeout_secs == 0 || mcp.call_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "mcp timeouts must be at least one second".to_string(),
            ));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "server.request_timeout_secs must be at least one second".to_string(),
            ));
        }
        let budget = mcp.connect_timeout_secs.saturating_add(mcp.call_timeout_secs);
        if self.server.request_timeout_secs <= budget {
            return Err(config::ConfigError::Message(format!(
                "server.request_timeout_secs ({}) must exceed mcp.connect_timeout_secs + \
                 mcp.call_timeout_secs ({budget})",
                self.server.request_timeout_secs
            )));
        }
        Ok(())
    }
}
