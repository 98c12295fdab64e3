//! Configuration types and builders.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Transport used to carry JSON-RPC messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Stdio,
    Http,
}

impl TransportKind {
    /// Parse a transport name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "stdio" => Some(Self::Stdio),
            "http" => Some(Self::Http),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
        }
    }
}

impl TryFrom<&str> for TransportKind {
    type Error = ConfigError;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        Self::parse(s).ok_or_else(|| ConfigError::InvalidValue {
            field: "transport".into(),
            message: format!("Unknown transport: '{}'. Valid transports: stdio, http", s).into(),
        })
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

impl HttpConfig {
    /// `host:port` form used for logging and the bind call.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where diagnostics go. Never stdout: that channel belongs to the protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogDestination {
    #[default]
    Stderr,
    File(PathBuf),
    Off,
}

impl LogDestination {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "" | "stderr" => Self::Stderr,
            "off" | "none" => Self::Off,
            path => Self::File(PathBuf::from(path)),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub destination: LogDestination,
    pub json: bool,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: Cow<'static, str>,
    pub version: Cow<'static, str>,
    pub transport: TransportKind,
    pub http: HttpConfig,
    /// Include exception detail in internal error responses.
    pub debug: bool,
    pub handler_timeout: Option<Duration>,
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "mcpr".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            transport: TransportKind::default(),
            http: HttpConfig::default(),
            debug: false,
            handler_timeout: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for ServerConfig.
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn version(mut self, version: impl Into<Cow<'static, str>>) -> Self {
        self.config.version = version.into();
        self
    }

    pub fn transport(mut self, transport: TransportKind) -> Self {
        self.config.transport = transport;
        self
    }

    pub fn http(mut self, http: HttpConfig) -> Self {
        self.config.http = http;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    pub fn handler_timeout(mut self, timeout: Duration) -> Self {
        self.config.handler_timeout = Some(timeout);
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Overlay values from `MCPR_*` environment variables.
    pub fn from_env(self) -> Result<Self> {
        self.from_lookup(|key| env::var(key).ok())
    }

    /// Overlay values from an arbitrary key lookup.
    pub fn from_lookup<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("MCPR_SERVER_NAME") {
            self.config.name = name.into();
        }

        if let Some(version) = lookup("MCPR_SERVER_VERSION") {
            self.config.version = version.into();
        }

        if let Some(transport) = lookup("MCPR_TRANSPORT") {
            self.config.transport = TransportKind::try_from(transport.as_str())?;
        }

        if let Some(host) = lookup("MCPR_HTTP_HOST") {
            self.config.http.host = host;
        }

        if let Some(port) = lookup("MCPR_HTTP_PORT") {
            self.config.http.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                field: "MCPR_HTTP_PORT".into(),
                message: "Invalid port number".into(),
            })?;
        }

        if let Some(debug) = lookup("MCPR_DEBUG") {
            self.config.debug = parse_bool("MCPR_DEBUG", &debug)?;
        }

        if let Some(timeout) = lookup("MCPR_HANDLER_TIMEOUT_MS") {
            let millis: u64 = timeout.parse().map_err(|_| ConfigError::InvalidValue {
                field: "MCPR_HANDLER_TIMEOUT_MS".into(),
                message: "Expected a whole number of milliseconds".into(),
            })?;
            self.config.handler_timeout = Some(Duration::from_millis(millis));
        }

        if let Some(destination) = lookup("MCPR_LOG_DESTINATION") {
            self.config.logging.destination = LogDestination::parse(&destination);
        }

        if let Some(json) = lookup("MCPR_LOG_JSON") {
            self.config.logging.json = parse_bool("MCPR_LOG_JSON", &json)?;
        }

        Ok(self)
    }

    pub fn build(self) -> Result<ServerConfig> {
        self.validate()?;
        Ok(self.config)
    }

    fn validate(&self) -> Result<()> {
        if self.config.name.is_empty() {
            return Err(ConfigError::MissingField("name".into()).into());
        }
        if self.config.version.is_empty() {
            return Err(ConfigError::MissingField("version".into()).into());
        }
        if self.config.http.host.is_empty() {
            return Err(ConfigError::MissingField("http.host".into()).into());
        }
        if self.config.handler_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::InvalidValue {
                field: "handler_timeout".into(),
                message: "Timeout must be greater than 0".into(),
            }
            .into());
        }
        Ok(())
    }
}

fn parse_bool(field: &'static str, value: &str) -> std::result::Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            field: field.into(),
            message: format!("Expected a boolean, got '{}'", other).into(),
        }),
    }
}
