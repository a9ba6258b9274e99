use crate::error::{RelayError, Result};
use crate::models::SessionMode;
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// WebSocket server configuration
    pub server: ServerConfig,
    /// Per-session behaviour
    pub session: SessionConfig,
    /// Shutdown timing
    pub shutdown: ShutdownConfig,
    /// Logging configuration
    pub log: LogConfig,
}

/// Immutable settings for one server instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
    /// Port to bind to (default: 8080)
    pub port: u16,
    /// WebSocket route (default: /chat)
    pub path: String,
    /// Keepalive ping period, `None` disables pings
    pub ping_period: Option<Duration>,
    /// Close sessions silent for this long, `None` disables
    pub idle_timeout: Option<Duration>,
    /// Maximum frame and message size in bytes, `None` for no cap
    pub max_frame_size: Option<usize>,
    /// Mask outbound frames. Servers must not, so only `false` validates.
    pub masking: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            path: "/chat".to_string(),
            ping_period: Some(Duration::from_millis(10_000)),
            idle_timeout: Some(Duration::from_millis(15_000)),
            max_frame_size: None,
            masking: false,
        }
    }
}

impl ServerConfig {
    /// Address string handed to the listener
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Effective frame/message limit for the upgrade
    pub fn frame_limit(&self) -> usize {
        self.max_frame_size.unwrap_or(usize::MAX)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(RelayError::InvalidConfig("host must not be empty".into()));
        }
        if !self.path.starts_with('/') {
            return Err(RelayError::InvalidConfig(format!(
                "WebSocket path must start with '/': {}",
                self.path
            )));
        }
        if self.path == "/health" || self.path == "/api" || self.path.starts_with("/api/") {
            return Err(RelayError::InvalidConfig(format!(
                "WebSocket path collides with an HTTP route: {}",
                self.path
            )));
        }
        if self.masking {
            return Err(RelayError::InvalidConfig(
                "masking must be disabled: servers send unmasked frames".into(),
            ));
        }
        if self.max_frame_size == Some(0) {
            return Err(RelayError::InvalidConfig(
                "max frame size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Telemetry overwrite or chat log append
    pub mode: SessionMode,
    /// Retained chat messages, `None` keeps everything
    pub message_log_capacity: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownConfig {
    /// Time sessions get to close on their own
    pub grace_period: Duration,
    /// Deadline after which remaining sessions are dropped
    pub force_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_millis(1_000),
            force_timeout: Duration::from_millis(2_000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mode_raw = get_env_or("RELAY_MODE", "telemetry");
        let mode = SessionMode::parse(&mode_raw).ok_or_else(|| {
            RelayError::InvalidConfig(format!(
                "RELAY_MODE must be 'telemetry' or 'chat', got '{}'",
                mode_raw
            ))
        })?;

        let config = Config {
            server: ServerConfig {
                host: get_env_or("RELAY_HOST", "0.0.0.0"),
                port: get_env_or("RELAY_PORT", "8080").parse().map_err(|_| {
                    RelayError::InvalidConfig("RELAY_PORT must be a valid port number".into())
                })?,
                path: get_env_or("RELAY_WS_PATH", "/chat"),
                ping_period: optional_millis("RELAY_PING_PERIOD_MS", 10_000)?,
                idle_timeout: optional_millis("RELAY_IDLE_TIMEOUT_MS", 15_000)?,
                max_frame_size: match env::var("RELAY_MAX_FRAME_SIZE") {
                    Ok(raw) if !raw.trim().is_empty() => {
                        Some(raw.trim().parse().map_err(|_| {
                            RelayError::InvalidConfig(
                                "RELAY_MAX_FRAME_SIZE must be a number of bytes".into(),
                            )
                        })?)
                    }
                    _ => None,
                },
                masking: get_env_or("RELAY_MASKING", "false").parse().map_err(|_| {
                    RelayError::InvalidConfig("RELAY_MASKING must be true or false".into())
                })?,
            },
            session: SessionConfig {
                mode,
                message_log_capacity: match parse_number("RELAY_MESSAGE_LOG_CAPACITY", 0)? {
                    0 => None,
                    cap => Some(usize::try_from(cap).map_err(|_| {
                        RelayError::InvalidConfig(
                            "RELAY_MESSAGE_LOG_CAPACITY is too large for this platform".into(),
                        )
                    })?),
                },
            },
            shutdown: ShutdownConfig {
                grace_period: Duration::from_millis(parse_number("RELAY_SHUTDOWN_GRACE_MS", 1_000)?),
                force_timeout: Duration::from_millis(parse_number(
                    "RELAY_SHUTDOWN_FORCE_MS",
                    2_000,
                )?),
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "pretty"),
            },
        };

        config.server.validate()?;
        Ok(config)
    }
}

/// Parse a millisecond duration where `0` means disabled
fn optional_millis(key: &str, default: u64) -> Result<Option<Duration>> {
    match parse_number(key, default)? {
        0 => Ok(None),
        ms => Ok(Some(Duration::from_millis(ms))),
    }
}

fn parse_number(key: &str, default: u64) -> Result<u64> {
    let raw = get_env_or(key, &default.to_string());
    raw.trim()
        .parse()
        .map_err(|_| RelayError::InvalidConfig(format!("{} must be a non-negative integer", key)))
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
