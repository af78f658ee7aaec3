use crate::error::{Result, VigilError};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// REST client configuration
    pub api: ApiClientConfig,
    /// Real-time connection configuration
    pub realtime: RealtimeConfig,
    /// Mock server configuration
    pub mock: MockServerConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL for REST calls (default: http://127.0.0.1:8001/api)
    pub base_url: Url,
    /// Path of the persisted auth token file
    pub token_path: PathBuf,
    /// Request timeout in seconds
    pub request_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// WebSocket endpoint (default: ws://127.0.0.1:8001/ws)
    pub ws_url: Url,
    /// Reconnection policy
    pub reconnect: ReconnectConfig,
}

/// Reconnection backoff policy
///
/// Delay grows linearly: `base_delay * attempt_number`, with no jitter and
/// no cap on delay growth. After `max_attempts` failed attempts the
/// connection settles into `Disconnected` until a manual `connect()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Base delay between reconnection attempts
    pub base_delay: Duration,
    /// Maximum number of automatic reconnection attempts
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockServerConfig {
    /// Port for the mock server (default: 8001)
    pub port: u16,
    /// Host to bind to (default: 0.0.0.0)
    pub host: String,
    /// Allowed CORS origins (comma-separated, empty = localhost only)
    pub cors_origins: Vec<String>,
    /// JWT secret for token generation
    pub jwt_secret: String,
    /// Interval between synthetic metrics pushes, in seconds
    pub metrics_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let base_url = get_env_or("VIGIL_API_URL", "http://127.0.0.1:8001/api");
        let ws_url = get_env_or("VIGIL_WS_URL", "ws://127.0.0.1:8001/ws");

        Ok(Config {
            api: ApiClientConfig {
                base_url: Url::parse(&base_url).map_err(|e| {
                    VigilError::InvalidConfig(format!("VIGIL_API_URL must be a valid URL: {}", e))
                })?,
                token_path: PathBuf::from(get_env_or("VIGIL_TOKEN_FILE", ".vigil-token")),
                request_timeout: get_env_or("VIGIL_REQUEST_TIMEOUT", "30")
                    .parse()
                    .unwrap_or(30),
            },
            realtime: RealtimeConfig {
                ws_url: parse_ws_url(&ws_url)?,
                reconnect: ReconnectConfig {
                    base_delay: Duration::from_millis(
                        get_env_or("VIGIL_RECONNECT_BASE_MS", "1000")
                            .parse()
                            .unwrap_or(1000),
                    ),
                    max_attempts: get_env_or("VIGIL_RECONNECT_MAX_ATTEMPTS", "5")
                        .parse()
                        .unwrap_or(5),
                },
            },
            mock: MockServerConfig {
                port: get_env_or("MOCK_PORT", "8001").parse().map_err(|_| {
                    VigilError::InvalidConfig("MOCK_PORT must be a valid port number".into())
                })?,
                host: get_env_or("MOCK_HOST", "0.0.0.0"),
                cors_origins: get_env_or("CORS_ORIGINS", "")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                jwt_secret: get_env_or("JWT_SECRET", ""),
                metrics_interval_secs: get_env_or("MOCK_METRICS_INTERVAL", "2")
                    .parse()
                    .unwrap_or(2),
            },
            log: LogConfig {
                level: get_env_or("LOG_LEVEL", "info"),
                format: get_env_or("LOG_FORMAT", "pretty"),
            },
        })
    }

    /// Get the mock server bind address
    pub fn mock_addr(&self) -> String {
        format!("{}:{}", self.mock.host, self.mock.port)
    }
}

fn parse_ws_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| {
        VigilError::InvalidConfig(format!("VIGIL_WS_URL must be a valid URL: {}", e))
    })?;

    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(VigilError::InvalidConfig(format!(
            "VIGIL_WS_URL has unsupported scheme: {}",
            other
        ))),
    }
}

/// Get environment variable with a default value
fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
