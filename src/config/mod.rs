//! Configuration module for the dialog gateway
//!
//! Handles server configuration from .env files, YAML files and environment
//! variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Example
//! ```rust,no_run
//! use dialog_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

mod yaml;

use yaml::YamlConfig;

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains everything needed to run the dialog gateway:
/// - Server settings (host, port, TLS)
/// - Dialog step settings (first speaker, step deadline, queue bounds)
/// - Session lifecycle settings (idle timeout, cleanup cadence)
/// - Security settings (CORS)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Dialog step settings
    /// Whether the assistant opens the conversation as soon as a streaming
    /// channel is bound. When false the gateway waits for client input.
    pub ai_speaks_first: bool,
    /// Upper bound on the wall-clock duration of one dialog step.
    pub step_deadline_seconds: u64,
    /// Bound on queued-but-unprocessed inputs per session.
    /// Default: None (unbounded)
    pub max_pending_inputs: Option<usize>,
    /// Outbound frame buffer per streaming channel. A slow reader applies
    /// backpressure to the step runner once this many frames are in flight.
    pub channel_buffer_size: usize,

    // Session lifecycle
    /// Idle time after which a session is swept
    pub idle_timeout_seconds: u64,
    /// How often the cleanup task runs
    pub cleanup_interval_seconds: u64,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// Note: a .env file, if used, is loaded in main.rs at startup so its
    /// values appear here as ordinary environment variables.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Self {
            host: env_or("HOST", "0.0.0.0"),
            port: parse_env("PORT", 3001)?,
            tls: tls_from_env()?,
            ai_speaks_first: parse_env("AI_SPEAKS_FIRST", false)?,
            step_deadline_seconds: parse_env("STEP_DEADLINE_SECONDS", 60)?,
            max_pending_inputs: parse_env_opt("MAX_PENDING_INPUTS")?,
            channel_buffer_size: parse_env("CHANNEL_BUFFER_SIZE", 64)?,
            idle_timeout_seconds: parse_env("SESSION_IDLE_TIMEOUT_SECONDS", 300)?,
            cleanup_interval_seconds: parse_env("SESSION_CLEANUP_INTERVAL_SECONDS", 60)?,
            cors_allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS").ok(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base.
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml = YamlConfig::from_file(path)?;
        let mut config = Self::from_env()?;

        if let Some(server) = yaml.server {
            if let Some(host) = server.host {
                config.host = host;
            }
            if let Some(port) = server.port {
                config.port = port;
            }
            if let Some(tls) = server.tls {
                if tls.enabled.unwrap_or(false) {
                    match (tls.cert_path, tls.key_path) {
                        (Some(cert), Some(key)) => {
                            config.tls = Some(TlsConfig {
                                cert_path: PathBuf::from(cert),
                                key_path: PathBuf::from(key),
                            });
                        }
                        _ => {
                            return Err(
                                "TLS enabled in YAML but cert_path or key_path is missing".into()
                            );
                        }
                    }
                }
            }
        }
        if let Some(dialog) = yaml.dialog {
            if let Some(first) = dialog.ai_speaks_first {
                config.ai_speaks_first = first;
            }
            if let Some(deadline) = dialog.step_deadline_seconds {
                config.step_deadline_seconds = deadline;
            }
            if let Some(max) = dialog.max_pending_inputs {
                config.max_pending_inputs = Some(max);
            }
            if let Some(size) = dialog.channel_buffer_size {
                config.channel_buffer_size = size;
            }
        }
        if let Some(session) = yaml.session {
            if let Some(timeout) = session.idle_timeout_seconds {
                config.idle_timeout_seconds = timeout;
            }
            if let Some(interval) = session.cleanup_interval_seconds {
                config.cleanup_interval_seconds = interval;
            }
        }
        if let Some(security) = yaml.security {
            if let Some(origins) = security.cors_allowed_origins {
                config.cors_allowed_origins = Some(origins);
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.step_deadline_seconds == 0 {
            return Err("STEP_DEADLINE_SECONDS must be greater than zero".into());
        }
        if self.channel_buffer_size == 0 {
            return Err("CHANNEL_BUFFER_SIZE must be greater than zero".into());
        }
        if self.cleanup_interval_seconds == 0 {
            return Err("SESSION_CLEANUP_INTERVAL_SECONDS must be greater than zero".into());
        }
        Ok(())
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    pub fn step_deadline(&self) -> Duration {
        Duration::from_secs(self.step_deadline_seconds)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            tls: None,
            ai_speaks_first: false,
            step_deadline_seconds: 60,
            max_pending_inputs: None,
            channel_buffer_size: 64,
            idle_timeout_seconds: 300,
            cleanup_interval_seconds: 60,
            cors_allowed_origins: None,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|e| format!("Invalid {key} value '{value}': {e}").into()),
        Err(_) => Ok(default),
    }
}

fn parse_env_opt<T>(key: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|e| format!("Invalid {key} value '{value}': {e}").into()),
        Err(_) => Ok(None),
    }
}

fn tls_from_env() -> Result<Option<TlsConfig>, Box<dyn std::error::Error>> {
    let cert = std::env::var("TLS_CERT_PATH").ok();
    let key = std::env::var("TLS_KEY_PATH").ok();
    match (cert, key) {
        (Some(cert), Some(key)) => Ok(Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        })),
        (None, None) => Ok(None),
        _ => Err("TLS_CERT_PATH and TLS_KEY_PATH must be set together".into()),
    }
}
