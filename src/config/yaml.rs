use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration; anything left
/// unset falls back to the environment variable or default value.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3001
///   tls:
///     enabled: true
///     cert_path: "/etc/dialog-gateway/cert.pem"
///     key_path: "/etc/dialog-gateway/key.pem"
///
/// dialog:
///   ai_speaks_first: true
///   step_deadline_seconds: 60
///   max_pending_inputs: 32
///   channel_buffer_size: 64
///
/// session:
///   idle_timeout_seconds: 300
///   cleanup_interval_seconds: 60
///
/// security:
///   cors_allowed_origins: "https://app.example.com"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub dialog: Option<DialogYaml>,
    pub session: Option<SessionYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Dialog step configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DialogYaml {
    /// Whether the assistant opens the conversation on connect
    pub ai_speaks_first: Option<bool>,
    /// Upper bound on the wall-clock duration of one dialog step
    pub step_deadline_seconds: Option<u64>,
    /// Bound on queued-but-unprocessed inputs per session (unset = unbounded)
    pub max_pending_inputs: Option<usize>,
    /// Outbound frame buffer per streaming channel
    pub channel_buffer_size: Option<usize>,
}

/// Session lifecycle configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionYaml {
    /// Idle time after which a session is swept
    pub idle_timeout_seconds: Option<u64>,
    /// How often the cleanup task runs
    pub cleanup_interval_seconds: Option<u64>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    /// CORS allowed origins (comma-separated list or "*" for all)
    pub cors_allowed_origins: Option<String>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080

dialog:
  ai_speaks_first: true
  step_deadline_seconds: 45
  max_pending_inputs: 16
  channel_buffer_size: 128

session:
  idle_timeout_seconds: 600
  cleanup_interval_seconds: 30

security:
  cors_allowed_origins: "https://example.com"
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(
            config.server.as_ref().unwrap().host,
            Some("127.0.0.1".to_string())
        );
        assert_eq!(config.server.as_ref().unwrap().port, Some(8080));
        let dialog = config.dialog.as_ref().unwrap();
        assert_eq!(dialog.ai_speaks_first, Some(true));
        assert_eq!(dialog.step_deadline_seconds, Some(45));
        assert_eq!(dialog.max_pending_inputs, Some(16));
        assert_eq!(dialog.channel_buffer_size, Some(128));
        let session = config.session.as_ref().unwrap();
        assert_eq!(session.idle_timeout_seconds, Some(600));
        assert_eq!(session.cleanup_interval_seconds, Some(30));
        assert_eq!(
            config.security.as_ref().unwrap().cors_allowed_origins,
            Some("https://example.com".to_string())
        );
    }

    #[test]
    fn test_yaml_config_partial() {
        let yaml = r#"
server:
  port: 9000

dialog:
  ai_speaks_first: true
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        assert!(config.server.as_ref().unwrap().host.is_none());
        assert_eq!(config.server.as_ref().unwrap().port, Some(9000));
        assert_eq!(config.dialog.as_ref().unwrap().ai_speaks_first, Some(true));
        assert!(config.dialog.as_ref().unwrap().step_deadline_seconds.is_none());
        assert!(config.session.is_none());
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("").unwrap();

        assert!(config.server.is_none());
        assert!(config.dialog.is_none());
        assert!(config.session.is_none());
        assert!(config.security.is_none());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        fs::write(
            &config_path,
            "server:\n  host: \"localhost\"\n  port: 3000\n",
        )
        .unwrap();

        let config = YamlConfig::from_file(&config_path).unwrap();

        assert_eq!(
            config.server.as_ref().unwrap().host,
            Some("localhost".to_string())
        );
        assert_eq!(config.server.as_ref().unwrap().port, Some(3000));
    }

    #[test]
    fn test_from_file_not_found() {
        let path = PathBuf::from("/nonexistent/config.yaml");
        let result = YamlConfig::from_file(&path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");

        fs::write(&config_path, "invalid: yaml: content:").unwrap();

        let result = YamlConfig::from_file(&config_path);

        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML")
        );
    }
}
