use serde::Deserialize;
use std::path::PathBuf;

use crate::core::stream::UnknownEventPolicy;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present
/// here override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8080
///   public_url: "wss://voice.example.com"
///
/// stream:
///   path: "/stream"
///   audio_content_type: "audio/x-mulaw"
///   audio_sample_rate: 8000
///   unknown_events: "ignore"
///   echo_media: true
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub stream: Option<StreamYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_url: Option<String>,
}

/// Media stream configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StreamYaml {
    pub path: Option<String>,
    pub audio_content_type: Option<String>,
    pub audio_sample_rate: Option<u32>,
    pub unknown_events: Option<UnknownEventPolicy>,
    pub echo_media: Option<bool>,
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
  port: 9000
  public_url: "wss://voice.example.com"

stream:
  path: "/plivo"
  audio_content_type: "audio/x-l16"
  audio_sample_rate: 16000
  unknown_events: "ignore"
  echo_media: false
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let server = config.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(server.port, Some(9000));
        assert_eq!(server.public_url.as_deref(), Some("wss://voice.example.com"));

        let stream = config.stream.unwrap();
        assert_eq!(stream.path.as_deref(), Some("/plivo"));
        assert_eq!(stream.audio_content_type.as_deref(), Some("audio/x-l16"));
        assert_eq!(stream.audio_sample_rate, Some(16000));
        assert_eq!(stream.unknown_events, Some(UnknownEventPolicy::Ignore));
        assert_eq!(stream.echo_media, Some(false));
    }

    #[test]
    fn test_yaml_config_partial() {
        let config: YamlConfig = serde_yaml::from_str("server:\n  port: 8081\n").unwrap();
        assert_eq!(config.server.unwrap().port, Some(8081));
        assert!(config.stream.is_none());
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.server.is_none());
        assert!(config.stream.is_none());
    }

    #[test]
    fn test_yaml_config_invalid_policy() {
        let result: Result<YamlConfig, _> =
            serde_yaml::from_str("stream:\n  unknown_events: \"drop\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_yaml_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "stream:\n  audio_sample_rate: 8000\n").unwrap();

        let config = YamlConfig::from_file(&path).unwrap();
        assert_eq!(config.stream.unwrap().audio_sample_rate, Some(8000));
    }

    #[test]
    fn test_yaml_from_missing_file() {
        let result = YamlConfig::from_file(&PathBuf::from("/nonexistent/config.yaml"));
        assert!(result.unwrap_err().to_string().contains("Failed to read config file"));
    }
}
