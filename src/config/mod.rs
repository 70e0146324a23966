//! Configuration for the demo streaming server
//!
//! Configuration comes from .env files, environment variables and an
//! optional YAML file. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Example
//! ```rust,no_run
//! use plivo_stream::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file on top of environment variables
//! let config = ServerConfig::from_file(&PathBuf::from("config.yaml"))?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

mod yaml;

pub use yaml::{ServerYaml, StreamYaml, YamlConfig};

use crate::core::stream::{
    DEFAULT_CONTENT_TYPE, DEFAULT_SAMPLE_RATE, StreamConfig, UnknownEventPolicy,
};
use crate::routes::api::RESERVED_PATHS;

/// Server configuration
///
/// Contains everything the demo server needs:
/// - Listener settings (host, port)
/// - The public base URL Plivo should dial for the stream
/// - Outbound audio format and unknown-event handling for each connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    /// Base URL (`ws://` or `wss://`) advertised in the answer XML. When
    /// unset the URL is built from the request's `Host` header.
    pub public_url: Option<String>,

    /// Path of the media stream WebSocket route
    pub stream_path: String,

    // Outbound audio format
    pub audio_content_type: String,
    pub audio_sample_rate: u32,

    /// Handling of unrecognized inbound events
    pub unknown_events: UnknownEventPolicy,

    /// Whether the demo application plays inbound audio back to the caller
    pub echo_media: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            public_url: None,
            stream_path: "/stream".to_string(),
            audio_content_type: DEFAULT_CONTENT_TYPE.to_string(),
            audio_sample_rate: DEFAULT_SAMPLE_RATE,
            unknown_events: UnknownEventPolicy::default(),
            echo_media: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// The .env file is loaded in main.rs at startup, so its values are
    /// already visible here as environment variables.
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid format or validation fails.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Self::merge(None)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = YamlConfig::from_file(path)?;
        let config = Self::merge(Some(yaml_config))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then environment variables, then YAML values.
    fn merge(yaml: Option<YamlConfig>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = Self::default();

        if let Some(host) = env_string("HOST") {
            config.host = host;
        }
        if let Some(port) = env_parse("PORT")? {
            config.port = port;
        }
        if let Some(url) = env_string("PUBLIC_URL") {
            config.public_url = Some(url);
        }
        if let Some(path) = env_string("STREAM_PATH") {
            config.stream_path = path;
        }
        if let Some(content_type) = env_string("AUDIO_CONTENT_TYPE") {
            config.audio_content_type = content_type;
        }
        if let Some(rate) = env_parse("AUDIO_SAMPLE_RATE")? {
            config.audio_sample_rate = rate;
        }
        if let Some(policy) = env_parse("UNKNOWN_EVENT_POLICY")? {
            config.unknown_events = policy;
        }
        if let Some(echo) = env_string("ECHO_MEDIA") {
            config.echo_media = parse_bool(&echo)
                .ok_or_else(|| format!("Invalid ECHO_MEDIA value '{echo}'"))?;
        }

        let Some(yaml) = yaml else {
            return Ok(config);
        };

        if let Some(server) = yaml.server {
            if let Some(host) = server.host {
                config.host = host;
            }
            if let Some(port) = server.port {
                config.port = port;
            }
            if let Some(url) = server.public_url {
                config.public_url = Some(url);
            }
        }

        if let Some(stream) = yaml.stream {
            if let Some(path) = stream.path {
                config.stream_path = path;
            }
            if let Some(content_type) = stream.audio_content_type {
                config.audio_content_type = content_type;
            }
            if let Some(rate) = stream.audio_sample_rate {
                config.audio_sample_rate = rate;
            }
            if let Some(policy) = stream.unknown_events {
                config.unknown_events = policy;
            }
            if let Some(echo) = stream.echo_media {
                config.echo_media = echo;
            }
        }

        Ok(config)
    }

    /// Check the merged configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port must be non-zero".to_string());
        }
        if self.audio_sample_rate == 0 {
            return Err("Audio sample rate must be greater than zero".to_string());
        }
        if !self.stream_path.starts_with('/') {
            return Err(format!(
                "Stream path '{}' must start with '/'",
                self.stream_path
            ));
        }
        if RESERVED_PATHS.contains(&self.stream_path.as_str()) {
            return Err(format!(
                "Stream path '{}' is already used by an HTTP route",
                self.stream_path
            ));
        }
        if let Some(url) = &self.public_url
            && !(url.starts_with("ws://") || url.starts_with("wss://"))
        {
            return Err(format!("Public URL '{url}' must start with ws:// or wss://"));
        }
        Ok(())
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Per-connection settings derived from this configuration.
    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig::default()
            .with_unknown_events(self.unknown_events)
            .with_default_audio(self.audio_content_type.clone(), self.audio_sample_rate)
    }

    /// WebSocket URL Plivo should connect to.
    ///
    /// Uses `public_url` when set, otherwise `ws://<host_header>`, falling
    /// back to the listen address.
    pub fn stream_url(&self, host_header: Option<&str>) -> String {
        match &self.public_url {
            Some(base) => format!("{}{}", base.trim_end_matches('/'), self.stream_path),
            None => {
                let host = host_header
                    .map(str::to_string)
                    .unwrap_or_else(|| self.address());
                format!("ws://{}{}", host, self.stream_path)
            }
        }
    }

    /// `contentType` attribute of the answer XML, e.g. `audio/x-mulaw;rate=8000`.
    pub fn stream_content_type(&self) -> String {
        format!("{};rate={}", self.audio_content_type, self.audio_sample_rate)
    }
}

fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: Display,
{
    env_string(name)
        .map(|value| {
            value
                .parse()
                .map_err(|e| format!("Invalid {name} value '{value}': {e}"))
        })
        .transpose()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
