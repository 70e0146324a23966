//! Per-connection settings for the streaming engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Default outbound content type (8 kHz mu-law, what Plivo sends inbound).
pub const DEFAULT_CONTENT_TYPE: &str = "audio/x-mulaw";

/// Default outbound sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 8000;

/// What to do with a frame whose `event` value is not recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownEventPolicy {
    /// Deliver [`StreamError::UnknownEvent`](super::StreamError::UnknownEvent) to the error handler
    #[default]
    Report,
    /// Drop the frame with a debug log
    Ignore,
}

impl fmt::Display for UnknownEventPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownEventPolicy::Report => write!(f, "report"),
            UnknownEventPolicy::Ignore => write!(f, "ignore"),
        }
    }
}

impl FromStr for UnknownEventPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "report" => Ok(UnknownEventPolicy::Report),
            "ignore" => Ok(UnknownEventPolicy::Ignore),
            other => Err(format!(
                "Invalid unknown event policy '{other}'. Expected 'report' or 'ignore'"
            )),
        }
    }
}

/// Configuration for one streaming connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Handling of unrecognized event kinds
    #[serde(default)]
    pub unknown_events: UnknownEventPolicy,
    /// Content type used by `send_media_default`
    #[serde(default = "default_content_type")]
    pub default_content_type: String,
    /// Sample rate used by `send_media_default`
    #[serde(default = "default_sample_rate")]
    pub default_sample_rate: u32,
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            unknown_events: UnknownEventPolicy::default(),
            default_content_type: default_content_type(),
            default_sample_rate: default_sample_rate(),
        }
    }
}

impl StreamConfig {
    /// Set the unknown event policy.
    pub fn with_unknown_events(mut self, policy: UnknownEventPolicy) -> Self {
        self.unknown_events = policy;
        self
    }

    /// Set the default outbound audio format.
    pub fn with_default_audio(mut self, content_type: impl Into<String>, sample_rate: u32) -> Self {
        self.default_content_type = content_type.into();
        self.default_sample_rate = sample_rate;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StreamConfig::default();
        assert_eq!(config.unknown_events, UnknownEventPolicy::Report);
        assert_eq!(config.default_content_type, "audio/x-mulaw");
        assert_eq!(config.default_sample_rate, 8000);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("report".parse(), Ok(UnknownEventPolicy::Report));
        assert_eq!(" IGNORE ".parse(), Ok(UnknownEventPolicy::Ignore));
        assert!("drop".parse::<UnknownEventPolicy>().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: StreamConfig = serde_json::from_str(r#"{"unknown_events":"ignore"}"#).unwrap();
        assert_eq!(config.unknown_events, UnknownEventPolicy::Ignore);
        assert_eq!(config.default_sample_rate, 8000);
    }

    #[test]
    fn test_builders() {
        let config = StreamConfig::default()
            .with_unknown_events(UnknownEventPolicy::Ignore)
            .with_default_audio("audio/x-l16", 16000);
        assert_eq!(config.default_content_type, "audio/x-l16");
        assert_eq!(config.default_sample_rate, 16000);
        assert_eq!(config.unknown_events.to_string(), "ignore");
    }
}
