//! Base traits and types for the media stream connection engine.
//!
//! This module defines the error taxonomy, the callback signatures that
//! application handlers implement, the connection state machine and the
//! transport capability set every host environment has to provide.
//!
//! # Error Channels
//!
//! - [`ParseError`] - malformed or schema-violating inbound frame
//! - [`StreamError::UnknownEvent`] - valid JSON with an unrecognized `event`
//! - [`HandlerError`] - an application callback failed or panicked
//! - [`TransportError`] - the socket failed to accept, send, receive or close

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use super::messages::{
    ClearedAudioEvent, DtmfEvent, EventKind, MediaEvent, PlayedStreamEvent, StartEvent,
};

// =============================================================================
// Error Types
// =============================================================================

/// Boxed error returned by application handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result returned by every application handler.
pub type HandlerResult = Result<(), BoxError>;

/// Errors produced while decoding an inbound frame.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The frame is not valid JSON
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The frame is JSON but not an object
    #[error("Frame is not a JSON object")]
    NotAnObject,

    /// The `event` discriminator is missing or not a string
    #[error("Missing 'event' field")]
    MissingEvent,

    /// A required field for the matched event is absent or has the wrong type
    #[error("Invalid '{event}' frame: {source}")]
    InvalidPayload {
        /// Event kind the frame claimed to be
        event: EventKind,
        /// Underlying field error
        #[source]
        source: serde_json::Error,
    },
}

/// Failure raised by an application callback.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler returned an error
    #[error("{0}")]
    Failed(BoxError),

    /// The handler panicked
    #[error("Handler panicked: {0}")]
    Panicked(String),
}

/// Errors reported by a transport adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The WebSocket handshake failed
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// Sending a frame failed
    #[error("Send failed: {0}")]
    Send(String),

    /// Receiving a frame failed without closing the connection
    #[error("Receive failed: {0}")]
    Receive(String),

    /// Closing the socket failed
    #[error("Close failed: {0}")]
    Close(String),

    /// The socket has not been accepted yet or is already gone
    #[error("WebSocket not connected")]
    NotConnected,
}

/// Errors surfaced by the connection engine and its session handle.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Inbound frame could not be decoded
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Inbound frame carried an event kind this crate does not know
    #[error("Unknown event type: {0}")]
    UnknownEvent(String),

    /// An application callback failed
    #[error("Handler for '{event}' failed: {source}")]
    Handler {
        /// Event or lifecycle slot whose handler failed
        event: &'static str,
        /// What went wrong
        #[source]
        source: HandlerError,
    },

    /// The initial handshake failed
    #[error("Accept failed: {0}")]
    AcceptFailed(#[source] TransportError),

    /// Transport failure after the connection was accepted
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// An outbound event could not be serialized
    #[error("Failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),

    /// An outbound helper needs the stream id but no `start` frame arrived yet
    #[error("streamId not available. Wait for 'start' event first.")]
    StreamNotStarted,
}

impl StreamError {
    /// Whether this error was raised by an application callback.
    pub fn is_handler_error(&self) -> bool {
        matches!(self, StreamError::Handler { .. })
    }

    /// Whether this error came from decoding an inbound frame.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, StreamError::Parse(_))
    }
}

/// Result type for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;

// =============================================================================
// Connection State
// =============================================================================

/// Lifecycle state of one streaming connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Created, `start()` not called yet
    #[default]
    Init,
    /// Performing the transport handshake
    Accepting,
    /// Receive loop is active
    Running,
    /// Loop exited and the transport was closed
    Disconnected,
    /// The handshake failed; the connection never ran
    Failed,
}

impl ConnectionState {
    /// Whether the state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Disconnected | ConnectionState::Failed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Init => write!(f, "Init"),
            ConnectionState::Accepting => write!(f, "Accepting"),
            ConnectionState::Running => write!(f, "Running"),
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Failed => write!(f, "Failed"),
        }
    }
}

// =============================================================================
// Callback Types
// =============================================================================

/// Boxed future returned by every callback.
pub type CallbackFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Callback invoked with one typed inbound event.
pub type EventCallback<E> = Arc<dyn Fn(E) -> CallbackFuture<HandlerResult> + Send + Sync>;

/// Callback type for `start` events.
pub type StartCallback = EventCallback<StartEvent>;

/// Callback type for `media` events.
pub type MediaCallback = EventCallback<MediaEvent>;

/// Callback type for `dtmf` events.
pub type DtmfCallback = EventCallback<DtmfEvent>;

/// Callback type for `playedStream` events.
pub type PlayedStreamCallback = EventCallback<PlayedStreamEvent>;

/// Callback type for `clearedAudio` events.
pub type ClearedAudioCallback = EventCallback<ClearedAudioEvent>;

/// Callback receiving the whole JSON frame of one known kind before it is
/// decoded into a typed event.
pub type RawEventCallback =
    Arc<dyn Fn(EventKind, Value) -> CallbackFuture<HandlerResult> + Send + Sync>;

/// Callback type for connection lifecycle events (connected / disconnected).
pub type ConnectionCallback = Arc<dyn Fn() -> CallbackFuture<HandlerResult> + Send + Sync>;

/// Callback type for error events.
pub type ErrorCallback = Arc<dyn Fn(StreamError) -> CallbackFuture<HandlerResult> + Send + Sync>;

// =============================================================================
// Transport Trait
// =============================================================================

/// Capability set the connection engine needs from a WebSocket.
///
/// Implementations exist for a socket already upgraded by `axum`
/// ([`crate::transport::AxumTransport`]) and for a raw byte stream that
/// performs its own handshake ([`crate::transport::TungsteniteTransport`]).
///
/// Methods take `&self` so that outbound sends can run while the receive
/// loop is parked on [`StreamTransport::receive`]; implementations keep the
/// read and write halves behind separate locks.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Complete the WebSocket handshake.
    ///
    /// Calling this again after a successful accept is a no-op.
    async fn accept(&self) -> Result<(), TransportError>;

    /// Wait for the next text frame.
    ///
    /// Returns `Ok(None)` once the peer closed the connection. Non-text
    /// control frames are consumed internally and never returned.
    async fn receive(&self) -> Result<Option<String>, TransportError>;

    /// Send one text frame.
    async fn send(&self, text: String) -> Result<(), TransportError>;

    /// Close the socket.
    async fn close(&self) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Init.to_string(), "Init");
        assert_eq!(ConnectionState::Running.to_string(), "Running");
        assert_eq!(ConnectionState::Disconnected.to_string(), "Disconnected");
    }

    #[test]
    fn test_connection_state_terminal() {
        assert!(!ConnectionState::Init.is_terminal());
        assert!(!ConnectionState::Accepting.is_terminal());
        assert!(!ConnectionState::Running.is_terminal());
        assert!(ConnectionState::Disconnected.is_terminal());
        assert!(ConnectionState::Failed.is_terminal());
    }

    #[test]
    fn test_error_display() {
        let err = StreamError::StreamNotStarted;
        assert!(err.to_string().contains("Wait for 'start' event"));

        let err = StreamError::UnknownEvent("mark".to_string());
        assert_eq!(err.to_string(), "Unknown event type: mark");

        let err = StreamError::Transport(TransportError::NotConnected);
        assert_eq!(err.to_string(), "Transport error: WebSocket not connected");
    }

    #[test]
    fn test_handler_error_display() {
        let err = StreamError::Handler {
            event: "media",
            source: HandlerError::Failed("boom".into()),
        };
        assert!(err.is_handler_error());
        assert_eq!(err.to_string(), "Handler for 'media' failed: boom");

        let err = StreamError::Handler {
            event: "dtmf",
            source: HandlerError::Panicked("oops".to_string()),
        };
        assert!(err.to_string().contains("Handler panicked: oops"));
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: StreamError = ParseError::MissingEvent.into();
        assert!(err.is_parse_error());
        assert!(!err.is_handler_error());
        assert_eq!(err.to_string(), "Parse error: Missing 'event' field");
    }
}
