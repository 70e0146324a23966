pub mod stream;

// Re-export commonly used types for convenience
pub use stream::{
    AudioPayload, ConnectionState, EventKind, HandlerResult, InboundEvent, OutboundEvent,
    StreamConfig, StreamError, StreamResult, StreamSession, StreamTransport, StreamingHandler,
    TransportError, UnknownEventPolicy,
};
