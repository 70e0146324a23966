//! Plivo bidirectional audio streaming.
//!
//! This module turns one Plivo media stream WebSocket into typed events
//! delivered to application handlers, and gives those handlers a session
//! handle for sending audio and control frames back.
//!
//! # Components
//!
//! - [`messages`] - frame codec: inbound/outbound event types
//! - [`CallbackRegistry`] - one handler per event kind plus lifecycle slots,
//!   and optional raw hooks that see the whole JSON frame
//! - [`StreamingHandler`] - connection lifecycle engine
//! - [`StreamSession`] - outbound helpers, identifiers, `stop()`
//! - [`StreamTransport`] - what the engine needs from a WebSocket
//!
//! # Processing Model
//!
//! Frames are handled strictly one at a time in arrival order. The next
//! frame is not read from the socket until the current handler finished,
//! so a slow handler throttles the inbound stream.
//!
//! # Example
//!
//! ```rust,ignore
//! use plivo_stream::core::stream::{StreamingHandler, DtmfEvent};
//!
//! let mut handler = StreamingHandler::new(transport);
//! let session = handler.session();
//!
//! handler
//!     .on_dtmf(move |event: DtmfEvent| {
//!         let session = session.clone();
//!         async move {
//!             if event.dtmf.digit == '*' {
//!                 session.send_clear_audio().await?;
//!             }
//!             Ok(())
//!         }
//!     })
//!     .on_error(|err| async move {
//!         tracing::warn!("stream error: {err}");
//!         Ok(())
//!     });
//!
//! handler.start().await?;
//! ```

mod base;
mod config;
mod handler;
mod isolation;
pub mod messages;
mod registry;
mod session;


pub use base::{
    BoxError, CallbackFuture, ClearedAudioCallback, ConnectionCallback, ConnectionState,
    DtmfCallback, ErrorCallback, EventCallback, HandlerError, HandlerResult, MediaCallback,
    ParseError, PlayedStreamCallback, RawEventCallback, StartCallback, StreamError, StreamResult,
    StreamTransport, TransportError,
};
pub use config::{DEFAULT_CONTENT_TYPE, DEFAULT_SAMPLE_RATE, StreamConfig, UnknownEventPolicy};
pub use handler::StreamingHandler;
pub use isolation::call_handler_isolated;
pub use messages::{
    AudioPayload, ClearedAudioEvent, DecodedFrame, DtmfData, DtmfEvent, EventKind, InboundEvent,
    MediaData, MediaEvent, MediaFormat, OutboundEvent, PlayAudioMedia, PlayedStreamEvent,
    RawFrame, StartData, StartEvent, decode_frame,
};
pub use registry::CallbackRegistry;
pub use session::{FrameStats, StreamIdentity, StreamSession};
