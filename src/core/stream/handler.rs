//! Connection lifecycle engine.
//!
//! [`StreamingHandler`] owns one transport and one [`CallbackRegistry`].
//! `start()` accepts the transport, runs `connected`, processes frames one
//! at a time until the peer disconnects or [`StreamSession::stop`] is
//! called, then closes the transport and runs `disconnected`.
//!
//! ```text
//! Init --start()--> Accepting --ok--> Running --disconnect/stop--> Disconnected
//!                       |
//!                       +--handshake failed--> Failed
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use plivo_stream::core::stream::{HandlerResult, MediaEvent, StreamingHandler};
//! use plivo_stream::transport::AxumTransport;
//! # async fn run(socket: axum::extract::ws::WebSocket) {
//! let mut handler = StreamingHandler::new(AxumTransport::new(socket));
//! let session = handler.session();
//!
//! handler.on_media(move |event: MediaEvent| {
//!     let session = session.clone();
//!     async move {
//!         let audio = event.raw_media()?;
//!         session.send_media_default(audio).await?;
//!         HandlerResult::Ok(())
//!     }
//! });
//!
//! if let Err(e) = handler.start().await {
//!     eprintln!("stream failed: {e}");
//! }
//! # }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::base::{
    ConnectionState, HandlerResult, ParseError, StreamError, StreamResult, StreamTransport,
    TransportError,
};
use super::config::{StreamConfig, UnknownEventPolicy};
use super::messages::{
    ClearedAudioEvent, DecodedFrame, DtmfEvent, EventKind, InboundEvent, MediaEvent,
    PlayedStreamEvent, RawFrame, StartEvent,
};
use super::registry::CallbackRegistry;
use super::session::StreamSession;

// =============================================================================
// Frame Order Observation
// =============================================================================

/// Tracks sequence numbers and per-track chunk counters.
///
/// Violations are reported, never enforced.
#[derive(Debug, Default)]
pub(crate) struct FrameOrder {
    last_sequence: Option<u64>,
    last_chunk: HashMap<String, u64>,
}

/// What [`FrameOrder::observe`] found wrong with a frame.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct OrderViolations {
    pub sequence_regression: bool,
    pub chunk_gap: bool,
}

impl FrameOrder {
    pub(crate) fn observe(&mut self, event: &InboundEvent) -> OrderViolations {
        let mut violations = OrderViolations::default();
        let sequence = event.sequence_number();

        if let Some(last) = self.last_sequence
            && sequence < last
        {
            warn!(last, sequence, event = %event.kind(), "Sequence number went backwards");
            violations.sequence_regression = true;
        }
        self.last_sequence = Some(sequence);

        if let InboundEvent::Media(media) = event {
            let chunk = media.media.chunk;
            let previous = self.last_chunk.insert(media.media.track.clone(), chunk);
            if let Some(previous) = previous
                && previous.checked_add(1) != Some(chunk)
            {
                warn!(
                    track = %media.media.track,
                    previous,
                    chunk,
                    "Media chunk out of order"
                );
                violations.chunk_gap = true;
            }
        }

        violations
    }
}

// =============================================================================
// Streaming Handler
// =============================================================================

/// Drives one Plivo media stream connection.
pub struct StreamingHandler {
    session: StreamSession,
    registry: CallbackRegistry,
    order: FrameOrder,
}

impl StreamingHandler {
    /// Create a handler with the default [`StreamConfig`].
    pub fn new<T>(transport: T) -> Self
    where
        T: StreamTransport + 'static,
    {
        Self::with_config(transport, StreamConfig::default())
    }

    /// Create a handler with an explicit configuration.
    pub fn with_config<T>(transport: T, config: StreamConfig) -> Self
    where
        T: StreamTransport + 'static,
    {
        Self::from_shared(Arc::new(transport), config)
    }

    /// Create a handler over a transport that is already shared.
    pub fn from_shared(transport: Arc<dyn StreamTransport>, config: StreamConfig) -> Self {
        Self {
            session: StreamSession::new(transport, config),
            registry: CallbackRegistry::new(),
            order: FrameOrder::default(),
        }
    }

    /// Handle for sending frames and reading identifiers from inside handlers.
    pub fn session(&self) -> StreamSession {
        self.session.clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.session.state()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    pub fn on_start<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(StartEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.on_start(handler);
        self
    }

    pub fn on_media<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(MediaEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.on_media(handler);
        self
    }

    pub fn on_dtmf<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(DtmfEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.on_dtmf(handler);
        self
    }

    pub fn on_played_stream<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(PlayedStreamEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.on_played_stream(handler);
        self
    }

    pub fn on_cleared_audio<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(ClearedAudioEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.on_cleared_audio(handler);
        self
    }

    /// Register a raw hook that sees the whole JSON frame of `kind` before
    /// the typed handler runs.
    pub fn on_event<F, Fut>(&mut self, kind: EventKind, handler: F) -> &mut Self
    where
        F: Fn(EventKind, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.on_event(kind, handler);
        self
    }

    pub fn on_connected<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.on_connected(handler);
        self
    }

    pub fn on_disconnected<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.on_disconnected(handler);
        self
    }

    pub fn on_error<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(StreamError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.on_error(handler);
        self
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Accept the transport and process frames until the connection ends.
    ///
    /// Returns `Ok(())` after a normal disconnect or `stop()`.
    ///
    /// # Errors
    ///
    /// [`StreamError::AcceptFailed`] when the handshake fails. The error is
    /// also delivered to the `error` handler; `connected` and `disconnected`
    /// are not run.
    pub async fn start(mut self) -> StreamResult<()> {
        self.session.set_state(ConnectionState::Accepting);

        if let Err(e) = self.session.transport().accept().await {
            error!(error = %e, "Failed to accept WebSocket");
            self.session.set_state(ConnectionState::Failed);
            self.session.shutdown_token().cancel();
            self.registry
                .report_error(StreamError::AcceptFailed(e.clone()))
                .await;
            return Err(StreamError::AcceptFailed(e));
        }

        self.session.set_state(ConnectionState::Running);
        info!("Media stream connected");

        if let Err(e) = self.registry.notify_connected().await {
            self.registry.report_error(e).await;
        }

        self.run_loop().await;

        self.session.shutdown_token().cancel();
        self.session.close_transport().await;
        self.session.set_state(ConnectionState::Disconnected);

        let stats = self.session.stats();
        info!(
            stream_id = ?self.session.get_stream_id(),
            frames = stats.frames_received,
            parse_errors = stats.parse_errors,
            "Media stream disconnected"
        );

        if let Err(e) = self.registry.notify_disconnected().await {
            self.registry.report_error(e).await;
        }

        Ok(())
    }

    async fn run_loop(&mut self) {
        let shutdown = self.session.shutdown_token().clone();
        let transport = self.session.transport().clone();

        loop {
            let received = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("Stop requested, leaving receive loop");
                    break;
                }
                received = transport.receive() => received,
            };

            match received {
                Ok(Some(text)) => self.process_frame(&text).await,
                Ok(None) => {
                    debug!("Peer closed the connection");
                    break;
                }
                Err(TransportError::NotConnected) => {
                    debug!("Transport no longer connected");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Transport receive error");
                    self.registry.report_error(StreamError::Transport(e)).await;
                }
            }
        }
    }

    /// Decode one frame, dispatch it, and route any failure to `error`.
    async fn process_frame(&mut self, text: &str) {
        self.session
            .update_stats(|stats| stats.frames_received += 1);

        let frame = match RawFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                self.report_parse_error(e).await;
                return;
            }
        };

        if let Some(kind) = frame.kind()
            && self.registry.has_raw_hook(kind)
            && let Err(e) = self.registry.dispatch_raw(kind, frame.value().clone()).await
        {
            self.registry.report_error(e).await;
        }

        let event = match frame.decode() {
            Ok(DecodedFrame::Event(event)) => event,
            Ok(DecodedFrame::Unknown(name)) => {
                self.session.update_stats(|stats| stats.unknown_events += 1);
                match self.session.config().unknown_events {
                    UnknownEventPolicy::Report => {
                        self.registry
                            .report_error(StreamError::UnknownEvent(name))
                            .await;
                    }
                    UnknownEventPolicy::Ignore => {
                        debug!(event = %name, "Ignoring unknown event");
                    }
                }
                return;
            }
            Err(e) => {
                self.report_parse_error(e).await;
                return;
            }
        };

        debug!(
            event = %event.kind(),
            sequence = event.sequence_number(),
            "Received frame"
        );

        if let InboundEvent::Start(start) = &event {
            self.session.record_start(&start.start);
        }

        let violations = self.order.observe(&event);
        if violations.sequence_regression || violations.chunk_gap {
            self.session.update_stats(|stats| {
                if violations.sequence_regression {
                    stats.sequence_regressions += 1;
                }
                if violations.chunk_gap {
                    stats.chunk_gaps += 1;
                }
            });
        }

        if let Err(e) = self.registry.dispatch(event).await {
            self.registry.report_error(e).await;
        }
    }

    async fn report_parse_error(&self, err: ParseError) {
        debug!(error = %err, "Failed to decode frame");
        self.session.update_stats(|stats| stats.parse_errors += 1);
        self.registry.report_error(err.into()).await;
    }
}

impl std::fmt::Debug for StreamingHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingHandler")
            .field("session", &self.session)
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stream::messages::{MediaData, MediaFormat, StartData};

    fn media(seq: u64, track: &str, chunk: u64) -> InboundEvent {
        InboundEvent::Media(MediaEvent {
            sequence_number: seq,
            stream_id: "S1".to_string(),
            media: MediaData {
                track: track.to_string(),
                timestamp: chunk.saturating_mul(20).to_string(),
                chunk,
                payload: String::new(),
            },
            extra_headers: String::new(),
        })
    }

    #[test]
    fn test_frame_order_in_sequence() {
        let mut order = FrameOrder::default();
        for i in 1..=5 {
            assert_eq!(order.observe(&media(i, "inbound", i)), OrderViolations::default());
        }
    }

    #[test]
    fn test_frame_order_sequence_regression() {
        let mut order = FrameOrder::default();
        order.observe(&media(10, "inbound", 1));
        let violations = order.observe(&media(9, "inbound", 2));
        assert!(violations.sequence_regression);
        assert!(!violations.chunk_gap);
    }

    #[test]
    fn test_frame_order_chunk_gap_per_track() {
        let mut order = FrameOrder::default();
        order.observe(&media(1, "inbound", 1));
        order.observe(&media(2, "outbound", 1));
        assert!(!order.observe(&media(3, "inbound", 2)).chunk_gap);
        assert!(order.observe(&media(4, "outbound", 3)).chunk_gap);
    }

    #[test]
    fn test_frame_order_chunk_counter_at_max() {
        let mut order = FrameOrder::default();
        assert!(!order.observe(&media(1, "inbound", u64::MAX)).chunk_gap);
        assert!(order.observe(&media(2, "inbound", 1)).chunk_gap);
        assert!(!order.observe(&media(3, "inbound", 2)).chunk_gap);
    }

    #[test]
    fn test_frame_order_equal_sequence_is_not_regression() {
        let mut order = FrameOrder::default();
        let start = InboundEvent::Start(StartEvent {
            sequence_number: 0,
            start: StartData {
                call_id: "C1".to_string(),
                stream_id: "S1".to_string(),
                account_id: "A1".to_string(),
                tracks: vec!["inbound".to_string()],
                media_format: MediaFormat {
                    encoding: "audio/x-mulaw".to_string(),
                    sample_rate: 8000,
                },
            },
            extra_headers: String::new(),
        });
        order.observe(&start);
        assert!(!order.observe(&media(0, "inbound", 1)).sequence_regression);
    }
}
