//! Cloneable handle to one streaming connection.
//!
//! Handlers capture a [`StreamSession`] to send audio back, place
//! checkpoints, flush queued audio, read the identifiers from the `start`
//! event, or stop the connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::base::{ConnectionState, StreamError, StreamResult, StreamTransport};
use super::config::StreamConfig;
use super::messages::{AudioPayload, OutboundEvent, StartData};

/// Identifiers captured from the `start` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamIdentity {
    pub stream_id: String,
    pub call_id: String,
    pub account_id: String,
}

/// Counters kept by the receive loop.
///
/// Ordering problems are only counted and logged; frames are still
/// dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Text frames read from the transport
    pub frames_received: u64,
    /// Frames that failed to decode
    pub parse_errors: u64,
    /// Frames with an unrecognized `event` value
    pub unknown_events: u64,
    /// Frames whose sequence number was lower than the previous one
    pub sequence_regressions: u64,
    /// Media frames whose chunk number did not follow the previous one on the same track
    pub chunk_gaps: u64,
}

struct SessionInner {
    transport: Arc<dyn StreamTransport>,
    config: StreamConfig,
    identity: RwLock<Option<StreamIdentity>>,
    state: RwLock<ConnectionState>,
    stats: Mutex<FrameStats>,
    shutdown: CancellationToken,
    closed: AtomicBool,
}

/// Handle shared between the engine and application handlers.
#[derive(Clone)]
pub struct StreamSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("identity", &*self.inner.identity.read())
            .field("state", &*self.inner.state.read())
            .finish()
    }
}

impl StreamSession {
    pub(crate) fn new(transport: Arc<dyn StreamTransport>, config: StreamConfig) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                transport,
                config,
                identity: RwLock::new(None),
                state: RwLock::new(ConnectionState::Init),
                stats: Mutex::new(FrameStats::default()),
                shutdown: CancellationToken::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    /// Queue audio for playback on the call.
    ///
    /// [`AudioPayload::Raw`] bytes (from `Vec<u8>`, `&[u8]` or `Bytes`) are
    /// base64 encoded by this call. Text that is already base64 must be
    /// wrapped with [`AudioPayload::base64`] and is sent verbatim.
    pub async fn send_media(
        &self,
        payload: impl Into<AudioPayload>,
        content_type: impl Into<String>,
        sample_rate: u32,
    ) -> StreamResult<()> {
        self.send_event(OutboundEvent::play_audio(payload, content_type, sample_rate))
            .await
    }

    /// Queue audio using the configured default content type and sample rate.
    pub async fn send_media_default(&self, payload: impl Into<AudioPayload>) -> StreamResult<()> {
        let config = &self.inner.config;
        self.send_media(
            payload,
            config.default_content_type.clone(),
            config.default_sample_rate,
        )
        .await
    }

    /// Mark the current point in the outbound audio.
    ///
    /// Plivo answers with a `playedStream` event carrying `name` once the
    /// audio queued before this checkpoint has played.
    ///
    /// # Errors
    ///
    /// [`StreamError::StreamNotStarted`] before the `start` event arrived.
    pub async fn send_checkpoint(&self, name: impl Into<String>) -> StreamResult<()> {
        let stream_id = self.require_stream_id()?;
        self.send_event(OutboundEvent::checkpoint(stream_id, name))
            .await
    }

    /// Discard queued audio that has not played yet (barge-in).
    ///
    /// # Errors
    ///
    /// [`StreamError::StreamNotStarted`] before the `start` event arrived.
    pub async fn send_clear_audio(&self) -> StreamResult<()> {
        let stream_id = self.require_stream_id()?;
        self.send_event(OutboundEvent::clear_audio(stream_id)).await
    }

    /// Send a raw text frame.
    pub async fn send_text(&self, text: impl Into<String>) -> StreamResult<()> {
        self.inner.transport.send(text.into()).await?;
        Ok(())
    }

    /// Serialize `value` and send it as a text frame.
    pub async fn send_json(&self, value: &Value) -> StreamResult<()> {
        self.send_text(value.to_string()).await
    }

    async fn send_event(&self, event: OutboundEvent) -> StreamResult<()> {
        debug!(event = event.event_name(), "Sending frame");
        self.send_text(event.to_json()?).await
    }

    fn require_stream_id(&self) -> StreamResult<String> {
        self.get_stream_id().ok_or(StreamError::StreamNotStarted)
    }

    // =========================================================================
    // Control
    // =========================================================================

    /// Ask the receive loop to exit and close the transport.
    ///
    /// Idempotent. A handler that is currently running is not interrupted;
    /// the loop exits once it returns.
    pub async fn stop(&self) {
        if !self.inner.shutdown.is_cancelled() {
            info!(stream_id = ?self.get_stream_id(), "Stopping stream");
        }
        self.inner.shutdown.cancel();
        self.close_transport().await;
    }

    /// Whether `stop()` was requested or the loop already exited.
    pub fn is_stopped(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Whether the receive loop is active.
    pub fn is_running(&self) -> bool {
        self.state() == ConnectionState::Running && !self.is_stopped()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.read()
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        *self.inner.state.write() = state;
    }

    pub(crate) fn shutdown_token(&self) -> &CancellationToken {
        &self.inner.shutdown
    }

    pub(crate) fn transport(&self) -> &Arc<dyn StreamTransport> {
        &self.inner.transport
    }

    /// Close the transport once; later calls do nothing and close errors are logged.
    pub(crate) async fn close_transport(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.inner.transport.close().await {
            warn!(error = %e, "Failed to close transport");
        }
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Stream id from the `start` event, `None` before it arrived.
    pub fn get_stream_id(&self) -> Option<String> {
        self.inner
            .identity
            .read()
            .as_ref()
            .map(|id| id.stream_id.clone())
    }

    /// Call id from the `start` event, `None` before it arrived.
    pub fn get_call_id(&self) -> Option<String> {
        self.inner
            .identity
            .read()
            .as_ref()
            .map(|id| id.call_id.clone())
    }

    /// Account id from the `start` event, `None` before it arrived.
    pub fn get_account_id(&self) -> Option<String> {
        self.inner
            .identity
            .read()
            .as_ref()
            .map(|id| id.account_id.clone())
    }

    /// All identifiers at once.
    pub fn identity(&self) -> Option<StreamIdentity> {
        self.inner.identity.read().clone()
    }

    /// Record identifiers from a `start` event.
    ///
    /// The first `start` wins; a later one with a different stream id is
    /// logged and ignored.
    pub(crate) fn record_start(&self, start: &StartData) {
        let mut identity = self.inner.identity.write();
        match identity.as_ref() {
            None => {
                info!(
                    stream_id = %start.stream_id,
                    call_id = %start.call_id,
                    encoding = %start.media_format.encoding,
                    sample_rate = start.media_format.sample_rate,
                    "Stream started"
                );
                *identity = Some(StreamIdentity {
                    stream_id: start.stream_id.clone(),
                    call_id: start.call_id.clone(),
                    account_id: start.account_id.clone(),
                });
            }
            Some(current) if current.stream_id != start.stream_id => {
                warn!(
                    current = %current.stream_id,
                    received = %start.stream_id,
                    "Ignoring start event for a different stream id"
                );
            }
            Some(_) => {}
        }
    }

    // =========================================================================
    // Stats
    // =========================================================================

    /// Snapshot of the frame counters.
    pub fn stats(&self) -> FrameStats {
        *self.inner.stats.lock()
    }

    pub(crate) fn update_stats(&self, update: impl FnOnce(&mut FrameStats)) {
        update(&mut self.inner.stats.lock());
    }

    /// Per-connection configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.inner.config
    }
}
