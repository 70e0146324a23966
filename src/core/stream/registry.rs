//! Callback registry for one streaming connection.
//!
//! Holds at most one handler per inbound event kind plus the lifecycle
//! slots (`connected`, `disconnected`, `error`). Registering a second
//! handler for the same slot replaces the first one.
//!
//! Each kind can also carry one raw hook registered with
//! [`CallbackRegistry::on_event`]. It receives the whole JSON frame and
//! runs before the frame is decoded into its typed event.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::base::{
    CallbackFuture, ClearedAudioCallback, ConnectionCallback, DtmfCallback, ErrorCallback,
    EventCallback, HandlerError, HandlerResult, MediaCallback, PlayedStreamCallback,
    RawEventCallback, StartCallback, StreamError,
};
use super::isolation::call_handler_isolated;
use super::messages::{
    ClearedAudioEvent, DtmfEvent, EventKind, InboundEvent, MediaEvent, PlayedStreamEvent,
    StartEvent,
};

/// Lifecycle slot names used in error reports.
pub const CONNECTED_SLOT: &str = "connected";
pub const DISCONNECTED_SLOT: &str = "disconnected";
pub const ERROR_SLOT: &str = "error";

/// Table of registered handlers.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    start: Option<StartCallback>,
    media: Option<MediaCallback>,
    dtmf: Option<DtmfCallback>,
    played_stream: Option<PlayedStreamCallback>,
    cleared_audio: Option<ClearedAudioCallback>,
    raw: HashMap<EventKind, RawEventCallback>,
    connected: Option<ConnectionCallback>,
    disconnected: Option<ConnectionCallback>,
    error: Option<ErrorCallback>,
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("start", &self.start.is_some())
            .field("media", &self.media.is_some())
            .field("dtmf", &self.dtmf.is_some())
            .field("played_stream", &self.played_stream.is_some())
            .field("cleared_audio", &self.cleared_audio.is_some())
            .field("raw", &self.raw.keys().map(EventKind::as_str).collect::<Vec<_>>())
            .field("connected", &self.connected.is_some())
            .field("disconnected", &self.disconnected.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

fn event_callback<E, F, Fut>(handler: F) -> EventCallback<E>
where
    E: Send + 'static,
    F: Fn(E) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |event: E| Box::pin(handler(event)) as CallbackFuture<HandlerResult>)
}

fn replace_slot<T>(slot: &mut Option<T>, callback: T, name: &'static str) {
    if slot.replace(callback).is_some() {
        debug!(slot = name, "Replaced previously registered handler");
    }
}

async fn invoke<E>(slot: &Option<EventCallback<E>>, event: E) -> Option<Result<(), HandlerError>> {
    let callback = slot.as_ref()?;
    Some(call_handler_isolated(move || callback(event)).await)
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register the `start` handler.
    pub fn on_start<F, Fut>(&mut self, handler: F)
    where
        F: Fn(StartEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        replace_slot(&mut self.start, event_callback(handler), EventKind::Start.as_str());
    }

    /// Register the `media` handler.
    pub fn on_media<F, Fut>(&mut self, handler: F)
    where
        F: Fn(MediaEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        replace_slot(&mut self.media, event_callback(handler), EventKind::Media.as_str());
    }

    /// Register the `dtmf` handler.
    pub fn on_dtmf<F, Fut>(&mut self, handler: F)
    where
        F: Fn(DtmfEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        replace_slot(&mut self.dtmf, event_callback(handler), EventKind::Dtmf.as_str());
    }

    /// Register the `playedStream` handler.
    pub fn on_played_stream<F, Fut>(&mut self, handler: F)
    where
        F: Fn(PlayedStreamEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        replace_slot(
            &mut self.played_stream,
            event_callback(handler),
            EventKind::PlayedStream.as_str(),
        );
    }

    /// Register the `clearedAudio` handler.
    pub fn on_cleared_audio<F, Fut>(&mut self, handler: F)
    where
        F: Fn(ClearedAudioEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        replace_slot(
            &mut self.cleared_audio,
            event_callback(handler),
            EventKind::ClearedAudio.as_str(),
        );
    }

    /// Register the raw hook for `kind`.
    ///
    /// The hook gets the whole frame as JSON, including fields the typed
    /// event drops, and runs before the typed handler. It also runs for a
    /// frame whose payload then fails to decode.
    pub fn on_event<F, Fut>(&mut self, kind: EventKind, handler: F)
    where
        F: Fn(EventKind, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let callback: RawEventCallback = Arc::new(move |kind: EventKind, frame: Value| {
            Box::pin(handler(kind, frame)) as CallbackFuture<HandlerResult>
        });
        if self.raw.insert(kind, callback).is_some() {
            debug!(slot = kind.as_str(), "Replaced previously registered raw hook");
        }
    }

    /// Register the handler run once after the transport is accepted.
    pub fn on_connected<F, Fut>(&mut self, handler: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let callback: ConnectionCallback =
            Arc::new(move || Box::pin(handler()) as CallbackFuture<HandlerResult>);
        replace_slot(&mut self.connected, callback, CONNECTED_SLOT);
    }

    /// Register the handler run once after the receive loop exits.
    pub fn on_disconnected<F, Fut>(&mut self, handler: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let callback: ConnectionCallback =
            Arc::new(move || Box::pin(handler()) as CallbackFuture<HandlerResult>);
        replace_slot(&mut self.disconnected, callback, DISCONNECTED_SLOT);
    }

    /// Register the handler receiving every non-fatal error.
    pub fn on_error<F, Fut>(&mut self, handler: F)
    where
        F: Fn(StreamError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let callback: ErrorCallback =
            Arc::new(move |err: StreamError| Box::pin(handler(err)) as CallbackFuture<HandlerResult>);
        replace_slot(&mut self.error, callback, ERROR_SLOT);
    }

    /// Whether a handler is registered for `kind`.
    pub fn has_handler(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::Start => self.start.is_some(),
            EventKind::Media => self.media.is_some(),
            EventKind::Dtmf => self.dtmf.is_some(),
            EventKind::PlayedStream => self.played_stream.is_some(),
            EventKind::ClearedAudio => self.cleared_audio.is_some(),
        }
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Whether a raw hook is registered for `kind`.
    pub fn has_raw_hook(&self, kind: EventKind) -> bool {
        self.raw.contains_key(&kind)
    }

    /// Run the raw hook registered for `kind` and wait for it.
    ///
    /// Returns `Ok(false)` when no hook is registered.
    pub async fn dispatch_raw(&self, kind: EventKind, frame: Value) -> Result<bool, StreamError> {
        let Some(callback) = self.raw.get(&kind) else {
            return Ok(false);
        };
        call_handler_isolated(|| callback(kind, frame))
            .await
            .map(|()| true)
            .map_err(|source| StreamError::Handler {
                event: kind.as_str(),
                source,
            })
    }

    /// Run the handler registered for the event's kind and wait for it.
    ///
    /// Returns `Ok(false)` when nothing is registered; the event is dropped.
    /// A failing or panicking handler is reported as [`StreamError::Handler`].
    pub async fn dispatch(&self, event: InboundEvent) -> Result<bool, StreamError> {
        let kind = event.kind();
        let outcome = match event {
            InboundEvent::Start(e) => invoke(&self.start, e).await,
            InboundEvent::Media(e) => invoke(&self.media, e).await,
            InboundEvent::Dtmf(e) => invoke(&self.dtmf, e).await,
            InboundEvent::PlayedStream(e) => invoke(&self.played_stream, e).await,
            InboundEvent::ClearedAudio(e) => invoke(&self.cleared_audio, e).await,
        };

        match outcome {
            None => Ok(false),
            Some(Ok(())) => Ok(true),
            Some(Err(source)) => Err(StreamError::Handler {
                event: kind.as_str(),
                source,
            }),
        }
    }

    /// Run the `connected` handler, if any.
    pub async fn notify_connected(&self) -> Result<(), StreamError> {
        Self::notify(&self.connected, CONNECTED_SLOT).await
    }

    /// Run the `disconnected` handler, if any.
    pub async fn notify_disconnected(&self) -> Result<(), StreamError> {
        Self::notify(&self.disconnected, DISCONNECTED_SLOT).await
    }

    async fn notify(slot: &Option<ConnectionCallback>, name: &'static str) -> Result<(), StreamError> {
        let Some(callback) = slot else {
            return Ok(());
        };
        call_handler_isolated(|| callback())
            .await
            .map_err(|source| StreamError::Handler { event: name, source })
    }

    /// Deliver an error to the `error` handler.
    ///
    /// Without a registered handler the error is discarded. A failure of the
    /// error handler itself is logged and discarded.
    pub async fn report_error(&self, err: StreamError) {
        let Some(callback) = &self.error else {
            debug!(error = %err, "No error handler registered, discarding error");
            return;
        };
        if let Err(e) = call_handler_isolated(|| callback(err)).await {
            warn!(error = %e, "Error handler failed");
        }
    }
}
