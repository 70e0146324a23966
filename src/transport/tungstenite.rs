//! Transport over a raw byte stream using tokio-tungstenite.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{WebSocketStream, accept_async};
use tracing::{debug, info, warn};

use crate::core::stream::{StreamTransport, TransportError};

/// [`StreamTransport`] for a connection that has not been upgraded yet.
///
/// `accept()` runs the server side of the WebSocket handshake on the wrapped
/// stream. Use [`TungsteniteTransport::from_websocket`] when the handshake
/// was already done elsewhere.
pub struct TungsteniteTransport<S> {
    pending: Mutex<Option<S>>,
    sink: Mutex<Option<SplitSink<WebSocketStream<S>, Message>>>,
    stream: Mutex<Option<SplitStream<WebSocketStream<S>>>>,
    closed: AtomicBool,
}

impl<S> TungsteniteTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap a raw stream; the handshake happens in `accept()`.
    pub fn new(stream: S) -> Self {
        Self {
            pending: Mutex::new(Some(stream)),
            sink: Mutex::new(None),
            stream: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Wrap an already upgraded WebSocket; `accept()` becomes a no-op.
    pub fn from_websocket(ws: WebSocketStream<S>) -> Self {
        let (sink, stream) = ws.split();
        Self {
            pending: Mutex::new(None),
            sink: Mutex::new(Some(sink)),
            stream: Mutex::new(Some(stream)),
            closed: AtomicBool::new(false),
        }
    }
}

/// Errors that mean the peer is gone rather than a bad frame.
fn is_disconnect(err: &tungstenite::Error) -> bool {
    matches!(
        err,
        tungstenite::Error::ConnectionClosed
            | tungstenite::Error::AlreadyClosed
            | tungstenite::Error::Io(_)
            | tungstenite::Error::Protocol(_)
    )
}

#[async_trait]
impl<S> StreamTransport for TungsteniteTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn accept(&self) -> Result<(), TransportError> {
        let Some(raw) = self.pending.lock().await.take() else {
            if self.sink.lock().await.is_some() {
                return Ok(());
            }
            return Err(TransportError::NotConnected);
        };

        let ws = accept_async(raw)
            .await
            .map_err(|e| TransportError::Handshake(e.to_string()))?;
        let (sink, stream) = ws.split();
        *self.sink.lock().await = Some(sink);
        *self.stream.lock().await = Some(stream);

        debug!("WebSocket handshake completed");
        Ok(())
    }

    async fn receive(&self) -> Result<Option<String>, TransportError> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(TransportError::NotConnected)?;

        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                Some(Ok(Message::Binary(data))) => {
                    debug!(len = data.len(), "Ignoring binary frame");
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    info!(?frame, "WebSocket close received");
                    self.closed.store(true, Ordering::SeqCst);
                    return Ok(None);
                }
                Some(Err(e)) if is_disconnect(&e) => {
                    debug!(error = %e, "WebSocket disconnected");
                    self.closed.store(true, Ordering::SeqCst);
                    return Ok(None);
                }
                Some(Err(e)) => {
                    warn!("WebSocket error: {}", e);
                    return Err(TransportError::Receive(e.to_string()));
                }
                None => {
                    self.closed.store(true, Ordering::SeqCst);
                    return Ok(None);
                }
            }
        }
    }

    async fn send(&self, text: String) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(TransportError::NotConnected)?;
        sink.send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut guard = self.sink.lock().await;
        let Some(sink) = guard.as_mut() else {
            return Ok(());
        };
        match sink.close().await {
            Ok(()) => Ok(()),
            Err(e) if is_disconnect(&e) => Ok(()),
            Err(e) => Err(TransportError::Close(e.to_string())),
        }
    }
}
