//! Transport over an axum WebSocket.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::core::stream::{StreamTransport, TransportError};

/// [`StreamTransport`] for a socket handed out by `WebSocketUpgrade::on_upgrade`.
///
/// The upgrade already happened, so `accept()` does nothing. Read and write
/// halves sit behind separate locks so handlers can send while the engine
/// waits for the next frame.
pub struct AxumTransport {
    sender: Mutex<SplitSink<WebSocket, Message>>,
    receiver: Mutex<SplitStream<WebSocket>>,
    closed: AtomicBool,
}

impl AxumTransport {
    pub fn new(socket: WebSocket) -> Self {
        let (sender, receiver) = socket.split();
        Self {
            sender: Mutex::new(sender),
            receiver: Mutex::new(receiver),
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl StreamTransport for AxumTransport {
    async fn accept(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn receive(&self) -> Result<Option<String>, TransportError> {
        let mut receiver = self.receiver.lock().await;

        loop {
            match receiver.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                Some(Ok(Message::Binary(data))) => {
                    debug!(len = data.len(), "Ignoring binary frame");
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) => {
                    info!("WebSocket close received");
                    self.closed.store(true, Ordering::SeqCst);
                    return Ok(None);
                }
                Some(Err(e)) => {
                    warn!("WebSocket error: {}", e);
                    self.closed.store(true, Ordering::SeqCst);
                    return Ok(None);
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
        self.sender
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.sender
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::Close(e.to_string()))
    }
}
