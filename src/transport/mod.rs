//! WebSocket transports for [`StreamingHandler`](crate::core::stream::StreamingHandler).
//!
//! - [`AxumTransport`] - a socket already upgraded by an axum route
//! - [`TungsteniteTransport`] - a raw byte stream (e.g. `TcpStream`) that
//!   performs the WebSocket handshake itself in `accept()`

mod axum;
mod tungstenite;

pub use self::axum::AxumTransport;
pub use self::tungstenite::TungsteniteTransport;
