//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check endpoint
//! - `answer` - Plivo answer URL returning the `<Stream>` XML
//! - `stream` - Media stream WebSocket upgrade
//! - `echo` - The demo application wired onto each stream

pub mod answer;
pub mod api;
pub mod echo;
pub mod stream;

pub use answer::answer_handler;
pub use api::health_check;
pub use echo::{build_echo_handler, run_echo_session};
pub use stream::stream_handler;
