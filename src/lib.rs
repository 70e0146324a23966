pub mod config;
pub mod core;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod transport;

// Re-export commonly used items for convenience
pub use config::ServerConfig;
pub use crate::core::*;
pub use state::AppState;
pub use transport::{AxumTransport, TungsteniteTransport};
