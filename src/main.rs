use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, warn};

use plivo_stream::{
    ServerConfig, TungsteniteTransport, handlers::run_echo_session, routes, state::AppState,
};

/// Plivo media stream demo server
#[derive(Parser, Debug)]
#[command(name = "plivo-stream")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the media stream on a bare TCP listener (no HTTP routes)
    Raw,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // Load configuration from file or environment
    let config = if let Some(config_path) = cli.config {
        println!("Loading configuration from {}", config_path.display());
        ServerConfig::from_file(&config_path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };

    let address = config.address();
    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;

    match cli.command {
        Some(Commands::Raw) => serve_raw(socket_addr, config).await,
        None => serve_http(socket_addr, config).await,
    }
}

async fn serve_http(socket_addr: SocketAddr, config: ServerConfig) -> anyhow::Result<()> {
    let stream_path = config.stream_path.clone();
    let app = routes::create_app(AppState::new(config));

    println!("Server listening on http://{}", socket_addr);
    info!(
        "Answer URL: http://{}/answer, media stream path: {}",
        socket_addr, stream_path
    );

    let listener = TcpListener::bind(&socket_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_raw(socket_addr: SocketAddr, config: ServerConfig) -> anyhow::Result<()> {
    let config = Arc::new(config);
    let listener = TcpListener::bind(&socket_addr).await?;
    println!("Raw WebSocket listener on ws://{}", socket_addr);

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "Failed to accept TCP connection");
                continue;
            }
        };
        info!(%peer, "TCP connection accepted");

        let config = config.clone();
        tokio::spawn(async move {
            run_echo_session(TungsteniteTransport::new(stream), &config).await;
        });
    }
}
