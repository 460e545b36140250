//! Linewire Daemon Binary
//!
//! A TCP server that speaks one JSON object per line with any number of
//! concurrent clients, dispatching requests to the stock handler.
//!
//! # Usage
//!
//! ```bash
//! linewire-daemon --port 31337
//! linewire-daemon --host 0.0.0.0 --port 31337 --debug
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use linewire::dispatch::DefaultDispatcher;
use linewire::managers::{PromptManager, ResourceManager, ToolManager};
use linewire::server::Server;

/// Linewire line-protocol daemon
#[derive(Parser, Debug)]
#[command(name = "linewire-daemon")]
#[command(about = "Line-oriented JSON message daemon")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "31337")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Abort connections still draining after this many seconds of shutdown
    #[arg(long)]
    drain_timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("linewire={}", level).parse().unwrap())
                .add_directive(format!("linewire_daemon={}", level).parse().unwrap()),
        )
        .init();

    // Empty registries; embedders register entries before serving
    let dispatcher = DefaultDispatcher::new()
        .with_resources(Arc::new(ResourceManager::new()))
        .with_tools(Arc::new(ToolManager::new()))
        .with_prompts(Arc::new(PromptManager::new()));

    let mut server = Server::new(args.host, args.port, Arc::new(dispatcher));
    if let Some(secs) = args.drain_timeout {
        server = server.with_drain_timeout(Duration::from_secs(secs));
    }
    server.start().await?;

    wait_for_shutdown_signal().await;
    tracing::info!("Shutdown signal received");
    server.stop().await;
    Ok(())
}

/// Resolve on ctrl-c or SIGTERM
#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

/// Resolve on ctrl-c
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
