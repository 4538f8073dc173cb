//! Clinic Assistant Gateway
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                 ASSISTANT GATEWAY                 │
//!   Chat widget          │                                                   │
//!   ─────────────────────┼─▶ http server ──▶ /api/chat ──▶ upstream client ──┼──▶ Hosted LLM
//!                        │       │               ▲                           │
//!                        │       │        context (source docs)              │
//!                        │       │                                           │
//!                        │       └──────▶ /api/registration ──▶ flow/session │
//!                        │                                                   │
//!                        │  config · observability · resilience · lifecycle  │
//!                        └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use clinic_assistant::config::{self, AppConfig};
use clinic_assistant::context::{ContextWatcher, DocumentContext};
use clinic_assistant::lifecycle::{signals, Shutdown};
use clinic_assistant::observability::{logging, metrics};
use clinic_assistant::HttpServer;

#[derive(Parser)]
#[command(name = "clinic-assistant")]
#[command(about = "Chat relay and patient registration gateway for the clinic assistant widget")]
struct Args {
    /// TOML config file. Without one, defaults plus environment variables are used.
    #[arg(short, long, env = "ASSISTANT_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config: AppConfig = match &args.config {
        Some(path) => config::load_config(path)?,
        None => config::from_env()?,
    };

    logging::init_logging(&config.observability);
    tracing::info!("clinic-assistant v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        model = %config.upstream.default_model,
        api_key_configured = config.upstream.api_key.is_some(),
        documents_dir = %config.context.documents_dir,
        allowed_origins = ?config.cors.allowed_origins,
        "Configuration loaded"
    );
    if config.upstream.api_key.is_none() {
        tracing::warn!("GROQ_API_KEY is not set; chat requests will fail with 500");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let context = Arc::new(DocumentContext::load(
        &config.context.documents_dir,
        config.context.max_chars,
    ));
    // Held for the life of the process; dropping it stops the watch.
    let _watcher = if config.context.watch {
        match ContextWatcher::new(context.clone()).run() {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::error!(error = %e, "Failed to watch documents directory; context will not reload");
                None
            }
        }
    } else {
        None
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::with_context(config, context)?;
    let server_shutdown = shutdown.subscribe();
    let mut server_task = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    tokio::select! {
        result = &mut server_task => {
            result??;
            if !shutdown.is_triggered() {
                tracing::warn!("Server exited without a shutdown signal");
            }
            return Ok(());
        }
        _ = signals::wait_for_shutdown_signal() => shutdown.trigger(),
    }

    server_task.await??;
    tracing::info!("Shutdown complete");
    Ok(())
}
