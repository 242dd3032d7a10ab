//! Serve command implementation.

use std::path::Path;

use anyhow::{Context, Result};

use peerlink_core::web::WebServer;

use super::ServeArgs;

/// Run the serve command.
pub async fn run(args: ServeArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = super::load_config(config_path)?;
    args.apply(&mut config);
    config.validate()?;

    let server = WebServer::new(&config).context("failed to set up the gateway")?;
    let addr = server.addr();

    println!();
    println!("PeerLink v{}", peerlink_core::VERSION);
    println!("{}", "-".repeat(37));
    println!();
    println!("  Upload:    POST http://{}/upload", addr);
    println!("  Download:  GET  http://{}/download/<code>", addr);
    println!(
        "  Codes:     {}-{}",
        config.share.code_range.0, config.share.code_range.1
    );
    println!();
    println!("  Press Ctrl+C to stop");
    println!();

    server
        .run(shutdown_signal())
        .await
        .with_context(|| format!("gateway on {addr} failed"))?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutting down");
}
