use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::{Cli, Commands};
use linkscan_mcp::stdio::{LinkScanServer, available_tools};
use linkscan_mcp::{HttpLinkChecker, ScanTool};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (stderr; stdout carries the MCP transport)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("linkscan_mcp=info"))
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Handle list-tools flag
    if cli.list_tools {
        println!("Available tools:");
        for tool in available_tools() {
            println!("  - {tool}");
        }
        return Ok(());
    }

    let config = cli.server_config()?;

    let mut engine = HttpLinkChecker::new();
    if let Some(user_agent) = &config.user_agent {
        engine = engine.with_user_agent(user_agent.clone());
    }
    let tool = ScanTool::new(engine, &config);

    if let Some(Commands::Scan(scan)) = cli.command {
        let passed = commands::handle_scan(&tool, scan.into()).await?;
        if !passed {
            std::process::exit(1);
        }
        return Ok(());
    }

    // Cancelled on SIGINT/SIGTERM to stop the server
    let shutdown_token = tokio_util::sync::CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        log::info!("Shutting down");
        signal_token.cancel();
    });

    log::info!(
        "Linkscan MCP server running on stdio (progress interval {}, report cap {})",
        config.progress_interval,
        config.max_broken_links
    );

    LinkScanServer::new(tool).serve_stdio(shutdown_token).await
}

/// Resolves on Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Ctrl+C handler unavailable: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::warn!("SIGTERM handler unavailable: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => log::debug!("Received Ctrl+C"),
        () = terminate => log::debug!("Received SIGTERM"),
    }
}
