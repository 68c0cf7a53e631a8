//! unostat - version 0.1.0
//!
//! Resource-utilization telemetry agent with tracing logging.
//! This is the main entry point that resolves configuration and dispatches subcommands.

mod cli;
mod commands;
mod handlers;
mod logging;
mod startup_checks;
mod state;

use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use cli::{resolve_config, Args, Commands};
use commands::{
    command_check, command_collect, command_config, command_list_devices, command_test,
    command_visualize, show_config,
};
use unostat::config::{validate_effective_config, Config};

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> anyhow::Result<Config> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Token cancelled when a shutdown signal arrives.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });
    token
}

/// Main application entry point.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    // These commands don't need config validation
    match &args.command {
        Some(Commands::Config {
            output,
            format,
            commented,
        }) => return command_config(output.clone(), *format, *commented),
        Some(Commands::ListDevices) => return command_list_devices(),
        Some(Commands::Check) => {
            let config = resolve_config(&args)?;
            return command_check(&config);
        }
        _ => {}
    }

    let config = load_validated_config(&args)?;
    logging::setup_logging(config.log_level(), config.log_file.as_deref())?;

    match &args.command {
        Some(Commands::Test { count, interval }) => {
            let (count, interval) = (*count, *interval);
            tokio::task::spawn_blocking(move || command_test(count, interval, &config)).await?
        }
        Some(Commands::Visualize(_)) => {
            info!("Starting unostat visualizer");
            command_visualize(&config, shutdown_token()).await
        }
        _ => {
            info!("Starting unostat collector");
            command_collect(&config, shutdown_token()).await?;
            info!("unostat stopped gracefully");
            Ok(())
        }
    }
}
