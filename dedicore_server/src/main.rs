//! Standalone server binary.
//!
//! Usage:
//!   cargo run -p dedicore_server -- [--config server.json] [--tick-ms 50]
//!
//! The server ticks at a fixed rate until stopped with Ctrl-C or the `stop`
//! console command.
//!
//! Console commands:
//!   help [command]  - List commands
//!   status          - Show tick rate and load
//!   say <message>   - Echo a message
//!   stop            - Shutdown server

use std::env;
use std::sync::Arc;

use anyhow::{bail, Context};
use dedicore_server::{console, Server};
use dedicore_shared::config::ServerConfig;
use tracing::{info, warn};

fn parse_args() -> anyhow::Result<ServerConfig> {
    let args: Vec<String> = env::args().collect();

    let mut config_path = None;
    let mut tick_ms = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                config_path = Some(args[i + 1].clone());
                i += 2;
            }
            "--tick-ms" if i + 1 < args.len() => {
                let value = args[i + 1]
                    .parse::<u64>()
                    .with_context(|| format!("invalid --tick-ms value {:?}", args[i + 1]))?;
                tick_ms = Some(value);
                i += 2;
            }
            other => bail!("unrecognized argument {other:?}"),
        }
    }

    let mut cfg = match config_path {
        Some(path) => ServerConfig::load(&path)?,
        None => ServerConfig::default(),
    };
    if let Some(period_ms) = tick_ms {
        cfg.tick.period_ms = period_ms;
        cfg.tick.early_tolerance_ms = cfg.tick.early_tolerance_ms.min(period_ms / 2);
    }
    cfg.validate()?;
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = parse_args()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cfg.log_filter.as_str().into()),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        tick_ms = cfg.tick.period_ms,
        prefix = %cfg.command_prefix,
        "Starting server"
    );

    let server = Arc::new(Server::new(cfg).context("create server")?);
    console::spawn_stdin_reader(server.console_input())?;

    let signal_server = Arc::clone(&server);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => signal_server.shutdown(),
            Err(e) => warn!(error = %e, "Unable to listen for Ctrl-C"),
        }
    });

    println!("Server ready. Type 'help' for a list of commands, 'stop' to exit.");
    println!();

    let tick_thread = server.spawn(|| Ok(()))?;
    let joined = tokio::task::spawn_blocking(move || tick_thread.join())
        .await
        .context("join tick thread")?;
    match joined {
        Ok(result) => result?,
        Err(_) => bail!("tick thread panicked"),
    }

    server.shutdown();
    info!("Server stopped");
    Ok(())
}
