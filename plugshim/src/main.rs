use anyhow::{Context, Result};
use tracing::{error, info};

use plugshim::cli::Args;
use plugshim::logging::{init_logging, LoggingMode};
use plugshim::{find_config, Config, Shim, ShimOptions};

#[tokio::main]
async fn main() {
    let args = Args::from_env();

    if let Err(e) = init_logging(LoggingMode::from_verbose(args.verbose)) {
        eprintln!("{}", e);
    }

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    args.validate()?;

    let path = find_config(args.config.as_deref())?;
    info!("Using config {}", path.display());

    let config = Config::load(&path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    let host = config.host_ip()?;
    let devices = config.build_devices()?;

    let options = ShimOptions::new(host).with_read_timeout(args.read_timeout_duration());
    let shim = Shim::start(devices, options)
        .await
        .context("Failed to start devices")?;

    for (name, addr) in shim.server_addrs() {
        info!("'{}' listening on {}", name, addr);
    }

    wait_for_shutdown_signal().await?;
    info!("Shutting down");

    shim.shutdown().await?;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).context("Failed to listen for SIGTERM")?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("Failed to listen for Ctrl+C")?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")
}
