//! Main entry point for the companion host binary
//!
//! Wires the real service implementations into [`Host`] and runs it until
//! Ctrl+C or the last window closes.

use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;

use host::{
    core::OverlayController,
    services::{PollingTransport, RdevInputHook, RealProcessManager, ScheduledTransport, ScreenshotsCapture, ShellLink},
    traits::BridgeTransport,
    Args, Host, HostConfig, HostResult, HostSettings,
};
use shared::{logging, process_debug, process_info, Component};

#[tokio::main]
async fn main() -> HostResult<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    logging::init_tracing("host", args.log_level.as_deref());

    let config = HostConfig::from_args(&args)?;
    process_debug!(
        Component::Host,
        "Root: {}, workers: {}, shell: {}",
        config.root.display(),
        config.workers.len(),
        config.shell_addr
    );

    let (worker_tx, worker_rx) = mpsc::unbounded_channel();
    let supervisor = RealProcessManager::new(config.workers.clone()).with_events(worker_tx);

    // The shell worker dials this address, so bind before anything starts.
    let (link, surfaces, shell_rx) = ShellLink::bind(config.shell_addr).await?;
    link.spawn();

    let transport: Box<dyn BridgeTransport> = if config.mock_events {
        process_info!(Component::Bridge, "🧪 Mock event schedule enabled");
        Box::new(ScheduledTransport::new())
    } else {
        Box::new(PollingTransport::new())
    };

    let mut host = Host::new(
        HostSettings::from(&config),
        OverlayController::new(config.overlay.clone()),
        Arc::new(supervisor),
        surfaces,
        Arc::new(RdevInputHook::new()),
        transport,
        Arc::new(ScreenshotsCapture::new()),
    )
    .with_shell_events(shell_rx)
    .with_worker_events(worker_rx);

    // Set up graceful shutdown
    let shutdown_sender = host.get_shutdown_sender();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                logging::log_shutdown(&Component::Host, "Received Ctrl+C signal");
                let _ = shutdown_sender.send(()).await;
            }
            Err(err) => {
                logging::log_error(&Component::Host, "Signal handling", &err);
            }
        }
    });

    host.startup().await?;
    host.run().await?;

    logging::log_success(&Component::Host, "Host stopped gracefully");
    Ok(())
}
