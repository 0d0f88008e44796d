//! Step driver entry point
//!
//! Walks the demo steps against a running backend so the overlay can be
//! exercised end to end without a real lesson.

mod client;

use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tokio::signal;

use client::BackendClient;
use shared::{demo_steps, logging, process_error, process_info, Component};

/// Backend step driver
#[derive(Parser, Debug)]
#[command(name = "stepper")]
#[command(about = "Posts the demo guidance steps to the backend in a loop")]
struct Args {
    /// Backend base URL
    #[arg(long = "api-url", env = "COMPANION_API_URL", default_value = "http://localhost:5000")]
    api_url: String,

    /// Room the steps are published to
    #[arg(long = "user-id", default_value = "overlay-user")]
    user_id: String,

    #[arg(long = "lesson-id", default_value_t = 32)]
    lesson_id: u64,

    /// Pause between steps
    #[arg(long = "delay-ms", default_value_t = 3_000)]
    delay_ms: u64,

    /// Pause before starting the next cycle
    #[arg(long = "cycle-pause-ms", default_value_t = 5_000)]
    cycle_pause_ms: u64,

    /// Stop after this many cycles (runs until Ctrl+C if not specified)
    #[arg(long)]
    cycles: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level")]
    log_level: Option<String>,
}

async fn drive(args: &Args, client: &BackendClient) {
    let steps = demo_steps();
    let mut cycle = 0u32;

    loop {
        cycle += 1;
        process_info!(Component::Bridge, "🔁 Starting cycle {}", cycle);

        for step in &steps {
            match client.start_step(&args.user_id, args.lesson_id, step).await {
                Ok(response) => process_info!(
                    Component::Bridge,
                    "✅ Step {}: {} ({})",
                    step.step_order,
                    response.message,
                    response.step_data
                ),
                Err(e) => process_error!(Component::Bridge, "❌ Step {} failed: {:#}", step.step_order, e),
            }
            tokio::time::sleep(Duration::from_millis(args.delay_ms)).await;
        }

        if args.cycles.is_some_and(|limit| cycle >= limit) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(args.cycle_pause_ms)).await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    logging::init_tracing("stepper", args.log_level.as_deref());

    let client = BackendClient::new(&args.api_url)?;
    logging::log_startup(&Component::Bridge, &format!("stepper against {}", args.api_url));

    tokio::select! {
        _ = drive(&args, &client) => {
            logging::log_success(&Component::Bridge, "All cycles finished");
        }
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                logging::log_error(&Component::Bridge, "Signal handling", &e);
            }
            logging::log_shutdown(&Component::Bridge, "Received Ctrl+C signal");
        }
    }

    Ok(())
}
