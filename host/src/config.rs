//! Command line / environment configuration
//!
//! `.env` is loaded before parsing so every `env = ...` fallback below can be
//! set there.

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::core::OverlaySettings;
use crate::error::{HostError, HostResult};
use crate::services::{Hotkey, Readiness, WorkerSpec};
use crate::traits::{BridgeRequest, ReconnectPolicy};
use shared::{derive_base_url, ContentSource, Geometry, SurfaceSpec};

pub const BACKEND_WORKER: &str = "backend";
pub const FRONTEND_WORKER: &str = "frontend";
pub const OVERLAY_WORKER: &str = "overlay";
pub const SHELL_WORKER: &str = "shell";

const FRONTEND_DEV_URL: &str = "http://localhost:3000";
const OVERLAY_DEV_URL: &str = "http://localhost:3001";

/// Desktop companion host
#[derive(Parser, Debug, Clone)]
#[command(name = "companion-host")]
#[command(about = "Supervises the companion workers and drives the guidance overlay")]
pub struct Args {
    /// Project root containing backend/, frontend/ and overlay-screen/
    #[arg(long, env = "COMPANION_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Backend real-time endpoint (ws:// and wss:// are accepted)
    #[arg(long = "ws-url", env = "COMPANION_WS_URL", default_value = "http://localhost:5000")]
    pub ws_url: String,

    /// Replace the backend channel with the built-in demo schedule
    #[arg(long = "mock-events", env = "COMPANION_MOCK_EVENTS", value_parser = BoolishValueParser::new(), action = ArgAction::Set, default_value = "false")]
    pub mock_events: bool,

    /// Global accelerator that toggles the overlay
    #[arg(long, env = "COMPANION_HOTKEY", default_value = "/")]
    pub hotkey: String,

    /// Address the renderer shell connects to
    #[arg(long = "shell-addr", env = "COMPANION_SHELL_ADDR", default_value = "127.0.0.1:7310")]
    pub shell_addr: SocketAddr,

    /// Command that launches the renderer shell (supervised like any worker)
    #[arg(long = "shell-command", env = "COMPANION_SHELL_COMMAND")]
    pub shell_command: Option<String>,

    /// Room the overlay bridge joins
    #[arg(long, default_value = "overlay-user")]
    pub room: String,

    /// Load bundled pages instead of the UI dev servers
    #[arg(long, env = "COMPANION_PACKAGED", value_parser = BoolishValueParser::new(), action = ArgAction::Set, default_value = "false")]
    pub packaged: bool,

    /// Give up on an overlay that has not rendered after this long
    #[arg(long = "open-timeout-ms", default_value_t = 15_000)]
    pub open_timeout_ms: u64,

    /// Reconnection attempts after the first failed bridge connection
    #[arg(long = "reconnect-attempts", default_value_t = 3)]
    pub reconnect_attempts: u32,

    /// Delay between bridge reconnection attempts
    #[arg(long = "reconnect-delay-ms", default_value_t = 1_000)]
    pub reconnect_delay_ms: u64,

    /// Use fixed settle delays instead of HTTP readiness probes
    #[arg(long = "fixed-settle")]
    pub fixed_settle: bool,

    /// Do not spawn any workers (they are managed elsewhere)
    #[arg(long = "skip-workers")]
    pub skip_workers: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level", env = "COMPANION_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Fully resolved host configuration
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub root: PathBuf,
    pub workers: Vec<WorkerSpec>,
    pub start_workers: bool,
    pub shell_addr: SocketAddr,
    pub main_spec: SurfaceSpec,
    pub main_source: ContentSource,
    pub overlay: OverlaySettings,
    pub hotkey: Hotkey,
    pub mock_events: bool,
    /// Stay up after the last window closes
    pub keep_alive_without_windows: bool,
}

impl HostConfig {
    pub fn from_args(args: &Args) -> HostResult<Self> {
        let root = args.root.clone();
        let endpoint = derive_base_url(&args.ws_url)?;
        let hotkey = Hotkey::parse(&args.hotkey)?;

        if args.open_timeout_ms == 0 {
            return Err(HostError::config("open-timeout-ms must be positive"));
        }

        let workers = worker_specs(&root, &endpoint, args)?;

        let main_source = if args.packaged {
            ContentSource::File(root.join("frontend").join("public").join("index.html"))
        } else {
            ContentSource::Url(FRONTEND_DEV_URL.to_string())
        };
        let packaged_overlay = ContentSource::File(root.join("overlay-screen").join("public").join("index.html"));
        let (primary, fallback) = if args.packaged {
            (packaged_overlay, None)
        } else {
            (ContentSource::Url(OVERLAY_DEV_URL.to_string()), Some(packaged_overlay))
        };

        let overlay = OverlaySettings {
            spec: SurfaceSpec::overlay(overlay_geometry()),
            primary,
            fallback,
            open_timeout: Duration::from_millis(args.open_timeout_ms),
            bridge: BridgeRequest {
                endpoint,
                room: args.room.clone(),
                policy: ReconnectPolicy {
                    max_attempts: args.reconnect_attempts,
                    delay: Duration::from_millis(args.reconnect_delay_ms),
                },
            },
        };

        Ok(Self {
            root,
            workers,
            start_workers: !args.skip_workers,
            shell_addr: args.shell_addr,
            main_spec: SurfaceSpec::main(main_geometry()),
            main_source,
            overlay,
            hotkey,
            mock_events: args.mock_events,
            keep_alive_without_windows: cfg!(target_os = "macos"),
        })
    }
}

pub fn main_geometry() -> Geometry {
    Geometry {
        x: None,
        y: None,
        width: 1200,
        height: 800,
        min_width: 800,
        min_height: 600,
    }
}

pub fn overlay_geometry() -> Geometry {
    Geometry {
        x: Some(100),
        y: Some(100),
        width: 400,
        height: 175,
        min_width: 200,
        min_height: 150,
    }
}

fn readiness(args: &Args, probe: &str, settle: Duration) -> HostResult<Readiness> {
    if args.fixed_settle {
        return Ok(Readiness::Settle(settle));
    }
    let url = Url::parse(probe).map_err(|e| HostError::config(format!("bad readiness url {probe}: {e}")))?;
    Ok(Readiness::Http {
        url,
        timeout: Duration::from_secs(60),
        interval: Duration::from_millis(500),
    })
}

/// Workers in dependency order: backend, primary UI, overlay UI, then the shell
fn worker_specs(root: &Path, endpoint: &Url, args: &Args) -> HostResult<Vec<WorkerSpec>> {
    let mut workers = vec![WorkerSpec::new(BACKEND_WORKER, root.join("backend").join("venv").join("bin").join("python"))
        .with_args(["backend/app.py"])
        .with_working_dir(root)
        .with_env("PYTHONPATH", root.join("backend").to_string_lossy())
        .with_readiness(readiness(args, endpoint.as_str(), Duration::from_secs(2))?)];

    // Packaged builds ship the UIs as files; no dev servers needed.
    if !args.packaged {
        workers.push(
            WorkerSpec::new(FRONTEND_WORKER, "npm")
                .with_args(["start"])
                .with_working_dir(root.join("frontend"))
                .with_env("BROWSER", "none")
                .with_readiness(readiness(args, FRONTEND_DEV_URL, Duration::from_secs(5))?),
        );
        workers.push(
            WorkerSpec::new(OVERLAY_WORKER, "npm")
                .with_args(["start"])
                .with_working_dir(root.join("overlay-screen"))
                .with_env("BROWSER", "none")
                .with_readiness(readiness(args, OVERLAY_DEV_URL, Duration::from_secs(5))?),
        );
    }

    if let Some(command) = &args.shell_command {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| HostError::config("shell-command is empty"))?;
        workers.push(
            WorkerSpec::new(SHELL_WORKER, program)
                .with_args(parts.map(str::to_string))
                .with_working_dir(root)
                .with_env("COMPANION_SHELL_URL", format!("ws://{}/shell", args.shell_addr)),
        );
    }

    Ok(workers)
}
