//! Test fixtures and constants shared by host tests

use std::path::PathBuf;
use std::time::Duration;

use host::config::{main_geometry, overlay_geometry};
use host::core::OverlaySettings;
use host::services::Hotkey;
use host::traits::{BridgeRequest, ReconnectPolicy};
use host::HostSettings;
use shared::{ContentSource, SurfaceId, SurfaceSpec};

pub struct TestFixtures;

impl TestFixtures {
    pub const MAIN_URL: &'static str = "http://localhost:3000";
    pub const OVERLAY_URL: &'static str = "http://localhost:3001";
    pub const ROOM: &'static str = "overlay-user";
    pub const OPEN_TIMEOUT: Duration = Duration::from_secs(15);

    /// The first surface the host creates is always the primary one
    pub const MAIN_SURFACE: SurfaceId = SurfaceId(1);
    pub const FIRST_OVERLAY: SurfaceId = SurfaceId(2);

    pub fn overlay_fallback() -> ContentSource {
        ContentSource::File(PathBuf::from("/app/overlay-screen/public/index.html"))
    }

    pub fn host_settings() -> HostSettings {
        HostSettings {
            main_spec: SurfaceSpec::main(main_geometry()),
            main_source: ContentSource::Url(Self::MAIN_URL.to_string()),
            hotkey: Hotkey::parse("/").unwrap(),
            start_workers: false,
            keep_alive_without_windows: false,
        }
    }

    pub fn overlay_settings() -> OverlaySettings {
        OverlaySettings {
            spec: SurfaceSpec::overlay(overlay_geometry()),
            primary: ContentSource::Url(Self::OVERLAY_URL.to_string()),
            fallback: Some(Self::overlay_fallback()),
            open_timeout: Self::OPEN_TIMEOUT,
            bridge: BridgeRequest {
                endpoint: "http://localhost:5000/".parse().unwrap(),
                room: Self::ROOM.to_string(),
                policy: ReconnectPolicy::default(),
            },
        }
    }
}
