//! Common test utilities for host integration tests

#![allow(dead_code)]

pub mod fixtures;
pub mod helpers;

pub use fixtures::TestFixtures;
pub use helpers::{FakeInputHook, HostBuilder, Probes, RecordingSurfaces, SurfaceCall, TestHelpers, TestHost};
