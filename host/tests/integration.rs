//! Integration tests for the host event loop
//!
//! The host is wired to recording fakes and driven through the same channels
//! the real services feed.

use serde_json::json;
use std::time::Duration;

use host::core::ACCESSIBILITY_GUIDANCE;
use host::error::HostError;
use host::traits::{BridgeEvent, Screenshot, ShellEvent, WorkerEvent, WorkerStatus};
use host::{Flow, HostEvent};
use shared::{
    BackendStatus, ContentSource, ControlRequest, ControlResponse, DisplayBounds, HookStatus, MonitoringState,
    OverlayAction, OverlayToggle, PushEvent, RestartOutcome, SurfaceRole,
};

mod common;
use common::{FakeInputHook, HostBuilder, RecordingSurfaces, SurfaceCall, TestFixtures, TestHelpers};

fn is_click(event: &PushEvent) -> bool {
    matches!(event, PushEvent::MouseHookDebug(debug) if debug.action == "click-detected")
}

/// Test that startup creates the primary surface and installs the hooks
#[tokio::test]
async fn test_startup_prepares_main_surface() {
    let (mut host, probes) = HostBuilder::new().build();

    host.startup().await.unwrap();

    assert_eq!(host.main_surface(), Some(TestFixtures::MAIN_SURFACE));
    assert_eq!(
        probes.surfaces.calls(),
        vec![
            SurfaceCall::Create(TestFixtures::MAIN_SURFACE, SurfaceRole::Main),
            SurfaceCall::Load(
                TestFixtures::MAIN_SURFACE,
                ContentSource::Url(TestFixtures::MAIN_URL.to_string())
            ),
        ]
    );
    assert_eq!(probes.hook.hotkey_count(), 1);
    assert!(host.is_monitoring());

    // Shown only once the first render finished
    host.dispatch(HostEvent::Shell(ShellEvent::LoadFinished {
        surface: TestFixtures::MAIN_SURFACE,
    }))
    .await;
    assert_eq!(
        probes.surfaces.calls().last(),
        Some(&SurfaceCall::Show(TestFixtures::MAIN_SURFACE))
    );
}

/// Test that workers are started in order when the host owns them
#[tokio::test]
async fn test_startup_starts_workers() {
    let (mut host, _probes) = HostBuilder::new()
        .with_settings(|settings| settings.start_workers = true)
        .with_supervisor(|supervisor| {
            supervisor
                .expect_worker_names()
                .returning(|| vec!["backend".to_string(), "frontend".to_string()]);
            supervisor
                .expect_start()
                .times(2)
                .returning(|_| Ok(host::traits::StartOutcome::Started { pid: Some(10) }));
            supervisor.expect_wait_ready().times(2).returning(|_| Ok(()));
            supervisor.expect_stop_all().returning(|| Ok(()));
        })
        .build();

    host.startup().await.unwrap();
}

/// Test that the hotkey alternates the overlay between open and closed
#[tokio::test]
async fn test_hotkey_toggles_overlay() {
    let (mut host, probes) = TestHelpers::running_host().await;

    let overlay = TestHelpers::open_overlay(&mut host, &probes).await;
    assert_eq!(overlay, TestFixtures::FIRST_OVERLAY);
    assert!(probes.surfaces.calls().contains(&SurfaceCall::Show(overlay)));
    assert_eq!(probes.transport.opened(), 1);
    assert_eq!(probes.transport.last_request().unwrap().room, TestFixtures::ROOM);

    // The primary UI hears about the new window
    assert!(probes
        .surfaces
        .pushes_to(TestFixtures::MAIN_SURFACE)
        .contains(&PushEvent::ChildProcessOutput("Overlay window created".to_string())));

    probes.hook.press(TestFixtures::host_settings().hotkey);
    TestHelpers::step(&mut host).await;
    assert!(host.overlay().is_closed());
    assert_eq!(probes.surfaces.calls().last(), Some(&SurfaceCall::Destroy(overlay)));
    assert!(probes.transport.last_closed());

    // And open again with a fresh surface and session
    let reopened = TestHelpers::open_overlay(&mut host, &probes).await;
    assert_ne!(reopened, overlay);
    assert_eq!(probes.transport.opened(), 2);
}

/// Test that toggles while the overlay is still loading are dropped
#[tokio::test]
async fn test_toggle_during_opening_is_dropped() {
    let (mut host, _probes) = TestHelpers::running_host().await;

    let first = host.toggle_overlay();
    let second = host.toggle_overlay();

    let opened = ControlResponse::Overlay(OverlayToggle {
        success: true,
        pid: None,
        action: OverlayAction::Opened,
    });
    assert_eq!(first, opened);
    assert_eq!(second, opened);
    assert!(host.overlay().is_opening());
}

/// Test click fan-out follows the overlay's state
#[tokio::test]
async fn test_clicks_reach_overlay_only_while_open() {
    let (mut host, probes) = TestHelpers::running_host().await;

    assert!(probes.hook.click(10.0, 20.0));
    TestHelpers::step(&mut host).await;
    assert_eq!(probes.surfaces.pushes_to(TestFixtures::MAIN_SURFACE).iter().filter(|e| is_click(e)).count(), 1);

    // Opening, not yet rendered: still main only
    host.toggle_overlay();
    let overlay = host.overlay().surface().unwrap();
    probes.hook.click(30.0, 40.0);
    TestHelpers::step(&mut host).await;
    assert!(probes.surfaces.pushes_to(overlay).is_empty());

    host.dispatch(HostEvent::Shell(ShellEvent::LoadFinished { surface: overlay }))
        .await;
    probes.hook.click(50.0, 60.0);
    TestHelpers::step(&mut host).await;
    let overlay_clicks = probes.surfaces.pushes_to(overlay);
    assert_eq!(overlay_clicks.len(), 1);
    match &overlay_clicks[0] {
        PushEvent::MouseHookDebug(debug) => {
            assert_eq!(debug.click_data.x, 50.0);
            assert_eq!(debug.click_data.y, 60.0);
        }
        other => panic!("expected click, got {other:?}"),
    }

    // Closed: nothing more for the old overlay
    host.toggle_overlay();
    probes.surfaces.clear();
    probes.hook.click(70.0, 80.0);
    TestHelpers::step(&mut host).await;
    assert!(probes.surfaces.pushes_to(overlay).is_empty());
    assert_eq!(probes.surfaces.pushes_to(TestFixtures::MAIN_SURFACE).len(), 1);
}

/// Test that bridge content is normalized and delivered to the open overlay
#[tokio::test]
async fn test_bridge_content_reaches_overlay() {
    let (mut host, probes) = TestHelpers::running_host().await;
    let overlay = TestHelpers::open_overlay(&mut host, &probes).await;

    assert!(probes.transport.emit(BridgeEvent::Connected {
        sid: "nsp-1".to_string()
    }));
    TestHelpers::step(&mut host).await;

    assert!(probes
        .transport
        .emit(BridgeEvent::Content(json!({"title": "Hi", "message": "Open the File menu"}))));
    TestHelpers::step(&mut host).await;

    let pushed = probes.surfaces.pushes_to(overlay);
    assert_eq!(pushed.len(), 1);
    match &pushed[0] {
        PushEvent::OverlaySetContent(update) => {
            assert_eq!(update.header, "Hi");
            assert_eq!(update.body, "Open the File menu");
        }
        other => panic!("expected content, got {other:?}"),
    }
    // Content never goes to the primary surface
    assert!(!probes
        .surfaces
        .pushes_to(TestFixtures::MAIN_SURFACE)
        .iter()
        .any(|e| matches!(e, PushEvent::OverlaySetContent(_))));

    // After close the session is gone
    host.toggle_overlay();
    assert!(!probes.transport.emit(BridgeEvent::Content(json!({"header": "late"}))));
}

/// Test the packaged fallback is loaded once for a failed primary load
#[tokio::test]
async fn test_async_load_failure_falls_back_once() {
    let (mut host, probes) = TestHelpers::running_host().await;
    let surfaces = probes.surfaces.clone();

    host.toggle_overlay();
    let overlay = host.overlay().surface().unwrap();

    for _ in 0..2 {
        host.dispatch(HostEvent::Shell(ShellEvent::LoadFailed {
            surface: overlay,
            url: Some("http://localhost:3001/".to_string()),
        }))
        .await;
    }

    assert_eq!(
        surfaces.loads_of(overlay),
        vec![
            ContentSource::Url(TestFixtures::OVERLAY_URL.to_string()),
            TestFixtures::overlay_fallback(),
        ]
    );
}

/// Test that a synchronous rejection goes straight to the fallback
#[tokio::test]
async fn test_sync_load_rejection_falls_back() {
    let surfaces = RecordingSurfaces::rejecting_urls();
    let (mut host, _probes) = HostBuilder::new().with_surfaces(surfaces.clone()).build();
    host.startup().await.unwrap();

    host.toggle_overlay();
    let overlay = host.overlay().surface().unwrap();
    assert_eq!(surfaces.loads_of(overlay).last(), Some(&TestFixtures::overlay_fallback()));
    assert!(host.overlay().is_opening());
}

/// Test that an overlay that never renders is closed at the deadline
#[tokio::test(start_paused = true)]
async fn test_open_deadline_closes_overlay() {
    let (mut host, probes) = TestHelpers::running_host().await;

    host.toggle_overlay();
    let overlay = host.overlay().surface().unwrap();

    let event = host.next_event().await;
    assert!(matches!(event, HostEvent::OpenDeadline));
    host.dispatch(event).await;

    assert!(host.overlay().is_closed());
    assert_eq!(probes.surfaces.calls().last(), Some(&SurfaceCall::Destroy(overlay)));
}

/// Test that the shell closing the overlay itself releases it without a destroy
#[tokio::test]
async fn test_overlay_closed_by_shell() {
    let (mut host, probes) = TestHelpers::running_host().await;
    let overlay = TestHelpers::open_overlay(&mut host, &probes).await;

    probes.surfaces.clear();
    host.dispatch(HostEvent::Shell(ShellEvent::SurfaceClosed { surface: overlay }))
        .await;

    assert!(host.overlay().is_closed());
    assert!(probes.surfaces.calls().is_empty());
    assert!(probes.transport.last_closed());
}

/// Test the overlay control request reports the action taken
#[tokio::test]
async fn test_trigger_overlay_request() {
    let (mut host, probes) = TestHelpers::running_host().await;

    let response = TestHelpers::control(&mut host, ControlRequest::TriggerOverlay).await;
    assert_eq!(
        response,
        ControlResponse::Overlay(OverlayToggle {
            success: true,
            pid: None,
            action: OverlayAction::Opened,
        })
    );

    let overlay = host.overlay().surface().unwrap();
    host.dispatch(HostEvent::Shell(ShellEvent::LoadFinished { surface: overlay }))
        .await;

    let response = TestHelpers::control(&mut host, ControlRequest::TriggerOverlay).await;
    assert_eq!(
        response,
        ControlResponse::Overlay(OverlayToggle {
            success: true,
            pid: None,
            action: OverlayAction::Closed,
        })
    );
    assert!(probes.transport.last_closed());
}

/// Test backend status and restart requests
#[tokio::test]
async fn test_backend_requests() {
    let (mut host, _probes) = HostBuilder::new()
        .with_supervisor(|supervisor| {
            supervisor.expect_status().returning(|_| WorkerStatus {
                running: true,
                pid: Some(4242),
            });
            supervisor.expect_restart().times(1).returning(|_| {
                Ok(WorkerStatus {
                    running: true,
                    pid: Some(4343),
                })
            });
            supervisor.expect_stop_all().returning(|| Ok(()));
        })
        .build();

    let status = TestHelpers::control(&mut host, ControlRequest::GetBackendStatus).await;
    assert_eq!(
        status,
        ControlResponse::BackendStatus(BackendStatus {
            is_running: true,
            pid: Some(4242)
        })
    );

    let restart = TestHelpers::control(&mut host, ControlRequest::RestartBackend).await;
    assert_eq!(
        restart,
        ControlResponse::Restart(RestartOutcome {
            success: true,
            pid: Some(4343),
            error: None
        })
    );
}

/// Test that a failed restart is reported as a failure
#[tokio::test]
async fn test_backend_restart_failure() {
    let (mut host, _probes) = HostBuilder::new()
        .with_supervisor(|supervisor| {
            supervisor
                .expect_restart()
                .returning(|name| Err(HostError::spawn(name, "No such file or directory")));
        })
        .build();

    let response = TestHelpers::control(&mut host, ControlRequest::RestartBackend).await;
    assert!(!response.is_success());
}

/// Test the screenshot request encodes the captured frame
#[tokio::test]
async fn test_take_screenshot() {
    let (mut host, _probes) = HostBuilder::new()
        .with_capture(|capture| {
            capture.expect_capture_primary().returning(|| {
                Ok(Screenshot {
                    png: vec![1, 2, 3],
                    display: DisplayBounds {
                        width: 1920,
                        height: 1080,
                    },
                })
            });
        })
        .build();

    match TestHelpers::control(&mut host, ControlRequest::TakeScreenshot).await {
        ControlResponse::Screenshot(shot) => {
            assert!(shot.success);
            assert_eq!(shot.data, "AQID");
            assert_eq!(shot.size, 3);
            assert_eq!(shot.display.width, 1920);
        }
        other => panic!("expected screenshot, got {other:?}"),
    }
}

/// Test monitoring control requests
#[tokio::test]
async fn test_mouse_monitoring_requests() {
    let (mut host, _probes) = TestHelpers::running_host().await;

    let response = TestHelpers::control(&mut host, ControlRequest::StartMouseMonitoring).await;
    assert_eq!(
        response,
        ControlResponse::Monitoring(MonitoringState {
            success: true,
            active: true
        })
    );

    let response = TestHelpers::control(&mut host, ControlRequest::StopMouseMonitoring).await;
    assert_eq!(
        response,
        ControlResponse::Monitoring(MonitoringState {
            success: true,
            active: false
        })
    );

    let response = TestHelpers::control(&mut host, ControlRequest::GetMouseHookStatus).await;
    assert_eq!(response, ControlResponse::HookStatus(HookStatus { active: false }));
}

/// Test that a missing accessibility permission keeps monitoring off
#[tokio::test]
async fn test_permission_denied_monitoring() {
    let (mut host, probes) = HostBuilder::new().with_hook(FakeInputHook::denying()).build();
    host.startup().await.unwrap();
    assert!(!host.is_monitoring());
    assert!(!probes.hook.click(1.0, 1.0));

    match TestHelpers::control(&mut host, ControlRequest::StartMouseMonitoring).await {
        ControlResponse::Failure(failure) => {
            assert!(!failure.success);
            assert_eq!(failure.error, ACCESSIBILITY_GUIDANCE);
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(!host.is_monitoring());
}

/// Test that worker exits are reported to the primary UI
#[tokio::test]
async fn test_worker_exit_is_forwarded() {
    let (mut host, probes) = TestHelpers::running_host().await;

    host.dispatch(HostEvent::Worker(WorkerEvent::Exited {
        name: "backend".to_string(),
        code: Some(1),
    }))
    .await;

    assert!(probes
        .surfaces
        .pushes_to(TestFixtures::MAIN_SURFACE)
        .contains(&PushEvent::ChildProcessOutput("backend process exited with code 1".to_string())));
}

/// Test that closing the last window stops workers and quits
#[tokio::test]
async fn test_all_windows_closed_quits() {
    let (mut host, probes) = HostBuilder::new()
        .with_supervisor(|supervisor| {
            supervisor.expect_stop_all().times(1..).returning(|| Ok(()));
        })
        .build();
    host.startup().await.unwrap();

    let flow = host
        .dispatch(HostEvent::Shell(ShellEvent::SurfaceClosed {
            surface: TestFixtures::MAIN_SURFACE,
        }))
        .await;

    assert_eq!(flow, Flow::Quit);
    assert_eq!(host.main_surface(), None);
    assert_eq!(probes.hook.hotkey_count(), 0);
}

/// Test that a platform that keeps running without windows does not quit
#[tokio::test]
async fn test_keep_alive_without_windows() {
    let (mut host, _probes) = HostBuilder::new()
        .with_settings(|settings| settings.keep_alive_without_windows = true)
        .build();
    host.startup().await.unwrap();

    let flow = host.dispatch(HostEvent::Shell(ShellEvent::Disconnected)).await;
    assert_eq!(flow, Flow::Continue);
    assert_eq!(host.main_surface(), None);
}

/// Test that activation after the last window closed brings the app back up
#[tokio::test]
async fn test_activation_reopens_after_all_windows_closed() {
    let (mut host, probes) = HostBuilder::new()
        .with_settings(|settings| {
            settings.keep_alive_without_windows = true;
            settings.start_workers = true;
        })
        .with_supervisor(|supervisor| {
            supervisor
                .expect_worker_names()
                .returning(|| vec!["backend".to_string()]);
            // Once at startup and once more on activation
            supervisor
                .expect_start()
                .times(2)
                .returning(|_| Ok(host::traits::StartOutcome::Started { pid: Some(10) }));
            supervisor.expect_wait_ready().times(2).returning(|_| Ok(()));
            supervisor.expect_stop_all().returning(|| Ok(()));
        })
        .build();
    host.startup().await.unwrap();

    let flow = host
        .dispatch(HostEvent::Shell(ShellEvent::SurfaceClosed {
            surface: TestFixtures::MAIN_SURFACE,
        }))
        .await;
    assert_eq!(flow, Flow::Continue);
    assert_eq!(host.main_surface(), None);
    assert_eq!(probes.hook.hotkey_count(), 0);

    let flow = host.dispatch(HostEvent::Shell(ShellEvent::Activated)).await;
    assert_eq!(flow, Flow::Continue);

    let main = host.main_surface().unwrap();
    assert_ne!(main, TestFixtures::MAIN_SURFACE);
    assert!(probes.surfaces.calls().contains(&SurfaceCall::Create(main, SurfaceRole::Main)));
    assert_eq!(probes.hook.hotkey_count(), 1);
}

/// Test that activation with the primary surface still open changes nothing
#[tokio::test]
async fn test_activation_with_open_window_is_ignored() {
    let (mut host, probes) = TestHelpers::running_host().await;
    probes.surfaces.clear();

    let flow = host.dispatch(HostEvent::Shell(ShellEvent::Activated)).await;

    assert_eq!(flow, Flow::Continue);
    assert_eq!(host.main_surface(), Some(TestFixtures::MAIN_SURFACE));
    assert!(probes.surfaces.calls().is_empty());
    assert_eq!(probes.hook.hotkey_count(), 1);
}

/// Test that the shutdown signal ends the run loop and tears everything down
#[tokio::test]
async fn test_shutdown_signal_stops_run() {
    let (mut host, probes) = TestHelpers::running_host().await;
    TestHelpers::open_overlay(&mut host, &probes).await;

    host.get_shutdown_sender().send(()).await.unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), host.run()).await;

    assert!(matches!(result, Ok(Ok(()))));
    assert!(host.overlay().is_closed());
    assert!(!host.is_monitoring());
    assert!(probes.transport.last_closed());
}
