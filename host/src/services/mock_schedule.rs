//! Synthetic event schedule used in place of the backend channel
//!
//! Cycles through the demo steps forever so the overlay can be exercised
//! offline.

use serde_json::json;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::traits::{BridgeEvent, BridgeLink, BridgeRequest, BridgeTransport};
use shared::{demo_steps, process_debug, Component, DemoStep};

pub struct ScheduledTransport {
    steps: Vec<DemoStep>,
    step_delay: Duration,
    cycle_pause: Duration,
}

impl ScheduledTransport {
    pub fn new() -> Self {
        Self {
            steps: demo_steps(),
            step_delay: Duration::from_secs(3),
            cycle_pause: Duration::from_secs(5),
        }
    }

    /// Configure timing (fluent API)
    pub fn with_timing(mut self, step_delay: Duration, cycle_pause: Duration) -> Self {
        self.step_delay = step_delay;
        self.cycle_pause = cycle_pause;
        self
    }
}

impl Default for ScheduledTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeTransport for ScheduledTransport {
    fn open(&self, request: &BridgeRequest) -> BridgeLink {
        let (events_tx, events_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(play(
            self.steps.clone(),
            self.step_delay,
            self.cycle_pause,
            request.room.clone(),
            events_tx,
            shutdown_rx,
        ));

        BridgeLink::new(events_rx, shutdown_tx)
    }
}

async fn play(
    steps: Vec<DemoStep>,
    step_delay: Duration,
    cycle_pause: Duration,
    room: String,
    events: mpsc::Sender<BridgeEvent>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let opening = [
        BridgeEvent::Connected {
            sid: "mock-schedule".to_string(),
        },
        BridgeEvent::RoomJoined(json!({ "status": "joined", "room": room })),
    ];
    for event in opening {
        if events.send(event).await.is_err() {
            return;
        }
    }

    if steps.is_empty() {
        return;
    }

    let mut cycle = 0u64;
    loop {
        cycle += 1;
        process_debug!(Component::Bridge, "Mock schedule cycle {}", cycle);

        for step in &steps {
            tokio::select! {
                _ = &mut shutdown => return,
                _ = tokio::time::sleep(step_delay) => {}
            }
            if events.send(BridgeEvent::Content(step.popup_payload())).await.is_err() {
                return;
            }
        }

        tokio::select! {
            _ = &mut shutdown => return,
            _ = tokio::time::sleep(cycle_pause) => {}
        }
    }
}
