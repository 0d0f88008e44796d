//! Global input events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single captured click, in global screen coordinates
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct ClickEvent {
    pub x: f64,
    pub y: f64,
    pub timestamp: DateTime<Utc>,
}

impl ClickEvent {
    pub fn now(x: f64, y: f64) -> Self {
        Self { x, y, timestamp: Utc::now() }
    }
}

/// Payload of the `mouse-hook-debug` push channel
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MouseHookDebug {
    pub action: String,
    pub click_data: ClickEvent,
    pub timestamp: DateTime<Utc>,
}

impl MouseHookDebug {
    pub fn click_detected(click: ClickEvent) -> Self {
        Self {
            action: "click-detected".to_string(),
            click_data: click,
            timestamp: Utc::now(),
        }
    }
}
