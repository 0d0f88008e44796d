//! Guidance steps and the backend's step endpoint contract

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One guidance step as published to the overlay room
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DemoStep {
    pub step_order: u32,
    pub header: String,
    pub body: String,
}

impl DemoStep {
    fn new(step_order: u32, header: &str, body: &str) -> Self {
        Self {
            step_order,
            header: header.to_string(),
            body: body.to_string(),
        }
    }

    /// Payload shaped like a backend `popup_message` event
    pub fn popup_payload(&self) -> Value {
        serde_json::json!({ "header": self.header, "body": self.body })
    }
}

/// Fixed walkthrough used by the synthetic schedule and the step driver
pub fn demo_steps() -> Vec<DemoStep> {
    vec![
        DemoStep::new(
            1,
            "Step 1: Getting Started",
            "Welcome! Let's begin by opening your design tool and creating a new project.",
        ),
        DemoStep::new(
            2,
            "Step 2: Create Frame",
            "Create a new frame by clicking the Frame tool and drawing a rectangle on the canvas.",
        ),
        DemoStep::new(
            3,
            "Step 3: Add Components",
            "Add text, buttons, and other UI components to your frame using the component library.",
        ),
        DemoStep::new(
            4,
            "Step 4: Style Elements",
            "Customize colors, fonts, and spacing using the design panel on the right.",
        ),
        DemoStep::new(
            5,
            "Step 5: Add Interactions",
            "Create clickable prototypes by connecting frames with interactive elements.",
        ),
        DemoStep::new(
            6,
            "Step 6: Test Prototype",
            "Preview your prototype and test all interactions to ensure they work correctly.",
        ),
        DemoStep::new(
            7,
            "Step 7: Share & Collaborate",
            "Share your design with team members and gather feedback for improvements.",
        ),
        DemoStep::new(
            8,
            "Step 8: Export Assets",
            "Export your designs as images or code for development handoff.",
        ),
    ]
}

/// Body of `POST /api/start-step`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StartStepRequest {
    pub user_id: String,
    pub lesson_id: u64,
    pub step_order: u32,
    pub header: String,
    pub body: String,
}

/// Successful response of `POST /api/start-step`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StartStepResponse {
    pub message: String,
    pub step_data: Value,
    #[serde(default)]
    pub status: Option<String>,
}
