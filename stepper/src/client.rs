//! HTTP client for the backend's step endpoint

use anyhow::{Context, Result};
use reqwest::Url;
use std::time::Duration;

use shared::{DemoStep, StartStepRequest, StartStepResponse};

pub struct BackendClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl BackendClient {
    pub fn new(api_url: &str) -> Result<Self> {
        let base = Url::parse(api_url).with_context(|| format!("invalid api url {api_url}"))?;
        let endpoint = base.join("/api/start-step").context("building step endpoint")?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("building http client")?;

        Ok(Self { client, endpoint })
    }

    pub async fn start_step(&self, user_id: &str, lesson_id: u64, step: &DemoStep) -> Result<StartStepResponse> {
        let request = StartStepRequest {
            user_id: user_id.to_string(),
            lesson_id,
            step_order: step.step_order,
            header: step.header.clone(),
            body: step.body.clone(),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .with_context(|| format!("posting step {}", step.step_order))?
            .error_for_status()
            .with_context(|| format!("backend rejected step {}", step.step_order))?;

        response
            .json::<StartStepResponse>()
            .await
            .context("decoding start-step response")
    }
}
