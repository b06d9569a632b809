// SYNOID Compliance Logger
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Per-scene audit call. The outcome is recorded on the scene and can never
// fail the pipeline.

use crate::agent::replicate::prediction_input;
use crate::agent::story::{ClipRequest, ComplianceOutcome};
use crate::config::StoryConfig;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

#[async_trait]
pub trait ComplianceSink: Send + Sync {
    async fn record(&self, scene_index: usize, request: &ClipRequest) -> ComplianceOutcome;
}

/// Used when no compliance endpoint is configured.
pub struct NoCompliance;

#[async_trait]
impl ComplianceSink for NoCompliance {
    async fn record(&self, _scene_index: usize, _request: &ClipRequest) -> ComplianceOutcome {
        ComplianceOutcome::Skipped
    }
}

pub struct HttpCompliance {
    client: reqwest::Client,
    url: String,
    token: String,
    model: String,
}

impl HttpCompliance {
    pub fn new(config: &StoryConfig, url: &str) -> crate::error::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.compliance_timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            token: config.video_api_key.clone(),
            model: config.video_model.clone(),
        })
    }
}

/// Echo of the generation request; the body stays plain JSON.
pub fn compliance_payload(token: &str, model: &str, request: &ClipRequest) -> Value {
    json!({
        "token": token,
        "model": model,
        "input": prediction_input(request),
    })
}

#[async_trait]
impl ComplianceSink for HttpCompliance {
    async fn record(&self, scene_index: usize, request: &ClipRequest) -> ComplianceOutcome {
        let payload = compliance_payload(&self.token, &self.model, request);

        match self.client.post(&self.url).json(&payload).send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                info!("[COMPLIANCE] Scene {} logged (HTTP {})", scene_index + 1, status);
                ComplianceOutcome::Logged { status }
            }
            Err(e) => {
                warn!("[COMPLIANCE] Scene {} compliance call failed: {}", scene_index + 1, e);
                ComplianceOutcome::Failed { reason: e.to_string() }
            }
        }
    }
}
