// SYNOID Replicate Client — Hosted Video Generation
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Runs text/image-to-video predictions (bytedance/seedance-1-pro by default)
// and fetches the resulting clips.

use crate::agent::scene_producer::VideoGenerator;
use crate::agent::story::ClipRequest;
use crate::config::StoryConfig;
use crate::error::{Result, StoryError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct ReplicateVideo {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    poll_limit: Duration,
}

impl ReplicateVideo {
    pub fn new(config: &StoryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;

        Ok(Self {
            client,
            api_url: config.video_url.clone(),
            api_key: config.video_api_key.clone(),
            model: config.video_model.clone(),
            poll_limit: config.video_poll_limit,
        })
    }

    fn predictions_endpoint(&self) -> String {
        format!("{}/models/{}/predictions", self.api_url.trim_end_matches('/'), self.model)
    }

    async fn wait_for_prediction(&self, mut prediction: Value) -> Result<String> {
        let started = Instant::now();

        loop {
            match prediction["status"].as_str().unwrap_or("unknown") {
                "succeeded" => {
                    return prediction_output_url(&prediction).ok_or_else(|| {
                        StoryError::VideoService("prediction succeeded without an output URL".to_string())
                    });
                }
                "failed" | "canceled" => {
                    let reason = prediction["error"].as_str().unwrap_or("no error message");
                    return Err(StoryError::VideoService(format!(
                        "prediction {}: {}",
                        prediction["status"].as_str().unwrap_or_default(),
                        reason
                    )));
                }
                status => {
                    if started.elapsed() > self.poll_limit {
                        return Err(StoryError::VideoService(format!(
                            "prediction still '{}' after {:?}",
                            status, self.poll_limit
                        )));
                    }
                    debug!("[REPLICATE] Prediction status: {}", status);
                }
            }

            let get_url = prediction["urls"]["get"]
                .as_str()
                .ok_or_else(|| StoryError::VideoService("prediction has no polling URL".to_string()))?
                .to_string();

            tokio::time::sleep(POLL_INTERVAL).await;

            let resp = self.client.get(&get_url).bearer_auth(&self.api_key).send().await?;
            let status = resp.status();
            if !status.is_success() {
                warn!("[REPLICATE] Poll returned HTTP {}", status);
                continue;
            }
            prediction = resp.json().await?;
        }
    }
}

/// Model input for one scene. The continuity frame travels inline as the
/// data URI the scene loop already encoded.
pub fn prediction_input(request: &ClipRequest) -> Value {
    let mut input = json!({
        "prompt": request.prompt,
        "resolution": request.resolution,
        "duration": request.duration_secs,
    });

    if let Some(frame) = &request.image {
        input["image"] = Value::String(frame.data_uri.clone());
    }

    input
}

pub fn prediction_body(request: &ClipRequest) -> Value {
    json!({ "input": prediction_input(request) })
}

/// `output` is either a single URL or a list of URLs.
pub fn prediction_output_url(prediction: &Value) -> Option<String> {
    match &prediction["output"] {
        Value::String(url) => Some(url.clone()),
        Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

#[async_trait]
impl VideoGenerator for ReplicateVideo {
    async fn generate(&self, request: &ClipRequest) -> Result<String> {
        info!("[REPLICATE] Running {} ({}, {}s)", self.model, request.resolution, request.duration_secs);

        let body = prediction_body(request);
        let resp = self
            .client
            .post(self.predictions_endpoint())
            .bearer_auth(&self.api_key)
            .header("Prefer", "wait")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(StoryError::VideoService(format!("HTTP {}: {}", status, text)));
        }

        let prediction: Value = resp.json().await?;
        let url = self.wait_for_prediction(prediction).await?;
        info!("[REPLICATE] Clip ready: {}", url);
        Ok(url)
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(StoryError::VideoService(format!("clip download failed with HTTP {}", status)));
        }

        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Err(StoryError::VideoService(format!("clip at {} is empty", url)));
        }

        tokio::fs::write(dest, &bytes).await?;
        Ok(bytes.len() as u64)
    }
}
