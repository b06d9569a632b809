// SYNOID Chat Bridge
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Thin client for OpenAI-compatible chat completion endpoints
// (OpenRouter by default).

use crate::config::StoryConfig;
use crate::error::{Result, StoryError};
use async_trait::async_trait;
use serde_json::json;
use tracing::{error, info};

/// Anything that turns a single user prompt into free text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

pub struct ChatBridge {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl ChatBridge {
    pub fn new(config: &StoryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.llm_timeout)
            .build()?;

        Ok(Self {
            client,
            api_url: config.llm_url.clone(),
            api_key: config.llm_api_key.clone(),
            model: config.llm_model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_url.trim_end_matches('/'))
    }
}

/// Pull `choices[0].message.content` out of a chat completion body.
pub fn extract_content(body: &serde_json::Value) -> Option<&str> {
    body["choices"][0]["message"]["content"].as_str()
}

#[async_trait]
impl ChatModel for ChatBridge {
    async fn complete(&self, prompt: &str) -> Result<String> {
        info!("[CHAT] Requesting completion from {}", self.model);

        let payload = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!("[CHAT] Connection failed: {}", e);
                StoryError::Generation(format!("chat request failed: {}", e))
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoryError::Generation(format!("chat API error {}: {}", status, body)));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| StoryError::Generation(format!("chat response was not JSON: {}", e)))?;

        extract_content(&body)
            .map(str::to_string)
            .ok_or_else(|| StoryError::Generation("chat response had no message content".to_string()))
    }
}
