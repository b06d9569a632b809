// SYNOID Story Configuration
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Credentials and endpoints are read once at startup into an explicit
// `StoryConfig` that is handed to every collaborator.

use crate::error::ConfigError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_LLM_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_LLM_MODEL: &str = "meta-llama/llama-3.3-8b-instruct:free";
pub const DEFAULT_VIDEO_URL: &str = "https://api.replicate.com/v1";
pub const DEFAULT_VIDEO_MODEL: &str = "bytedance/seedance-1-pro";
pub const DEFAULT_TTS_URL: &str = "https://translate.google.com/translate_tts";

#[derive(Debug, Clone)]
pub struct StoryConfig {
    pub llm_api_key: String,
    pub llm_url: String,
    pub llm_model: String,
    pub llm_timeout: Duration,

    pub video_api_key: String,
    pub video_url: String,
    pub video_model: String,
    /// How long to keep polling a prediction that did not finish inline.
    pub video_poll_limit: Duration,

    pub tts_url: String,
    pub tts_lang: String,
    pub tts_slow: bool,

    /// Compliance logging is off unless an endpoint is configured.
    pub compliance_url: Option<String>,
    pub compliance_timeout: Duration,

    pub scene_secs: u32,
    pub scene_budget_secs: u32,
    pub max_video_secs: u32,
    pub resolution: String,
    pub fps: u32,

    pub output_dir: PathBuf,
    pub server_api_key: Option<String>,
}

impl StoryConfig {
    /// Load from the process environment (call `dotenv()` first).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary lookup so tests never touch the real environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let llm_api_key = get("OPENROUTER_API_KEY").ok_or(ConfigError::MissingVar("OPENROUTER_API_KEY"))?;
        let video_api_key = get("SEEDANCE_API_KEY").ok_or(ConfigError::MissingVar("SEEDANCE_API_KEY"))?;

        let llm_url = endpoint("STORY_LLM_URL", get("STORY_LLM_URL"), DEFAULT_LLM_URL)?;
        let video_url = endpoint("STORY_VIDEO_URL", get("STORY_VIDEO_URL"), DEFAULT_VIDEO_URL)?;
        let tts_url = endpoint("STORY_TTS_URL", get("STORY_TTS_URL"), DEFAULT_TTS_URL)?;
        let compliance_url = match get("STORY_COMPLIANCE_URL") {
            Some(raw) => Some(endpoint("STORY_COMPLIANCE_URL", Some(raw), "")?),
            None => None,
        };

        let scene_secs: u32 = number("STORY_SCENE_SECS", get("STORY_SCENE_SECS"), 5)?;
        let scene_budget_secs: u32 = number("STORY_SCENE_BUDGET_SECS", get("STORY_SCENE_BUDGET_SECS"), 115)?;
        let max_video_secs: u32 = number("STORY_MAX_VIDEO_SECS", get("STORY_MAX_VIDEO_SECS"), 120)?;
        let fps: u32 = number("STORY_FPS", get("STORY_FPS"), 24)?;

        if scene_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "STORY_SCENE_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }
        if fps == 0 {
            return Err(ConfigError::Invalid {
                var: "STORY_FPS",
                reason: "must be greater than zero".to_string(),
            });
        }
        if scene_budget_secs > max_video_secs {
            return Err(ConfigError::Invalid {
                var: "STORY_SCENE_BUDGET_SECS",
                reason: format!("{} exceeds STORY_MAX_VIDEO_SECS ({})", scene_budget_secs, max_video_secs),
            });
        }

        Ok(Self {
            llm_api_key,
            llm_url,
            llm_model: get("STORY_LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            llm_timeout: Duration::from_secs(60),
            video_api_key,
            video_url,
            video_model: get("STORY_VIDEO_MODEL").unwrap_or_else(|| DEFAULT_VIDEO_MODEL.to_string()),
            video_poll_limit: Duration::from_secs(number("STORY_VIDEO_POLL_SECS", get("STORY_VIDEO_POLL_SECS"), 600)?),
            tts_url,
            tts_lang: get("STORY_TTS_LANG").unwrap_or_else(|| "en".to_string()),
            tts_slow: true,
            compliance_url,
            compliance_timeout: Duration::from_secs(60),
            scene_secs,
            scene_budget_secs,
            max_video_secs,
            resolution: get("STORY_RESOLUTION").unwrap_or_else(|| "480p".to_string()),
            fps,
            output_dir: PathBuf::from(get("STORY_OUTPUT_DIR").unwrap_or_else(|| "output".to_string())),
            server_api_key: get("STORY_API_KEY"),
        })
    }
}

fn endpoint(var: &'static str, raw: Option<String>, default: &str) -> Result<String, ConfigError> {
    let raw = raw.unwrap_or_else(|| default.to_string());
    let parsed = Url::parse(&raw).map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(raw.trim_end_matches('/').to_string()),
        other => Err(ConfigError::Invalid {
            var,
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

fn number<T: FromStr>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::Invalid {
            var,
            reason: format!("'{}': {}", raw, e),
        }),
    }
}
