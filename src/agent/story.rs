// SYNOID Story Model
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use crate::error::StoryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Narration tone offered by the request form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Tone {
    #[default]
    Dramatic,
    Friendly,
    Professional,
    Epic,
}

impl Tone {
    pub const ALL: [Tone; 4] = [Tone::Dramatic, Tone::Friendly, Tone::Professional, Tone::Epic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Dramatic => "Dramatic",
            Tone::Friendly => "Friendly",
            Tone::Professional => "Professional",
            Tone::Epic => "Epic",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tone::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown tone '{}' (expected Dramatic, Friendly, Professional or Epic)", s))
    }
}

/// One submission of the story form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryRequest {
    pub theme: String,
    pub main_character: String,
    #[serde(default)]
    pub tone: Tone,
}

impl StoryRequest {
    pub fn new(theme: &str, main_character: &str, tone: Tone) -> Self {
        Self {
            theme: theme.trim().to_string(),
            main_character: main_character.trim().to_string(),
            tone,
        }
    }

    /// Both free-text fields must be filled in before anything is called.
    pub fn validate(&self) -> Result<(), StoryError> {
        if self.theme.trim().is_empty() || self.main_character.trim().is_empty() {
            return Err(StoryError::InvalidRequest(
                "please provide both theme and main character".to_string(),
            ));
        }
        Ok(())
    }
}

/// Model output split into narration and per-scene visual prompts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScriptResponse {
    /// Unmodified model text, kept for display.
    pub raw: String,
    pub narration: String,
    pub scene_prompts: Vec<String>,
}

impl ScriptResponse {
    pub fn is_empty(&self) -> bool {
        self.narration.trim().is_empty() || self.scene_prompts.is_empty()
    }
}

/// Last frame of the previous scene, already encoded for sending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinuityFrame {
    pub path: PathBuf,
    #[serde(skip)]
    pub data_uri: String,
}

/// Parameters of one video-generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipRequest {
    pub prompt: String,
    pub resolution: String,
    pub duration_secs: u32,
    /// Continuity hint. Present only when the frame could be read.
    pub image: Option<ContinuityFrame>,
}

/// Result of the best-effort compliance call for one scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ComplianceOutcome {
    Logged { status: u16 },
    Failed { reason: String },
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneArtifact {
    /// Zero-based position in the prompt list.
    pub index: usize,
    pub prompt: String,
    /// Inside the run workspace; gone once the run ends.
    pub clip_path: PathBuf,
    pub last_frame: Option<PathBuf>,
    /// Whether this scene was generated with a continuity hint attached.
    pub conditioned: bool,
    pub compliance: ComplianceOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrationTrack {
    pub audio_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalVideo {
    pub path: PathBuf,
    pub duration_secs: f64,
    pub scene_count: usize,
}

/// Everything a finished run hands back to its caller.
#[derive(Debug, Clone, Serialize)]
pub struct StoryOutput {
    pub script: ScriptResponse,
    pub narration: NarrationTrack,
    pub scenes: Vec<SceneArtifact>,
    pub video: FinalVideo,
}
