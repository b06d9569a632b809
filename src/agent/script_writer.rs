// SYNOID Script Writer
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Builds the story prompt, asks the chat model for a script and splits the
// answer into narration plus one visual prompt per scene.

use crate::agent::chat_bridge::ChatModel;
use crate::agent::story::{ScriptResponse, StoryRequest};
use crate::error::Result;
use tracing::{info, warn};

pub const AUDIO_MARKER: &str = "### Audio Script";
pub const VISUAL_MARKER: &str = "### Visual Prompts";

pub fn build_story_prompt(request: &StoryRequest) -> String {
    let character = &request.main_character;
    format!(
        r#"Create a 4-scene story based on the theme "{theme}" in a {tone} tone.

Return in the following format:

{audio}
- Four narration lines (each <5 seconds).
- Write naturally as storytelling voiceover. Add dramatic pauses with commas or ellipses.
- Do not include any headings, scene numbers, etc. Purely storytelling audio.
- Storytelling style, emotionally engaging. Avoid character descriptions.

{visual}
- Four cinematic prompts, one per scene, one per line.
- Always include: {character}, with token {character} for consistency.
- Example: "{character}, standing in [scene details]".
- Ensure each scene prompt is cinematic and visually descriptive.

You must include both "{audio}" and "{visual}" headings exactly as written, they are used for separation."#,
        theme = request.theme,
        tone = request.tone,
        audio = AUDIO_MARKER,
        visual = VISUAL_MARKER,
        character = character,
    )
}

/// Split raw model text on the two section markers.
///
/// When either marker is missing the narration and prompt list come back
/// empty; callers decide whether that is fatal.
pub fn parse_script(raw: &str) -> ScriptResponse {
    if !(raw.contains(AUDIO_MARKER) && raw.contains(VISUAL_MARKER)) {
        warn!("[SCRIPT] Section markers missing from model output, script is empty");
        return ScriptResponse {
            raw: raw.to_string(),
            ..Default::default()
        };
    }

    // Only the segment between the first and second visual marker counts.
    let mut parts = raw.split(VISUAL_MARKER);
    let audio_part = parts.next().unwrap_or_default();
    let visual_part = parts.next().unwrap_or_default();

    let narration = audio_part.replace(AUDIO_MARKER, "").trim().to_string();
    let scene_prompts = visual_part
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    ScriptResponse {
        raw: raw.to_string(),
        narration,
        scene_prompts,
    }
}

pub struct ScriptWriter<M: ChatModel + ?Sized> {
    model: std::sync::Arc<M>,
}

impl<M: ChatModel + ?Sized> ScriptWriter<M> {
    pub fn new(model: std::sync::Arc<M>) -> Self {
        Self { model }
    }

    pub async fn write(&self, request: &StoryRequest) -> Result<ScriptResponse> {
        info!("[SCRIPT] Writing story: theme='{}', tone={}", request.theme, request.tone);

        let prompt = build_story_prompt(request);
        let raw = self.model.complete(&prompt).await?;
        let script = parse_script(&raw);

        info!(
            "[SCRIPT] Parsed narration ({} chars) and {} scene prompts",
            script.narration.len(),
            script.scene_prompts.len()
        );
        if !script.scene_prompts.is_empty() && script.scene_prompts.len() != 4 {
            warn!("[SCRIPT] Expected 4 scene prompts, got {}", script.scene_prompts.len());
        }
        Ok(script)
    }
}
