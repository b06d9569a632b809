// SYNOID Presenter Seam
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// The pipeline reports every intermediate artifact through `Presenter`.
// Rendering (terminal, dashboard, ...) lives behind this trait.

use crate::agent::story::{FinalVideo, NarrationTrack, SceneArtifact, ScriptResponse};
use serde::Serialize;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    ScriptReady { script: ScriptResponse },
    NarrationReady { narration: NarrationTrack },
    SceneStarted { index: usize, conditioned: bool },
    ContinuityDropped { index: usize, reason: String },
    SceneReady { scene: SceneArtifact },
    BudgetReached { produced: usize, skipped: usize },
    FinalReady { video: FinalVideo },
    Failed { message: String },
}

pub trait Presenter: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn on_event(&self, _event: &PipelineEvent) {}
}

/// Terminal output for the CLI.
pub struct ConsolePresenter {
    pub show_script: bool,
}

impl Presenter for ConsolePresenter {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::ScriptReady { script } => {
                println!("✅ Story and visual prompts generated! ({} scenes)", script.scene_prompts.len());
                if self.show_script {
                    println!("\n📜 Full Script\n{}\n", script.raw);
                }
            }
            PipelineEvent::NarrationReady { narration } => {
                println!("🎙️ Narration ready: {}", narration.audio_path.display());
            }
            PipelineEvent::SceneStarted { index, conditioned } => {
                let hint = if *conditioned { " (continuing from previous frame)" } else { "" };
                println!("🎞️ Generating Scene {}...{}", index + 1, hint);
            }
            PipelineEvent::ContinuityDropped { index, reason } => {
                println!("⚠️ Scene {} proceeds without continuity frame: {}", index + 1, reason);
            }
            PipelineEvent::SceneReady { scene } => {
                println!("✅ Scene {} ready!", scene.index + 1);
            }
            PipelineEvent::BudgetReached { produced, skipped } => {
                println!(
                    "⚠️ Reached total duration limit after {} scenes. Skipping {} further scenes.",
                    produced, skipped
                );
            }
            PipelineEvent::FinalReady { video } => {
                println!(
                    "🎥 Final video generated: {} ({:.1}s, {} scenes)",
                    video.path.display(),
                    video.duration_secs,
                    video.scene_count
                );
            }
            PipelineEvent::Failed { message } => {
                println!("❌ Error: {}", message);
            }
        }
    }
}

/// Keeps every event in memory. Cheap to clone; clones share the log.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<PipelineEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Presenter for EventLog {
    fn on_event(&self, event: &PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
