// SYNOID Scene Producer — Continuity-Linked Clip Generation
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Walks the visual prompts in order. Each scene is generated with the last
// frame of the previous scene attached as a continuity hint, until the
// duration budget is spent.

use crate::agent::compliance::ComplianceSink;
use crate::agent::presenter::{PipelineEvent, Presenter};
use crate::agent::media::image_data_uri;
use crate::agent::story::{ClipRequest, ContinuityFrame, SceneArtifact};
use crate::config::StoryConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Hosted text-to-video model.
#[async_trait]
pub trait VideoGenerator: Send + Sync {
    /// Run one generation and return the URL of the finished clip.
    async fn generate(&self, request: &ClipRequest) -> Result<String>;

    /// Fetch a finished clip to `dest`, returning the number of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}

#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Write the last decodable frame of `clip` to `dest`.
    /// `Ok(None)` means the clip has no frames at all.
    async fn last_frame(&self, clip: &Path, dest: &Path) -> Result<Option<PathBuf>>;
}

/// Running total of requested scene time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationBudget {
    used_secs: u32,
    limit_secs: u32,
}

impl DurationBudget {
    pub fn new(limit_secs: u32) -> Self {
        Self { used_secs: 0, limit_secs }
    }

    pub fn has_room(&self) -> bool {
        self.used_secs < self.limit_secs
    }

    /// Counts the requested length, not the measured one.
    pub fn spend(&mut self, secs: u32) {
        self.used_secs = self.used_secs.saturating_add(secs);
    }

    pub fn used_secs(&self) -> u32 {
        self.used_secs
    }
}

#[derive(Debug, Clone)]
pub struct SceneSettings {
    pub resolution: String,
    pub scene_secs: u32,
    pub budget_secs: u32,
}

impl From<&StoryConfig> for SceneSettings {
    fn from(config: &StoryConfig) -> Self {
        Self {
            resolution: config.resolution.clone(),
            scene_secs: config.scene_secs,
            budget_secs: config.scene_budget_secs,
        }
    }
}

pub struct SceneProducer {
    generator: Arc<dyn VideoGenerator>,
    frames: Arc<dyn FrameExtractor>,
    compliance: Arc<dyn ComplianceSink>,
    settings: SceneSettings,
}

impl SceneProducer {
    pub fn new(
        generator: Arc<dyn VideoGenerator>,
        frames: Arc<dyn FrameExtractor>,
        compliance: Arc<dyn ComplianceSink>,
        settings: SceneSettings,
    ) -> Self {
        Self {
            generator,
            frames,
            compliance,
            settings,
        }
    }

    /// Produce scenes for `prompts` inside `workspace`.
    ///
    /// Any generation or download failure aborts the whole run. Continuity
    /// and compliance problems only degrade the affected scene.
    pub async fn produce(
        &self,
        prompts: &[String],
        workspace: &Path,
        presenter: &dyn Presenter,
    ) -> Result<Vec<SceneArtifact>> {
        let mut budget = DurationBudget::new(self.settings.budget_secs);
        let mut scenes: Vec<SceneArtifact> = Vec::with_capacity(prompts.len());
        let mut hint: Option<PathBuf> = None;

        for (index, prompt) in prompts.iter().enumerate() {
            if !budget.has_room() {
                let skipped = prompts.len() - index;
                warn!(
                    "[SCENE] Duration budget reached ({}s). Skipping {} remaining scenes.",
                    budget.used_secs(),
                    skipped
                );
                presenter.on_event(&PipelineEvent::BudgetReached {
                    produced: scenes.len(),
                    skipped,
                });
                break;
            }

            let image = match hint.take() {
                Some(frame) => match load_hint(&frame).await {
                    Ok(loaded) => Some(loaded),
                    Err(reason) => {
                        warn!("[SCENE] Could not attach previous frame for scene {}: {}", index + 1, reason);
                        presenter.on_event(&PipelineEvent::ContinuityDropped { index, reason });
                        None
                    }
                },
                None => None,
            };

            let request = ClipRequest {
                prompt: prompt.clone(),
                resolution: self.settings.resolution.clone(),
                duration_secs: self.settings.scene_secs,
                image,
            };

            info!("[SCENE] Generating scene {} (conditioned: {})", index + 1, request.image.is_some());
            presenter.on_event(&PipelineEvent::SceneStarted {
                index,
                conditioned: request.image.is_some(),
            });

            let url = self.generator.generate(&request).await?;
            let clip_path = workspace.join(format!("scene_{:03}.mp4", index + 1));
            let bytes = self.generator.download(&url, &clip_path).await?;
            info!("[SCENE] Scene {} downloaded ({} bytes)", index + 1, bytes);

            let frame_path = workspace.join(format!("scene_{:03}_last.jpg", index + 1));
            let last_frame = match self.frames.last_frame(&clip_path, &frame_path).await {
                Ok(Some(frame)) => Some(frame),
                Ok(None) => {
                    self.drop_continuity(index, prompts.len(), "clip has no decodable frames".to_string(), presenter);
                    None
                }
                Err(e) => {
                    self.drop_continuity(index, prompts.len(), e.to_string(), presenter);
                    None
                }
            };

            budget.spend(self.settings.scene_secs);

            let compliance = self.compliance.record(index, &request).await;

            hint = last_frame.clone();
            let scene = SceneArtifact {
                index,
                prompt: prompt.clone(),
                clip_path,
                last_frame,
                conditioned: request.image.is_some(),
                compliance,
            };
            presenter.on_event(&PipelineEvent::SceneReady { scene: scene.clone() });
            scenes.push(scene);
        }

        info!("[SCENE] Produced {} scenes ({}s requested)", scenes.len(), budget.used_secs());
        Ok(scenes)
    }

    fn drop_continuity(&self, index: usize, total: usize, reason: String, presenter: &dyn Presenter) {
        warn!("[SCENE] No continuity frame from scene {}: {}", index + 1, reason);
        if index + 1 < total {
            presenter.on_event(&PipelineEvent::ContinuityDropped { index: index + 1, reason });
        }
    }
}

/// A hint is usable when it is still a non-empty file on disk that can be
/// read into a data URI.
async fn load_hint(frame: &Path) -> std::result::Result<ContinuityFrame, String> {
    let meta = tokio::fs::metadata(frame).await.map_err(|e| e.to_string())?;
    if !meta.is_file() || meta.len() == 0 {
        return Err(format!("{:?} is not a readable frame", frame));
    }
    let data_uri = image_data_uri(frame).await.map_err(|e| e.to_string())?;
    Ok(ContinuityFrame {
        path: frame.to_path_buf(),
        data_uri,
    })
}
