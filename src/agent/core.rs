// SYNOID Story Core - The Pipeline Kernel
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Owns the five collaborators and drives one request through them:
// script -> narration -> scenes -> assembly, reporting every artifact to
// the presenter. Shared by the CLI and the dashboard server.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::agent::chat_bridge::{ChatBridge, ChatModel};
use crate::agent::compliance::{ComplianceSink, HttpCompliance, NoCompliance};
use crate::agent::media::FfmpegFrameGrabber;
use crate::agent::presenter::{PipelineEvent, Presenter};
use crate::agent::replicate::ReplicateVideo;
use crate::agent::scene_producer::{FrameExtractor, SceneProducer, SceneSettings, VideoGenerator};
use crate::agent::script_writer::ScriptWriter;
use crate::agent::story::{NarrationTrack, StoryOutput, StoryRequest};
use crate::agent::video_stitcher::{Assembler, VideoStitcher};
use crate::agent::voice::{GoogleTts, SpeechSynthesizer};
use crate::agent::workspace::RunWorkspace;
use crate::config::StoryConfig;
use crate::error::{Result, StoryError};

pub const FINAL_VIDEO_FILE: &str = "story.mp4";
pub const NARRATION_FILE: &str = "narration.mp3";
pub const SCRIPT_FILE: &str = "script.txt";

/// Collaborators for a pipeline. Tests swap in fakes here.
pub struct PipelineParts {
    pub chat: Arc<dyn ChatModel>,
    pub narrator: Arc<dyn SpeechSynthesizer>,
    pub generator: Arc<dyn VideoGenerator>,
    pub frames: Arc<dyn FrameExtractor>,
    pub compliance: Arc<dyn ComplianceSink>,
    pub assembler: Arc<dyn Assembler>,
    pub settings: SceneSettings,
    pub output_dir: PathBuf,
}

impl PipelineParts {
    /// The production wiring: OpenRouter, Google TTS, Replicate, ffmpeg.
    pub fn from_config(config: &StoryConfig) -> Result<Self> {
        let compliance: Arc<dyn ComplianceSink> = match &config.compliance_url {
            Some(url) => Arc::new(HttpCompliance::new(config, url)?),
            None => Arc::new(NoCompliance),
        };

        Ok(Self {
            chat: Arc::new(ChatBridge::new(config)?),
            narrator: Arc::new(GoogleTts::new(config)?),
            generator: Arc::new(ReplicateVideo::new(config)?),
            frames: Arc::new(FfmpegFrameGrabber),
            compliance,
            assembler: Arc::new(VideoStitcher::from_config(config)),
            settings: SceneSettings::from(config),
            output_dir: config.output_dir.clone(),
        })
    }
}

pub struct StoryPipeline {
    writer: ScriptWriter<dyn ChatModel>,
    narrator: Arc<dyn SpeechSynthesizer>,
    producer: SceneProducer,
    assembler: Arc<dyn Assembler>,
    output_dir: PathBuf,
}

impl StoryPipeline {
    pub fn new(parts: PipelineParts) -> Self {
        Self {
            writer: ScriptWriter::new(parts.chat),
            narrator: parts.narrator,
            producer: SceneProducer::new(parts.generator, parts.frames, parts.compliance, parts.settings),
            assembler: parts.assembler,
            output_dir: parts.output_dir,
        }
    }

    pub fn from_config(config: &StoryConfig) -> Result<Self> {
        Ok(Self::new(PipelineParts::from_config(config)?))
    }

    /// Where the persisted artifacts of `run_id` end up.
    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.output_dir.join(run_id)
    }

    /// Run one request end to end. Any failure is reported once to the
    /// presenter and returned; nothing is retried or resumed.
    pub async fn run(
        &self,
        run_id: &str,
        request: &StoryRequest,
        presenter: &dyn Presenter,
    ) -> Result<StoryOutput> {
        info!("[CORE] Run {} started: theme='{}'", run_id, request.theme);

        let result = match self.claim_run_dir(run_id, request).await {
            Ok(run_dir) => {
                let result = self.run_stages(&run_dir, request, presenter).await;
                if result.is_err() {
                    discard_run_dir(&run_dir).await;
                }
                result
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(output) => {
                info!("[CORE] Run {} finished: {:?}", run_id, output.video.path);
                Ok(output)
            }
            Err(e) => {
                error!("[CORE] Run {} failed: {}", run_id, e);
                presenter.on_event(&PipelineEvent::Failed { message: e.to_string() });
                Err(e)
            }
        }
    }

    /// Validate the request and create its run directory. The directory must
    /// not exist yet, so cleaning up a failed run never touches older output.
    async fn claim_run_dir(&self, run_id: &str, request: &StoryRequest) -> Result<PathBuf> {
        request.validate()?;

        let run_dir = self.run_dir(run_id);
        tokio::fs::create_dir_all(&self.output_dir).await?;
        match tokio::fs::create_dir(&run_dir).await {
            Ok(()) => Ok(run_dir),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(StoryError::InvalidRequest(
                format!("run '{}' already has output in {:?}", run_id, run_dir),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn run_stages(
        &self,
        run_dir: &Path,
        request: &StoryRequest,
        presenter: &dyn Presenter,
    ) -> Result<StoryOutput> {
        let workspace = RunWorkspace::create()?;

        // 1. Script
        let script = self.writer.write(request).await?;
        tokio::fs::write(run_dir.join(SCRIPT_FILE), &script.raw).await?;
        presenter.on_event(&PipelineEvent::ScriptReady { script: script.clone() });

        if script.narration.trim().is_empty() {
            return Err(StoryError::EmptyScript(
                "model output has no narration (missing section markers?)".to_string(),
            ));
        }
        if script.scene_prompts.is_empty() {
            return Err(StoryError::EmptyScript(
                "model output has no visual prompts (missing section markers?)".to_string(),
            ));
        }

        // 2. Narration: synthesized in the workspace, persisted only once complete
        let draft = workspace.file(NARRATION_FILE);
        self.narrator.synthesize(&script.narration, &draft).await?;
        let narration = NarrationTrack {
            audio_path: run_dir.join(NARRATION_FILE),
        };
        tokio::fs::copy(&draft, &narration.audio_path).await?;
        presenter.on_event(&PipelineEvent::NarrationReady { narration: narration.clone() });

        // 3. Scenes
        let scenes = self
            .producer
            .produce(&script.scene_prompts, workspace.path(), presenter)
            .await?;

        // 4. Assembly
        let video = self
            .assembler
            .assemble(&scenes, &narration, &run_dir.join(FINAL_VIDEO_FILE))
            .await?;
        presenter.on_event(&PipelineEvent::FinalReady { video: video.clone() });

        Ok(StoryOutput {
            script,
            narration,
            scenes,
            video,
        })
    }
}

/// A failed run keeps nothing: whatever it persisted so far is removed.
async fn discard_run_dir(run_dir: &Path) {
    match tokio::fs::remove_dir_all(run_dir).await {
        Ok(()) => warn!("[CORE] Removed partial output {:?}", run_dir),
        Err(e) => warn!("[CORE] Could not remove partial output {:?}: {}", run_dir, e),
    }
}
