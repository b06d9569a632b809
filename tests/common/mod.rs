// Shared fakes for the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use synoid_story::agent::chat_bridge::ChatModel;
use synoid_story::agent::compliance::ComplianceSink;
use synoid_story::agent::core::{PipelineParts, StoryPipeline};
use synoid_story::agent::scene_producer::{FrameExtractor, SceneSettings, VideoGenerator};
use synoid_story::agent::story::{
    ClipRequest, ComplianceOutcome, FinalVideo, NarrationTrack, SceneArtifact,
};
use synoid_story::agent::video_stitcher::Assembler;
use synoid_story::agent::voice::SpeechSynthesizer;
use synoid_story::error::{Result, StoryError};

pub const SCRIPT: &str = "### Audio Script\n\
In the year 3000, a lone pilot crossed the silent rings of Saturn.\n\
\n\
### Visual Prompts\n\
A silver starship drifting past icy rings\n\
The pilot's face lit by a flickering console\n\
A storm of ice crystals hitting the hull\n\
The ship landing on a frozen moon at dawn\n";

pub fn prompts(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("Scene prompt number {}", i)).collect()
}

pub struct FakeChat {
    reply: String,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeChat {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChatModel for FakeChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

#[derive(Default)]
pub struct FakeTts {
    pub calls: AtomicUsize,
    /// Write half a file, then fail, like a dropped connection mid-chunk.
    pub fail_midway: bool,
}

#[async_trait]
impl SpeechSynthesizer for FakeTts {
    async fn synthesize(&self, text: &str, output_path: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_midway {
            tokio::fs::write(output_path, b"mp3:partial").await?;
            return Err(StoryError::Generation("TTS request 1 failed with 503".to_string()));
        }
        tokio::fs::write(output_path, format!("mp3:{}", text)).await?;
        Ok(())
    }
}

/// What the video service saw for one generation call.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub request: ClipRequest,
    /// Content of the attached image at call time, if any.
    pub hint_content: Option<String>,
}

/// Every downloaded clip contains `clip-<n>` with `n` the zero-based call count.
#[derive(Default)]
pub struct FakeVideo {
    pub seen: Mutex<Vec<SeenRequest>>,
    /// Zero-based call index that fails with a service error.
    pub fail_at: Option<usize>,
}

#[async_trait]
impl VideoGenerator for FakeVideo {
    async fn generate(&self, request: &ClipRequest) -> Result<String> {
        let hint_content = request.image.as_ref().map(|frame| decode_data_uri(&frame.data_uri));
        let mut seen = self.seen.lock().unwrap();
        let n = seen.len();
        seen.push(SeenRequest {
            request: request.clone(),
            hint_content,
        });
        if self.fail_at == Some(n) {
            return Err(StoryError::VideoService("prediction failed".to_string()));
        }
        Ok(format!("https://fake.video/clip-{}", n))
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        let name = url.rsplit('/').next().unwrap_or_default().to_string();
        tokio::fs::write(dest, &name).await?;
        Ok(name.len() as u64)
    }
}

/// Content carried by a `data:image/jpeg;base64,` URI.
pub fn decode_data_uri(uri: &str) -> String {
    let encoded = uri
        .strip_prefix("data:image/jpeg;base64,")
        .expect("not a jpeg data URI");
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .expect("invalid base64");
    String::from_utf8(bytes).unwrap()
}

/// Writes `frame-of:<clip content>`. Clips listed in `empty` have no frames,
/// clips in `failing` make extraction fail, and clips in `vanishing` report a
/// frame that is gone from disk by the time the next scene starts.
#[derive(Default)]
pub struct FakeFrames {
    pub empty: HashSet<String>,
    pub failing: HashSet<String>,
    pub vanishing: HashSet<String>,
}

fn names(clips: &[&str]) -> HashSet<String> {
    clips.iter().map(|c| c.to_string()).collect()
}

impl FakeFrames {
    pub fn with_empty(clips: &[&str]) -> Self {
        Self {
            empty: names(clips),
            ..Default::default()
        }
    }

    pub fn with_failing(clips: &[&str]) -> Self {
        Self {
            failing: names(clips),
            ..Default::default()
        }
    }

    pub fn with_vanishing(clips: &[&str]) -> Self {
        Self {
            vanishing: names(clips),
            ..Default::default()
        }
    }
}

#[async_trait]
impl FrameExtractor for FakeFrames {
    async fn last_frame(&self, clip: &Path, dest: &Path) -> Result<Option<PathBuf>> {
        let content = tokio::fs::read_to_string(clip).await?;
        if self.empty.contains(&content) {
            return Ok(None);
        }
        if self.failing.contains(&content) {
            return Err(StoryError::Probe(format!("last frame capture failed for {}", content)));
        }
        if self.vanishing.contains(&content) {
            return Ok(Some(dest.to_path_buf()));
        }
        tokio::fs::write(dest, format!("frame-of:{}", content)).await?;
        Ok(Some(dest.to_path_buf()))
    }
}

pub struct FakeCompliance;

#[async_trait]
impl ComplianceSink for FakeCompliance {
    async fn record(&self, _scene_index: usize, _request: &ClipRequest) -> ComplianceOutcome {
        ComplianceOutcome::Logged { status: 201 }
    }
}

/// Records clip contents in the order they were handed over.
#[derive(Default)]
pub struct FakeAssembler {
    pub clip_contents: Mutex<Vec<String>>,
    pub workspace: Mutex<Option<PathBuf>>,
}

#[async_trait]
impl Assembler for FakeAssembler {
    async fn assemble(
        &self,
        scenes: &[SceneArtifact],
        narration: &NarrationTrack,
        output_path: &Path,
    ) -> Result<FinalVideo> {
        if !narration.audio_path.exists() {
            return Err(StoryError::Encode("narration missing".to_string()));
        }
        let mut contents = Vec::new();
        for scene in scenes {
            contents.push(tokio::fs::read_to_string(&scene.clip_path).await?);
        }
        *self.clip_contents.lock().unwrap() = contents;
        *self.workspace.lock().unwrap() = scenes
            .first()
            .and_then(|s| s.clip_path.parent())
            .map(Path::to_path_buf);

        tokio::fs::write(output_path, b"mp4").await?;
        Ok(FinalVideo {
            path: output_path.to_path_buf(),
            duration_secs: scenes.len() as f64 * 5.0,
            scene_count: scenes.len(),
        })
    }
}

pub fn settings() -> SceneSettings {
    SceneSettings {
        resolution: "480p".to_string(),
        scene_secs: 5,
        budget_secs: 115,
    }
}

/// Handles onto the fakes wired into a pipeline.
pub struct Fakes {
    pub chat: Arc<FakeChat>,
    pub tts: Arc<FakeTts>,
    pub video: Arc<FakeVideo>,
    pub frames: Arc<FakeFrames>,
    pub assembler: Arc<FakeAssembler>,
}

impl Fakes {
    pub fn new(reply: &str) -> Self {
        Self {
            chat: Arc::new(FakeChat::new(reply)),
            tts: Arc::new(FakeTts::default()),
            video: Arc::new(FakeVideo::default()),
            frames: Arc::new(FakeFrames::default()),
            assembler: Arc::new(FakeAssembler::default()),
        }
    }

    pub fn with_tts(mut self, tts: FakeTts) -> Self {
        self.tts = Arc::new(tts);
        self
    }

    pub fn with_video(mut self, video: FakeVideo) -> Self {
        self.video = Arc::new(video);
        self
    }

    pub fn with_frames(mut self, frames: FakeFrames) -> Self {
        self.frames = Arc::new(frames);
        self
    }

    pub fn pipeline(&self, output_dir: &Path) -> StoryPipeline {
        StoryPipeline::new(PipelineParts {
            chat: self.chat.clone(),
            narrator: self.tts.clone(),
            generator: self.video.clone(),
            frames: self.frames.clone(),
            compliance: Arc::new(FakeCompliance),
            assembler: self.assembler.clone(),
            settings: settings(),
            output_dir: output_dir.to_path_buf(),
        })
    }
}
