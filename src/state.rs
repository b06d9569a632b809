// SYNOID Kernel State
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::agent::core::StoryPipeline;
use crate::agent::presenter::{PipelineEvent, Presenter};
use crate::agent::story::StoryRequest;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    Running,
    Finished,
    Failed,
}

/// Finished and failed runs kept for the dashboard before the oldest is dropped.
pub const DEFAULT_RETAINED_RUNS: usize = 50;

/// Everything the dashboard knows about one submitted story.
#[derive(Debug, Clone, Serialize)]
pub struct RunState {
    pub id: String,
    pub status: RunStatus,
    pub request: StoryRequest,
    pub script: Option<String>,
    pub scenes_ready: usize,
    pub logs: Vec<String>,
    pub events: Vec<PipelineEvent>,
    pub narration_path: Option<PathBuf>,
    pub video_path: Option<PathBuf>,
    pub error: Option<String>,
}

impl RunState {
    pub fn new(id: &str, request: StoryRequest) -> Self {
        Self {
            id: id.to_string(),
            status: RunStatus::Queued,
            request,
            script: None,
            scenes_ready: 0,
            logs: vec![format!("[SYSTEM] Run {} queued.", id)],
            events: Vec::new(),
            narration_path: None,
            video_path: None,
            error: None,
        }
    }

    /// Fold one pipeline event into the run record.
    pub fn apply(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::ScriptReady { script } => {
                self.status = RunStatus::Running;
                self.script = Some(script.raw.clone());
                self.logs.push(format!(
                    "[SCRIPT] Story and {} visual prompts generated.",
                    script.scene_prompts.len()
                ));
            }
            PipelineEvent::NarrationReady { narration } => {
                self.narration_path = Some(narration.audio_path.clone());
                self.logs.push("[TTS] Narration ready.".to_string());
            }
            PipelineEvent::SceneStarted { index, .. } => {
                self.logs.push(format!("[SCENE] Generating Scene {}...", index + 1));
            }
            PipelineEvent::ContinuityDropped { index, reason } => {
                self.logs.push(format!(
                    "[SCENE] Scene {} has no continuity frame: {}",
                    index + 1,
                    reason
                ));
            }
            PipelineEvent::SceneReady { scene } => {
                self.scenes_ready += 1;
                self.logs.push(format!("[SCENE] Scene {} ready!", scene.index + 1));
            }
            PipelineEvent::BudgetReached { produced, skipped } => {
                self.logs.push(format!(
                    "[SCENE] Duration limit reached after {} scenes, {} skipped.",
                    produced, skipped
                ));
            }
            PipelineEvent::FinalReady { video } => {
                self.status = RunStatus::Finished;
                self.video_path = Some(video.path.clone());
                self.logs.push(format!("[STITCHER] Final video ready ({:.1}s).", video.duration_secs));
            }
            PipelineEvent::Failed { message } => {
                self.status = RunStatus::Failed;
                self.error = Some(message.clone());
                self.logs.push(format!("[SYSTEM] ❌ {}", message));
            }
        }
        self.events.push(event.clone());
    }

    pub fn is_done(&self) -> bool {
        matches!(self.status, RunStatus::Finished | RunStatus::Failed)
    }
}

/// Runs in submission order. Queued and running entries are never evicted.
#[derive(Debug, Default)]
pub struct RunRegistry {
    runs: HashMap<String, RunState>,
    order: VecDeque<String>,
}

impl RunRegistry {
    fn insert(&mut self, run: RunState) {
        let id = run.id.clone();
        if self.runs.insert(id.clone(), run).is_none() {
            self.order.push_back(id);
        }
    }

    /// Drop the oldest finished or failed runs beyond `retained`.
    fn prune(&mut self, retained: usize) {
        let Self { runs, order } = self;
        let done = runs.values().filter(|r| r.is_done()).count();
        let mut excess = done.saturating_sub(retained);
        if excess == 0 {
            return;
        }
        order.retain(|id| {
            if excess > 0 && runs.get(id).is_some_and(RunState::is_done) {
                runs.remove(id);
                excess -= 1;
                false
            } else {
                true
            }
        });
    }
}

pub struct KernelState {
    runs: Mutex<RunRegistry>,
    retained: usize,
    pub pipeline: Arc<StoryPipeline>,
    /// When set, every `/api` route requires this key.
    pub api_key: Option<String>,
}

impl KernelState {
    pub fn new(pipeline: Arc<StoryPipeline>, api_key: Option<String>) -> Self {
        Self {
            runs: Mutex::new(RunRegistry::default()),
            retained: DEFAULT_RETAINED_RUNS,
            pipeline,
            api_key,
        }
    }

    pub fn with_retention(mut self, retained: usize) -> Self {
        self.retained = retained;
        self
    }

    fn lock_runs(&self) -> MutexGuard<'_, RunRegistry> {
        // A panicked run must not take the dashboard down with it.
        self.runs.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn register(&self, id: &str, request: StoryRequest) {
        let mut runs = self.lock_runs();
        runs.insert(RunState::new(id, request));
        runs.prune(self.retained);
    }

    pub fn snapshot(&self, id: &str) -> Option<RunState> {
        self.lock_runs().runs.get(id).cloned()
    }

    pub fn record(&self, id: &str, event: &PipelineEvent) {
        let mut runs = self.lock_runs();
        let Some(run) = runs.runs.get_mut(id) else {
            return;
        };
        run.apply(event);
        if run.is_done() {
            debug!("[SERVER] Run {} settled as {:?}", id, run.status);
            runs.prune(self.retained);
        }
    }

    pub fn active_runs(&self) -> usize {
        self.lock_runs()
            .runs
            .values()
            .filter(|r| matches!(r.status, RunStatus::Queued | RunStatus::Running))
            .count()
    }
}

/// Presenter that writes a run's events into the shared registry.
pub struct RunRecorder {
    state: Arc<KernelState>,
    run_id: String,
}

impl RunRecorder {
    pub fn new(state: Arc<KernelState>, run_id: &str) -> Self {
        Self {
            state,
            run_id: run_id.to_string(),
        }
    }
}

impl Presenter for RunRecorder {
    fn on_event(&self, event: &PipelineEvent) {
        self.state.record(&self.run_id, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::story::{FinalVideo, NarrationTrack, Tone};

    fn run() -> RunState {
        RunState::new("abc", StoryRequest::new("Horror", "A lighthouse keeper", Tone::Dramatic))
    }

    #[test]
    fn test_run_reaches_finished() {
        let mut state = run();
        assert_eq!(state.status, RunStatus::Queued);

        state.apply(&PipelineEvent::NarrationReady {
            narration: NarrationTrack {
                audio_path: PathBuf::from("output/abc/narration.mp3"),
            },
        });
        state.apply(&PipelineEvent::FinalReady {
            video: FinalVideo {
                path: PathBuf::from("output/abc/story.mp4"),
                duration_secs: 20.0,
                scene_count: 4,
            },
        });

        assert_eq!(state.status, RunStatus::Finished);
        assert_eq!(state.narration_path, Some(PathBuf::from("output/abc/narration.mp3")));
        assert_eq!(state.video_path, Some(PathBuf::from("output/abc/story.mp4")));
        assert_eq!(state.events.len(), 2);
    }

    fn settle(registry: &mut RunRegistry, id: &str, status: RunStatus) {
        if let Some(run) = registry.runs.get_mut(id) {
            run.status = status;
        }
    }

    #[test]
    fn test_registry_drops_oldest_settled_runs() {
        let mut registry = RunRegistry::default();
        for id in ["r1", "r2", "r3", "r4", "r5"] {
            registry.insert(RunState::new(id, run().request));
        }
        settle(&mut registry, "r1", RunStatus::Running);
        settle(&mut registry, "r2", RunStatus::Finished);
        settle(&mut registry, "r3", RunStatus::Failed);
        settle(&mut registry, "r4", RunStatus::Finished);

        registry.prune(2);

        assert!(registry.runs.contains_key("r1"), "running run was evicted");
        assert!(!registry.runs.contains_key("r2"));
        assert!(registry.runs.contains_key("r3"));
        assert!(registry.runs.contains_key("r4"));
        assert!(registry.runs.contains_key("r5"), "queued run was evicted");
        assert_eq!(registry.order, ["r1", "r3", "r4", "r5"]);
    }

    #[test]
    fn test_registry_keeps_unsettled_runs_past_retention() {
        let mut registry = RunRegistry::default();
        for id in ["a", "b", "c"] {
            registry.insert(RunState::new(id, run().request));
        }
        registry.prune(0);
        assert_eq!(registry.runs.len(), 3);

        settle(&mut registry, "b", RunStatus::Failed);
        registry.prune(0);
        assert_eq!(registry.order, ["a", "c"]);
    }

    #[test]
    fn test_run_records_failure() {
        let mut state = run();
        state.apply(&PipelineEvent::Failed {
            message: "empty script: no narration".to_string(),
        });
        assert_eq!(state.status, RunStatus::Failed);
        assert_eq!(state.error.as_deref(), Some("empty script: no narration"));
        assert!(state.logs.last().unwrap().contains("empty script"));
    }
}
