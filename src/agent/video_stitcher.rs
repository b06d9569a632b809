// SYNOID Video Stitcher — Scene Concatenation & Narration Overlay
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Joins the scene clips in order and lays the narration over them as the
// only audio stream. Clips may differ in geometry: every clip is fitted
// onto a shared canvas (the largest width and height among them) before
// the concat filter, so no stream-copy is possible and the result is
// re-encoded once with libx264/aac at a fixed frame rate.

use crate::agent::media::{get_video_duration, probe_streams, safe_arg_path};
use crate::agent::story::{FinalVideo, NarrationTrack, SceneArtifact};
use crate::config::StoryConfig;
use crate::error::{Result, StoryError};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{error, info};

#[async_trait]
pub trait Assembler: Send + Sync {
    async fn assemble(
        &self,
        scenes: &[SceneArtifact],
        narration: &NarrationTrack,
        output_path: &Path,
    ) -> Result<FinalVideo>;
}

pub struct VideoStitcher {
    fps: u32,
    max_secs: u32,
}

impl VideoStitcher {
    pub fn new(fps: u32, max_secs: u32) -> Self {
        Self { fps, max_secs }
    }

    pub fn from_config(config: &StoryConfig) -> Self {
        Self::new(config.fps, config.max_video_secs)
    }

    /// Smallest canvas every clip fits on. libx264 needs even dimensions.
    pub fn canvas_size(dimensions: &[(u32, u32)]) -> (u32, u32) {
        let even = |v: u32| if v % 2 == 0 { v } else { v + 1 };
        let width = dimensions.iter().map(|d| d.0).max().unwrap_or(0);
        let height = dimensions.iter().map(|d| d.1).max().unwrap_or(0);
        (even(width.max(2)), even(height.max(2)))
    }

    /// `filter_complex` that fits each input onto the canvas and concatenates
    /// the results in input order into `[outv]`.
    pub fn build_filter_graph(clip_count: usize, canvas: (u32, u32), fps: u32) -> String {
        let (w, h) = canvas;
        let mut graph = String::new();
        for i in 0..clip_count {
            graph.push_str(&format!(
                "[{i}:v]scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps},format=yuv420p[v{i}];"
            ));
        }
        for i in 0..clip_count {
            graph.push_str(&format!("[v{i}]"));
        }
        graph.push_str(&format!("concat=n={clip_count}:v=1:a=0[outv]"));
        graph
    }

    /// Full ffmpeg argument list. The narration is the last input and the
    /// only mapped audio.
    pub fn encode_args(
        clips: &[PathBuf],
        narration: &Path,
        output_path: &Path,
        graph: &str,
        fps: u32,
        limit_secs: f64,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-y".into(), "-v".into(), "error".into()];
        for clip in clips {
            args.push("-i".into());
            args.push(safe_arg_path(clip).into_os_string());
        }
        args.push("-i".into());
        args.push(safe_arg_path(narration).into_os_string());

        let audio_map = format!("{}:a:0", clips.len());
        let fps = fps.to_string();
        let limit = format!("{:.3}", limit_secs);
        for arg in [
            "-filter_complex", graph,
            "-map", "[outv]",
            "-map", audio_map.as_str(),
            "-c:v", "libx264",
            "-c:a", "aac",
            "-pix_fmt", "yuv420p",
            "-movflags", "+faststart",
            "-r", fps.as_str(),
            "-t", limit.as_str(),
        ] {
            args.push(arg.into());
        }
        args.push(safe_arg_path(output_path).into_os_string());
        args
    }
}

#[async_trait]
impl Assembler for VideoStitcher {
    async fn assemble(
        &self,
        scenes: &[SceneArtifact],
        narration: &NarrationTrack,
        output_path: &Path,
    ) -> Result<FinalVideo> {
        if scenes.is_empty() {
            return Err(StoryError::Encode("no scenes to assemble".to_string()));
        }

        let clips: Vec<PathBuf> = scenes.iter().map(|s| s.clip_path.clone()).collect();

        let mut dimensions = Vec::with_capacity(clips.len());
        let mut video_secs = 0.0;
        for clip in &clips {
            let info = probe_streams(clip).await?;
            if !info.has_video {
                return Err(StoryError::Encode(format!("{:?} has no video stream", clip)));
            }
            dimensions.push((info.width, info.height));
            video_secs += info.duration.unwrap_or(0.0);
        }

        let canvas = Self::canvas_size(&dimensions);
        let graph = Self::build_filter_graph(clips.len(), canvas, self.fps);
        // The video track decides the length, capped at the configured maximum.
        let limit_secs = if video_secs > 0.0 {
            video_secs.min(self.max_secs as f64)
        } else {
            self.max_secs as f64
        };

        info!(
            "[STITCHER] Joining {} scenes on a {}x{} canvas at {} fps ({:.1}s) -> {:?}",
            clips.len(),
            canvas.0,
            canvas.1,
            self.fps,
            limit_secs,
            output_path
        );

        let args = Self::encode_args(&clips, &narration.audio_path, output_path, &graph, self.fps, limit_secs);
        let output = Command::new("ffmpeg").kill_on_drop(true).args(&args).output().await?;

        if !output.status.success() {
            let _ = tokio::fs::remove_file(output_path).await;
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(20).collect();
            error!("[STITCHER] ❌ FFmpeg encode failed.");
            return Err(StoryError::Encode(
                tail.into_iter().rev().collect::<Vec<_>>().join("\n"),
            ));
        }

        let duration_secs = get_video_duration(output_path).await?;
        info!("[STITCHER] ✅ Final output: {:?} ({:.2}s)", output_path, duration_secs);

        Ok(FinalVideo {
            path: output_path.to_path_buf(),
            duration_secs,
            scene_count: scenes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_size() {
        assert_eq!(VideoStitcher::canvas_size(&[(854, 480), (640, 480), (480, 854)]), (854, 854));
        assert_eq!(VideoStitcher::canvas_size(&[(853, 479)]), (854, 480));
        assert_eq!(VideoStitcher::canvas_size(&[]), (2, 2));
    }

    #[test]
    fn test_filter_graph_keeps_order() {
        let graph = VideoStitcher::build_filter_graph(3, (854, 480), 24);
        assert!(graph.starts_with("[0:v]scale=854:480:force_original_aspect_ratio=decrease,pad=854:480"));
        assert!(graph.contains("fps=24"));
        assert!(graph.ends_with("[v0][v1][v2]concat=n=3:v=1:a=0[outv]"));
        let first = graph.find("[0:v]").unwrap();
        let second = graph.find("[1:v]").unwrap();
        let third = graph.find("[2:v]").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn test_encode_args() {
        let clips = vec![PathBuf::from("/w/scene_001.mp4"), PathBuf::from("/w/scene_002.mp4")];
        let args = VideoStitcher::encode_args(
            &clips,
            Path::new("/w/narration.mp3"),
            Path::new("/out/story.mp4"),
            "GRAPH",
            24,
            10.0,
        );
        let args: Vec<String> = args.into_iter().map(|a| a.to_string_lossy().into_owned()).collect();

        let joined = args.join(" ");
        assert!(joined.contains("-i /w/scene_001.mp4 -i /w/scene_002.mp4 -i /w/narration.mp3"));
        assert!(joined.contains("-filter_complex GRAPH"));
        assert!(joined.contains("-map [outv] -map 2:a:0"));
        assert!(joined.contains("-c:v libx264 -c:a aac"));
        assert!(joined.contains("-r 24 -t 10.000"));
        assert_eq!(args.last().unwrap(), "/out/story.mp4");
    }
}
