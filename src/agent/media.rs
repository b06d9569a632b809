// SYNOID Media Tools - Probing & Frame Capture
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// ffprobe/ffmpeg wrappers used by the scene loop and the assembler:
// 1. Stream probing (geometry, frame rate, audio/video presence)
// 2. Duration and decodable frame counts
// 3. Last-frame capture for scene continuity
// 4. Data URIs for inlining frames into JSON requests

use crate::agent::scene_producer::FrameExtractor;
use crate::error::{Result, StoryError};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);
const FRAME_TIMEOUT: Duration = Duration::from_secs(60);

/// Summary of the streams inside a media file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub fps: Option<f64>,
    pub has_video: bool,
    pub has_audio: bool,
    pub duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_read_frames: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Paths starting with '-' would be read as flags by ffmpeg.
pub fn safe_arg_path(path: &Path) -> PathBuf {
    if path.to_string_lossy().starts_with('-') {
        Path::new(".").join(path)
    } else {
        path.to_path_buf()
    }
}

/// Parse an ffprobe rational such as `24/1` or `30000/1001`.
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let (num, den) = match raw.split_once('/') {
        Some((n, d)) => (n.trim().parse::<f64>().ok()?, d.trim().parse::<f64>().ok()?),
        None => (raw.trim().parse::<f64>().ok()?, 1.0),
    };
    if den == 0.0 || num == 0.0 {
        return None;
    }
    Some(num / den)
}

/// Check whether a binary responds to `-version`.
pub async fn tool_available(bin: &str) -> bool {
    Command::new(bin)
        .arg("-version")
        .kill_on_drop(true)
        .output()
        .await
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Returns the names of required media tools that are not on PATH.
pub async fn check_dependencies() -> Vec<&'static str> {
    let mut missing = Vec::new();
    for bin in ["ffmpeg", "ffprobe"] {
        if !tool_available(bin).await {
            missing.push(bin);
        }
    }
    missing
}

/// Run a media tool to completion. The child is killed once `limit` passes.
async fn run_timed(command: &mut Command, limit: Duration, what: &str) -> Result<std::process::Output> {
    tokio::time::timeout(limit, command.kill_on_drop(true).output())
        .await
        .map_err(|_| StoryError::Probe(format!("{} timed out after {:?}", what, limit)))?
        .map_err(StoryError::from)
}

async fn run_probe(args: &[&str], path: &Path) -> Result<ProbeOutput> {
    let mut command = Command::new("ffprobe");
    command
        .args(["-v", "error", "-of", "json"])
        .args(args)
        .arg(safe_arg_path(path));
    let output = run_timed(&mut command, PROBE_TIMEOUT, &format!("ffprobe on {:?}", path)).await?;

    if !output.status.success() {
        return Err(StoryError::Probe(format!(
            "ffprobe failed on {:?}: {}",
            path,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(serde_json::from_slice(&output.stdout)?)
}

pub async fn probe_streams(path: &Path) -> Result<StreamInfo> {
    let probe = run_probe(&["-show_streams", "-show_format"], path).await?;

    let mut info = StreamInfo {
        duration: probe
            .format
            .and_then(|f| f.duration)
            .and_then(|d| d.trim().parse().ok()),
        ..Default::default()
    };

    for stream in probe.streams {
        match stream.codec_type.as_deref() {
            Some("video") if !info.has_video => {
                info.has_video = true;
                info.width = stream.width.unwrap_or(0);
                info.height = stream.height.unwrap_or(0);
                info.fps = stream
                    .avg_frame_rate
                    .as_deref()
                    .and_then(parse_frame_rate)
                    .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_frame_rate));
            }
            Some("audio") => info.has_audio = true,
            _ => {}
        }
    }

    Ok(info)
}

pub async fn get_video_duration(path: &Path) -> Result<f64> {
    probe_streams(path)
        .await?
        .duration
        .ok_or_else(|| StoryError::Probe(format!("no duration reported for {:?}", path)))
}

/// Number of frames ffprobe can actually decode from the first video stream.
pub async fn count_frames(path: &Path) -> Result<u64> {
    let probe = run_probe(
        &["-select_streams", "v:0", "-count_frames", "-show_entries", "stream=nb_read_frames"],
        path,
    )
    .await?;

    Ok(probe
        .streams
        .first()
        .and_then(|s| s.nb_read_frames.as_deref())
        .and_then(|n| n.trim().parse().ok())
        .unwrap_or(0))
}

pub async fn image_data_uri(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(format!(
        "data:image/jpeg;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    ))
}

/// Captures the final decodable frame of a clip with ffmpeg.
pub struct FfmpegFrameGrabber;

#[async_trait]
impl FrameExtractor for FfmpegFrameGrabber {
    async fn last_frame(&self, clip: &Path, dest: &Path) -> Result<Option<PathBuf>> {
        let total = count_frames(clip).await?;
        if total == 0 {
            warn!("[EYES] {:?} has no decodable frames", clip);
            return Ok(None);
        }

        let last = total - 1;
        debug!("[EYES] Seeking to frame {} of {:?}", last, clip);

        let mut command = Command::new("ffmpeg");
        command
            .args(["-y", "-v", "error", "-i"])
            .arg(safe_arg_path(clip))
            .args(["-vf", &format!("select=eq(n\\,{})", last), "-vsync", "0", "-frames:v", "1", "-q:v", "2"])
            .arg(safe_arg_path(dest));
        let output = run_timed(&mut command, FRAME_TIMEOUT, &format!("last frame capture on {:?}", clip)).await?;

        if !output.status.success() || !dest.exists() {
            return Err(StoryError::Probe(format!(
                "last frame capture failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // Reject anything the image decoder cannot read
        let (w, h) = image::image_dimensions(dest)
            .map_err(|e| StoryError::Probe(format!("captured frame is not decodable: {}", e)))?;

        info!("[EYES] Captured continuity frame {}x{} -> {:?}", w, h, dest);
        Ok(Some(dest.to_path_buf()))
    }
}
