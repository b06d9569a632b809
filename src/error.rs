// SYNOID Story Errors
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use thiserror::Error;

/// Startup configuration problems. These halt the process before any run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Anything that goes wrong after a story request was submitted.
#[derive(Error, Debug)]
pub enum StoryError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("empty script: {0}")]
    EmptyScript(String),

    #[error("video service error: {0}")]
    VideoService(String),

    #[error("encode failed: {0}")]
    Encode(String),

    #[error("probe failed: {0}")]
    Probe(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoryError>;
