// SYNOID Agent Modules
// Copyright (c) 2026 Xing_The_Creator | SYNOID

pub mod chat_bridge;
pub mod compliance;
pub mod media;
pub mod presenter;
pub mod replicate;
pub mod scene_producer;
pub mod script_writer;
pub mod story;
pub mod voice;
pub mod workspace;

pub mod video_stitcher;

pub mod core; // Exposed Core Logic
