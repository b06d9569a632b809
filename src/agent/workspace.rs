// SYNOID Run Workspace
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Scratch directory for one run. Clips, continuity frames and other
// intermediates live here and are removed when the workspace is dropped,
// whichever way the run ends.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

pub struct RunWorkspace {
    dir: TempDir,
}

impl RunWorkspace {
    /// Create a fresh workspace under the system temp directory.
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("synoid-story-").tempdir()?;
        debug!("[WORKSPACE] Created {:?}", dir.path());
        Ok(Self { dir })
    }

    /// Create a fresh workspace under `parent`.
    pub fn create_in(parent: &Path) -> Result<Self> {
        std::fs::create_dir_all(parent)?;
        let dir = tempfile::Builder::new().prefix("synoid-story-").tempdir_in(parent)?;
        debug!("[WORKSPACE] Created {:?}", dir.path());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}
