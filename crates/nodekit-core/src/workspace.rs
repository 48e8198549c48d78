//! Per-node on-disk workspace

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::NodeError;

/// Cache, database and temporary directories for a node process.
///
/// The cache directory persists across runs; the temp directory lives
/// for the process lifetime and is removed when the workspace drops.
pub struct NodeWorkspace {
    appname: String,
    cache_dir: PathBuf,
    temp_dir: TempDir,
}

impl NodeWorkspace {
    /// Workspace under the platform user cache directory.
    pub fn create(appname: &str) -> Result<Self, NodeError> {
        let cache_dir = dirs::cache_dir().ok_or(NodeError::NoCacheDir)?.join(appname);
        Self::create_at(appname, cache_dir)
    }

    /// Workspace rooted at an explicit cache directory.
    pub fn create_at(appname: &str, cache_dir: impl Into<PathBuf>) -> Result<Self, NodeError> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;
        let temp_dir = TempDir::new()?;
        debug!("Node workspace at {}", cache_dir.display());
        Ok(Self {
            appname: appname.to_string(),
            cache_dir,
            temp_dir,
        })
    }

    pub fn appname(&self) -> &str {
        &self.appname
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Database directory under the cache, created on demand.
    pub fn db_dir(&self) -> Result<PathBuf, NodeError> {
        let dir = self.cache_dir.join("db");
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Scratch space removed when the workspace drops.
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }
}
