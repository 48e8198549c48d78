//! Multi-root resource path resolution

use std::path::{Path, PathBuf};

use tracing::debug;

/// Ordered set of directories searched when resolving a relative
/// resource path (fonts, images).
///
/// The most recently registered root wins. A path found under no root
/// is returned unchanged so downstream consumers can apply their own
/// defaulting.
#[derive(Debug, Clone)]
pub struct RootResolver {
    roots: Vec<PathBuf>,
}

impl RootResolver {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            roots: vec![base.into()],
        }
    }

    /// Append an application root. Later roots shadow earlier ones.
    pub fn register(&mut self, root: impl Into<PathBuf>) {
        self.roots.push(root.into());
    }

    /// Roots in search order.
    pub fn roots(&self) -> impl Iterator<Item = &Path> {
        self.roots.iter().rev().map(PathBuf::as_path)
    }

    /// Resolve a relative path to the first root where it exists.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        let relative = relative.as_ref();
        for root in self.roots.iter().rev() {
            let candidate = root.join(relative);
            if candidate.exists() {
                debug!(
                    "Resolved {} under {}",
                    relative.display(),
                    root.display()
                );
                return candidate;
            }
        }
        relative.to_path_buf()
    }
}
