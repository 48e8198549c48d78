//! Node runtime scaffolding for nodekit
//!
//! Provides the on-disk workspace every node process gets (cache,
//! database and temporary directories) and the base node lifecycle
//! that host applications build on. Configuration flows through the
//! shared registry handle from `nodekit-config`.

mod node;
mod workspace;

pub use node::BaseNode;
pub use workspace::NodeWorkspace;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("no user cache directory available")]
    NoCacheDir,

    #[error("config error: {0}")]
    Config(#[from] nodekit_config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
