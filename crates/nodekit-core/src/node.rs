//! Base node lifecycle

use nodekit_config::{ConfigProvider, SharedConfig};
use tracing::info;

use crate::{NodeError, NodeWorkspace};

/// Minimal node every host application builds on.
///
/// Holds the shared configuration handle and the on-disk workspace.
/// The host framework drives `install`/`start`/`stop` from its own
/// control loop.
pub struct BaseNode {
    config: SharedConfig,
    workspace: NodeWorkspace,
}

impl BaseNode {
    pub fn new(config: SharedConfig, workspace: NodeWorkspace) -> Self {
        Self { config, workspace }
    }

    pub fn workspace(&self) -> &NodeWorkspace {
        &self.workspace
    }

    /// Configured node identity override, if any.
    pub fn id(&self) -> Option<String> {
        self.config.with(|config| config.node_id_override().ok().flatten())
    }

    pub fn install(&self) -> Result<(), NodeError> {
        info!("Installing node {}", self.display_id());
        Ok(())
    }

    pub fn start(&self) -> Result<(), NodeError> {
        info!("Starting node {}", self.display_id());
        Ok(())
    }

    pub fn stop(&self) -> Result<(), NodeError> {
        info!("Stopping node {}", self.display_id());
        Ok(())
    }

    fn display_id(&self) -> String {
        self.id()
            .unwrap_or_else(|| self.workspace.appname().to_string())
    }
}

impl ConfigProvider for BaseNode {
    fn config(&self) -> &SharedConfig {
        &self.config
    }
}
