//! Nodekit bootstrap
//!
//! Brings up a bare node: logging, the configuration registry,
//! application resource roots, then the base lifecycle. Host
//! applications replace this binary with their own entry point and
//! drive the node from their framework's control loop.

use anyhow::Result;
use tracing::info;

use nodekit_config::{ConfigProvider, ConfigRegistry, SharedConfig};
use nodekit_core::{BaseNode, NodeWorkspace};

const APPNAME: &str = "nodekit";

fn main() -> Result<()> {
    setup_logging();

    let mut registry = ConfigRegistry::open(APPNAME)?;

    // Resources shipped alongside the binary shadow the built-in root.
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.to_path_buf()))
    {
        registry.register_application_root(exe_dir.join("resources"));
    }

    let config = SharedConfig::new(registry);
    let workspace = NodeWorkspace::create(APPNAME)?;
    let node = BaseNode::new(config, workspace);

    node.install()?;
    node.start()?;
    node.config().with(|config| config.log_elements());
    node.stop()?;

    info!("Node shut down");
    Ok(())
}

/// Setup logging to the console
fn setup_logging() {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}
