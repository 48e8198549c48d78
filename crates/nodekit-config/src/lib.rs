//! Modular configuration registry for nodekit
//!
//! Independently developed node modules (networking, display, caching,
//! identity) declare typed, persisted configuration elements at start-up
//! without a central schema file. Values live in a section/key store
//! persisted to `config.ini` in the platform user-configuration
//! directory; relative resource paths resolve against an ordered set of
//! application roots.
//!
//! # Example
//!
//! ```no_run
//! use nodekit_config::{ConfigRegistry, ElementSpec, ItemSpec, ValueKind};
//!
//! fn main() -> Result<(), nodekit_config::ConfigError> {
//!     let mut config = ConfigRegistry::open("mynode")?;
//!     config.register_element(
//!         "poll_interval",
//!         ElementSpec::stored(
//!             "network",
//!             "poll_interval",
//!             ItemSpec::new(ValueKind::Int).with_fallback(30i64).writable(),
//!         ),
//!     );
//!     let interval = config.get("poll_interval")?;
//!     println!("polling every {interval}s");
//!     Ok(())
//! }
//! ```

mod element;
mod provider;
mod registry;
mod roots;
mod store;

pub use element::{DerivedFn, ElementSpec, Fallback, ItemSpec, Value, ValueKind};
pub use provider::{ConfigProvider, SharedConfig};
pub use registry::{ColorSpec, ConfigRegistry, DISPLAY_LAYER_ENV, PLATFORM_RPI};
pub use roots::RootResolver;
pub use store::PersistedStore;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown config element: {0}")]
    UnknownElement(String),

    #[error("config element '{0}' is read only")]
    ReadOnly(String),

    #[error("config element '{element}' has no stored value for [{section}] {key} and no fallback")]
    MissingRequired {
        element: String,
        section: String,
        key: String,
    },

    #[error("cannot parse {value:?} as {kind} for {target}")]
    TypeCoercion {
        target: String,
        kind: ValueKind,
        value: String,
    },

    #[error("derived element cycle through '{0}'")]
    DerivedCycle(String),

    #[error("config store I/O error: {0}")]
    Persistence(#[from] std::io::Error),
}

/// Version of the configuration core.
pub fn core_version() -> semver::Version {
    semver::Version::parse(env!("CARGO_PKG_VERSION")).expect("crate version is valid semver")
}
