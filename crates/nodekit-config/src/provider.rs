//! Shared registry handle and consumer capability
//!
//! Exactly one registry is expected per process. Consumers hold a
//! clone of [`SharedConfig`] (constructor injection) instead of
//! reaching for a global, and expose it through the narrow
//! [`ConfigProvider`] capability.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::element::{ElementSpec, Value};
use crate::registry::ConfigRegistry;
use crate::ConfigError;

/// Cheaply clonable handle to the process-wide configuration registry.
#[derive(Clone)]
pub struct SharedConfig {
    inner: Arc<Mutex<ConfigRegistry>>,
}

impl SharedConfig {
    pub fn new(registry: ConfigRegistry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    /// Run `f` against the registry.
    pub fn with<R>(&self, f: impl FnOnce(&ConfigRegistry) -> R) -> R {
        f(&self.inner.lock().unwrap())
    }

    /// Run `f` against the registry with write access.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut ConfigRegistry) -> R) -> R {
        f(&mut self.inner.lock().unwrap())
    }

    pub fn get(&self, name: &str) -> Result<Value, ConfigError> {
        self.with(|config| config.get(name))
    }

    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), ConfigError> {
        let value = value.into();
        self.with_mut(|config| config.set(name, value))
    }

    pub fn register_element(&self, name: &str, spec: ElementSpec) {
        self.with_mut(|config| config.register_element(name, spec));
    }

    pub fn register_application_root(&self, root: impl Into<PathBuf>) {
        let root = root.into();
        self.with_mut(|config| config.register_application_root(root));
    }

    pub fn resolve_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.with(|config| config.resolve_path(relative))
    }
}

/// Capability held by any component that needs configuration access.
/// Implementors keep a [`SharedConfig`] field; the provided methods
/// cover the common cases.
pub trait ConfigProvider {
    fn config(&self) -> &SharedConfig;

    fn config_register_element(&self, name: &str, spec: ElementSpec) {
        self.config().register_element(name, spec);
    }

    fn config_get(&self, name: &str) -> Result<Value, ConfigError> {
        self.config().get(name)
    }

    fn config_set(&self, name: &str, value: Value) -> Result<(), ConfigError> {
        self.config().set(name, value)
    }
}
