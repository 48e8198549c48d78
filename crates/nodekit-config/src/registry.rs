//! The modular configuration registry
//!
//! One registry exists per process. Modules register named, typed
//! elements during single-threaded start-up and read or write them
//! through dynamic dispatch; every write rewrites the persisted store
//! inline on the calling thread. A long tail of legacy accessors
//! predates the element mechanism and reads the store directly with
//! inline fallbacks, following the same persistence rules.

use std::cell::RefCell;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::element::{ElementSpec, Fallback, ItemSpec, Value, ValueKind};
use crate::roots::RootResolver;
use crate::store::PersistedStore;
use crate::ConfigError;

/// Platform tag for Raspberry Pi class hardware.
pub const PLATFORM_RPI: &str = "rpi";

/// Environment variable the display shell reads for the application
/// dispmanx layer. Set once at start-up, never overwritten.
pub const DISPLAY_LAYER_ENV: &str = "NODEKIT_DISPMANX_LAYER";

pub struct ConfigRegistry {
    appname: String,
    elements: HashMap<String, ElementSpec>,
    store: PersistedStore,
    roots: RootResolver,
    // Derived elements currently being evaluated, for cycle detection.
    evaluating: RefCell<Vec<String>>,
}

impl ConfigRegistry {
    /// Open the registry for `appname`, reading `config.ini` from the
    /// platform user-configuration directory. The current directory is
    /// the base resource root.
    pub fn open(appname: &str) -> Result<Self, ConfigError> {
        let file = default_config_file(appname)?;
        let base = env::current_dir()?;
        Self::open_at(appname, file, base)
    }

    /// Open against an explicit config file and base resource root.
    pub fn open_at(
        appname: &str,
        file: impl Into<PathBuf>,
        base_root: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let file = file.into();
        info!("Reading config file {}", file.display());
        let store = PersistedStore::load(file)?;

        let mut registry = Self {
            appname: appname.to_string(),
            elements: HashMap::new(),
            store,
            roots: RootResolver::new(base_root),
            evaluating: RefCell::new(Vec::new()),
        };
        registry.register_builtins();
        info!("nodekit config core, version {}", crate::core_version());
        registry.apply_display_layer()?;
        Ok(registry)
    }

    pub fn appname(&self) -> &str {
        &self.appname
    }

    /// Path of the backing store file.
    pub fn config_file(&self) -> &Path {
        self.store.path()
    }

    fn register_builtins(&mut self) {
        self.register_element(
            "platform",
            ElementSpec::stored(
                "platform",
                "platform",
                ItemSpec::new(ValueKind::Str).with_fallback("native"),
            ),
        );
        self.register_element(
            "debug",
            ElementSpec::stored(
                "debug",
                "debug",
                ItemSpec::new(ValueKind::Bool).with_fallback(false),
            ),
        );
    }

    // Modular element infrastructure

    /// Register or replace a named element. The last registration for a
    /// name wins; duplicate section/key pairs under different names are
    /// allowed and read the same slot. Start-up only, before any reads.
    pub fn register_element(&mut self, name: &str, spec: ElementSpec) {
        if self.elements.insert(name.to_string(), spec).is_some() {
            debug!("Config element '{}' re-registered", name);
        }
    }

    /// Typed read of a registered element.
    pub fn get(&self, name: &str) -> Result<Value, ConfigError> {
        let spec = self
            .elements
            .get(name)
            .ok_or_else(|| ConfigError::UnknownElement(name.to_string()))?;
        match spec {
            ElementSpec::Derived(f) => {
                if self.evaluating.borrow().iter().any(|n| n == name) {
                    return Err(ConfigError::DerivedCycle(name.to_string()));
                }
                self.evaluating.borrow_mut().push(name.to_string());
                let result = f(self);
                self.evaluating.borrow_mut().pop();
                result
            }
            ElementSpec::Stored { section, key, item } => {
                match self.store.read(section, key, item.kind) {
                    Ok(Some(value)) => Ok(value),
                    Ok(None) => match &item.fallback {
                        Fallback::Value(value) => Ok(value.clone()),
                        Fallback::Required => Err(ConfigError::MissingRequired {
                            element: name.to_string(),
                            section: section.clone(),
                            key: key.clone(),
                        }),
                    },
                    Err(ConfigError::TypeCoercion { kind, value, .. }) => {
                        Err(ConfigError::TypeCoercion {
                            target: name.to_string(),
                            kind,
                            value,
                        })
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Typed write of a registered element. The value variant must
    /// match the declared kind; booleans persist as their canonical
    /// yes/no encoding. The whole store file is rewritten before this
    /// returns.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ConfigError> {
        let value = value.into();
        let spec = self
            .elements
            .get(name)
            .ok_or_else(|| ConfigError::UnknownElement(name.to_string()))?;
        let ElementSpec::Stored { section, key, item } = spec else {
            return Err(ConfigError::ReadOnly(name.to_string()));
        };
        if item.read_only {
            return Err(ConfigError::ReadOnly(name.to_string()));
        }
        if value.kind() != item.kind {
            return Err(ConfigError::TypeCoercion {
                target: name.to_string(),
                kind: item.kind,
                value: value.to_string(),
            });
        }
        self.store.set(section, key, &value.to_string())
    }

    // Paths

    /// Append an application resource root. Later roots shadow earlier
    /// ones.
    pub fn register_application_root(&mut self, root: impl Into<PathBuf>) {
        self.roots.register(root);
    }

    /// Resolve a relative resource path against the registered roots.
    /// An unresolved path is returned unchanged.
    pub fn resolve_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.roots.resolve(relative)
    }

    pub fn roots(&self) -> &RootResolver {
        &self.roots
    }

    /// Log every registered element with its current value.
    pub fn log_elements(&self) {
        let mut names: Vec<&String> = self.elements.keys().collect();
        names.sort();
        info!("Node configuration ({})", self.appname);
        for name in names {
            match self.get(name) {
                Ok(value) => info!("  {:>24}: {}", name, value),
                Err(e) => info!("  {:>24}: <{}>", name, e),
            }
        }
    }

    // Typed direct reads backing the legacy accessors.

    fn read_str(&self, section: &str, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(self
            .store
            .read(section, key, ValueKind::Str)?
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    fn read_bool(&self, section: &str, key: &str) -> Result<Option<bool>, ConfigError> {
        Ok(self
            .store
            .read(section, key, ValueKind::Bool)?
            .and_then(|v| v.as_bool()))
    }

    fn read_int(&self, section: &str, key: &str) -> Result<Option<i64>, ConfigError> {
        Ok(self
            .store
            .read(section, key, ValueKind::Int)?
            .and_then(|v| v.as_int()))
    }

    fn read_float(&self, section: &str, key: &str) -> Result<Option<f64>, ConfigError> {
        Ok(self
            .store
            .read(section, key, ValueKind::Float)?
            .and_then(|v| v.as_float()))
    }

    // Built-ins

    /// Platform tag this node runs on.
    pub fn platform(&self) -> String {
        self.get("platform")
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "native".to_string())
    }

    pub fn debug_enabled(&self) -> bool {
        self.get("debug")
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    fn is_rpi(&self) -> bool {
        self.platform() == PLATFORM_RPI
    }

    // Legacy accessors: display

    pub fn fullscreen(&self) -> Result<bool, ConfigError> {
        Ok(self.read_bool("display", "fullscreen")?.unwrap_or(true))
    }

    pub fn portrait(&self) -> Result<bool, ConfigError> {
        Ok(self.read_bool("display", "portrait")?.unwrap_or(false))
    }

    pub fn set_portrait(&mut self, value: bool) -> Result<(), ConfigError> {
        self.store
            .set("display", "portrait", if value { "yes" } else { "no" })
    }

    pub fn flip(&self) -> Result<bool, ConfigError> {
        Ok(self.read_bool("display", "flip")?.unwrap_or(false))
    }

    pub fn set_flip(&mut self, value: bool) -> Result<(), ConfigError> {
        self.store
            .set("display", "flip", if value { "yes" } else { "no" })
    }

    /// Display rotation in degrees: portrait adds 90, flip adds 180.
    pub fn orientation(&self) -> Result<u32, ConfigError> {
        let mut degrees = 0;
        if self.portrait()? {
            degrees += 90;
        }
        if self.flip()? {
            degrees += 180;
        }
        Ok(degrees)
    }

    /// Whether rotation is handled by the OS rather than the node.
    pub fn os_rotation(&self) -> Result<bool, ConfigError> {
        Ok(self.read_bool("display", "os_rotation")?.unwrap_or(false))
    }

    pub fn overlay_mode(&self) -> Result<bool, ConfigError> {
        Ok(self.read_bool("display", "overlay_mode")?.unwrap_or(false))
    }

    pub fn sidebar_width(&self) -> Result<f64, ConfigError> {
        Ok(self.read_float("display", "sidebar_width")?.unwrap_or(0.3))
    }

    /// Sidebar height fraction; zero falls back to the width.
    pub fn sidebar_height(&self) -> Result<f64, ConfigError> {
        let height = self.read_float("display", "sidebar_height")?.unwrap_or(0.0);
        if height == 0.0 {
            self.sidebar_width()
        } else {
            Ok(height)
        }
    }

    pub fn show_foundation(&self) -> Result<bool, ConfigError> {
        Ok(self
            .read_bool("display-rpi", "show_foundation")?
            .unwrap_or(true))
    }

    pub fn foundation_layer(&self) -> Result<i64, ConfigError> {
        Ok(self
            .read_int("display-rpi", "dispmanx_foundation_layer")?
            .unwrap_or(1))
    }

    pub fn foundation_image(&self) -> Result<Option<String>, ConfigError> {
        self.read_str("display-rpi", "foundation_image")
    }

    /// Background color behind images, or `Auto` when unset or
    /// unparseable.
    pub fn image_bgcolor(&self) -> Result<ColorSpec, ConfigError> {
        let raw = self
            .read_str("display", "image_bgcolor")?
            .unwrap_or_else(|| "auto".to_string());
        Ok(ColorSpec::parse(&raw))
    }

    pub fn background(&self) -> Result<String, ConfigError> {
        Ok(self
            .read_str("display", "background")?
            .unwrap_or_else(|| "images/background.png".to_string()))
    }

    pub fn set_background(&mut self, value: &str) -> Result<(), ConfigError> {
        self.store.set("display", "background", value)
    }

    pub fn background_external_player(&self) -> Result<Option<bool>, ConfigError> {
        if !self.is_rpi() {
            return Ok(None);
        }
        Ok(Some(
            self.read_bool("display-rpi", "background_external_player")?
                .unwrap_or(false),
        ))
    }

    pub fn background_layer(&self) -> Result<i64, ConfigError> {
        Ok(self
            .read_int("display-rpi", "background_dispmanx_layer")?
            .unwrap_or(2))
    }

    /// Dispmanx layer of the application surface. Only meaningful on
    /// rpi class hardware.
    pub fn app_layer(&self) -> Result<Option<i64>, ConfigError> {
        if !self.is_rpi() {
            return Ok(None);
        }
        Ok(Some(
            self.read_int("display-rpi", "dispmanx_app_layer")?
                .unwrap_or(5),
        ))
    }

    // Legacy accessors: video

    pub fn video_external_player(&self) -> Result<Option<bool>, ConfigError> {
        if !self.is_rpi() {
            return Ok(None);
        }
        Ok(Some(
            self.read_bool("video-rpi", "external_player")?
                .unwrap_or(false),
        ))
    }

    pub fn video_layer(&self) -> Result<Option<i64>, ConfigError> {
        if !self.is_rpi() {
            return Ok(None);
        }
        Ok(Some(
            self.read_int("video-rpi", "dispmanx_video_layer")?
                .unwrap_or(4),
        ))
    }

    pub fn video_show_backdrop(&self) -> Result<Option<bool>, ConfigError> {
        if !self.is_rpi() {
            return Ok(None);
        }
        Ok(Some(
            self.read_bool("video-rpi", "show_backdrop")?.unwrap_or(false),
        ))
    }

    /// Backdrop layer shares the video layer key, with a lower default.
    pub fn video_backdrop_layer(&self) -> Result<Option<i64>, ConfigError> {
        if !self.is_rpi() {
            return Ok(None);
        }
        Ok(Some(
            self.read_int("video-rpi", "dispmanx_video_layer")?
                .unwrap_or(1),
        ))
    }

    // Legacy accessors: http proxy

    pub fn http_proxy_host(&self) -> Result<Option<String>, ConfigError> {
        Ok(self
            .read_str("http", "proxy_host")?
            .filter(|host| !host.is_empty()))
    }

    pub fn http_proxy_port(&self) -> Result<Option<i64>, ConfigError> {
        self.read_int("http", "proxy_port")
    }

    pub fn http_proxy_user(&self) -> Result<Option<String>, ConfigError> {
        Ok(self
            .read_str("http", "proxy_user")?
            .filter(|user| !user.is_empty()))
    }

    pub fn http_proxy_pass(&self) -> Result<Option<String>, ConfigError> {
        Ok(self
            .read_str("http", "proxy_pass")?
            .filter(|pass| !pass.is_empty()))
    }

    /// A proxy is enabled exactly when a host is configured.
    pub fn http_proxy_enabled(&self) -> Result<bool, ConfigError> {
        Ok(self.http_proxy_host()?.is_some())
    }

    /// Compose `[user[:pass]@]host[:port]`, or `None` without a host.
    pub fn http_proxy_url(&self) -> Result<Option<String>, ConfigError> {
        let Some(host) = self.http_proxy_host()? else {
            return Ok(None);
        };
        let mut url = String::new();
        if let Some(user) = self.http_proxy_user()? {
            url.push_str(&user);
            if let Some(pass) = self.http_proxy_pass()? {
                url.push(':');
                url.push_str(&pass);
            }
            url.push('@');
        }
        url.push_str(&host);
        if let Some(port) = self.http_proxy_port()? {
            url.push(':');
            url.push_str(&port.to_string());
        }
        Ok(Some(url))
    }

    // Legacy accessors: fonts, cache, browser, identity

    /// Default UI font, resolved against the registered resource roots.
    pub fn default_font(&self) -> Result<Option<PathBuf>, ConfigError> {
        Ok(self
            .read_str("fonts", "default")?
            .map(|name| self.roots.resolve(name)))
    }

    pub fn cache_max_size(&self) -> Result<i64, ConfigError> {
        Ok(self.read_int("cache", "max_size")?.unwrap_or(10_000_000))
    }

    pub fn browser_homepage(&self) -> Result<Option<String>, ConfigError> {
        self.read_str("browser", "homepage")
    }

    /// Configured node identity override, if any. Identity derivation
    /// itself lives outside the registry.
    pub fn node_id_override(&self) -> Result<Option<String>, ConfigError> {
        self.read_str("id", "node_id")
    }

    /// On rpi class hardware, expose the application display layer to
    /// the display shell. Never overwrites a value already present in
    /// the process environment.
    fn apply_display_layer(&self) -> Result<(), ConfigError> {
        if !self.is_rpi() {
            return Ok(());
        }
        let Some(layer) = self.app_layer()? else {
            return Ok(());
        };
        if env::var_os(DISPLAY_LAYER_ENV).is_none() {
            // Construction runs before any threads are spawned.
            unsafe { env::set_var(DISPLAY_LAYER_ENV, layer.to_string()) };
            info!("Display app layer set to {}", layer);
        }
        Ok(())
    }
}

/// A display color: either explicit RGB(A) components or `Auto`,
/// leaving the choice to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorSpec {
    Auto,
    Rgb(f64, f64, f64),
    Rgba(f64, f64, f64, f64),
}

impl ColorSpec {
    /// Parse a `:`-delimited string of 3 or 4 float components. Wrong
    /// arity or a bad component yields `fallback`.
    pub fn parse_or(value: &str, fallback: ColorSpec) -> ColorSpec {
        let parts: Vec<&str> = value.split(':').collect();
        if parts.len() != 3 && parts.len() != 4 {
            return fallback;
        }
        let mut components = Vec::with_capacity(parts.len());
        for part in &parts {
            match part.trim().parse::<f64>() {
                Ok(component) => components.push(component),
                Err(_) => return fallback,
            }
        }
        match components[..] {
            [r, g, b] => ColorSpec::Rgb(r, g, b),
            [r, g, b, a] => ColorSpec::Rgba(r, g, b, a),
            _ => fallback,
        }
    }

    pub fn parse(value: &str) -> ColorSpec {
        Self::parse_or(value, ColorSpec::Auto)
    }
}

fn default_config_file(appname: &str) -> Result<PathBuf, ConfigError> {
    let dir = dirs::config_dir().ok_or_else(|| {
        ConfigError::Persistence(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no user configuration directory",
        ))
    })?;
    Ok(dir.join(appname).join("config.ini"))
}
