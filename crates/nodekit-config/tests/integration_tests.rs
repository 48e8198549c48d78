//! Integration tests for the configuration registry

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use nodekit_config::{
    ColorSpec, ConfigError, ConfigRegistry, ElementSpec, ItemSpec, Value, ValueKind,
};

/// Test environment owning the config file and resource roots.
struct ConfigTestEnv {
    temp_dir: TempDir,
    config_file: PathBuf,
}

impl ConfigTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config_file = temp_dir.path().join("config.ini");
        Self {
            temp_dir,
            config_file,
        }
    }

    fn seed(&self, contents: &str) {
        fs::write(&self.config_file, contents).expect("Failed to write config");
    }

    fn open(&self) -> ConfigRegistry {
        ConfigRegistry::open_at("testnode", &self.config_file, self.temp_dir.path())
            .expect("Failed to open registry")
    }

    fn make_root(&self, name: &str, files: &[&str]) -> PathBuf {
        let root = self.temp_dir.path().join(name);
        fs::create_dir_all(&root).unwrap();
        for file in files {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, b"asset").unwrap();
        }
        root
    }
}

fn register_writables(registry: &mut ConfigRegistry) {
    registry.register_element(
        "hostname",
        ElementSpec::stored(
            "network",
            "hostname",
            ItemSpec::new(ValueKind::Str).with_fallback("node").writable(),
        ),
    );
    registry.register_element(
        "wifi_enabled",
        ElementSpec::stored(
            "network",
            "wifi_enabled",
            ItemSpec::new(ValueKind::Bool).with_fallback(false).writable(),
        ),
    );
    registry.register_element(
        "poll_interval",
        ElementSpec::stored(
            "network",
            "poll_interval",
            ItemSpec::new(ValueKind::Int).with_fallback(30i64).writable(),
        ),
    );
    registry.register_element(
        "backoff_factor",
        ElementSpec::stored(
            "network",
            "backoff_factor",
            ItemSpec::new(ValueKind::Float).with_fallback(1.5f64).writable(),
        ),
    );
}

#[test]
fn test_round_trip_every_writable_kind() {
    let env = ConfigTestEnv::new();
    let mut registry = env.open();
    register_writables(&mut registry);

    registry.set("hostname", "kiosk-7").unwrap();
    registry.set("wifi_enabled", true).unwrap();
    registry.set("poll_interval", 60i64).unwrap();
    registry.set("backoff_factor", 2.5f64).unwrap();

    assert_eq!(
        registry.get("hostname").unwrap(),
        Value::Str("kiosk-7".to_string())
    );
    assert_eq!(registry.get("wifi_enabled").unwrap(), Value::Bool(true));
    assert_eq!(registry.get("poll_interval").unwrap(), Value::Int(60));
    assert_eq!(registry.get("backoff_factor").unwrap(), Value::Float(2.5));
}

#[test]
fn test_bool_persists_canonical_encoding() {
    let env = ConfigTestEnv::new();
    let mut registry = env.open();
    register_writables(&mut registry);

    registry.set("wifi_enabled", true).unwrap();
    let on_disk = fs::read_to_string(&env.config_file).unwrap();
    assert!(on_disk.contains("wifi_enabled = yes"));

    registry.set("wifi_enabled", false).unwrap();
    let on_disk = fs::read_to_string(&env.config_file).unwrap();
    assert!(on_disk.contains("wifi_enabled = no"));
}

#[test]
fn test_writes_survive_reopen() {
    let env = ConfigTestEnv::new();
    let mut registry = env.open();
    register_writables(&mut registry);
    registry.set("poll_interval", 120i64).unwrap();
    drop(registry);

    let mut reopened = env.open();
    register_writables(&mut reopened);
    assert_eq!(reopened.get("poll_interval").unwrap(), Value::Int(120));
}

#[test]
fn test_read_only_enforcement() {
    let env = ConfigTestEnv::new();
    let mut registry = env.open();
    registry.register_element(
        "serial",
        ElementSpec::stored("id", "serial", ItemSpec::new(ValueKind::Str).with_fallback("unset")),
    );
    registry.register_element(
        "uptime_label",
        ElementSpec::derived(|_| Ok(Value::Str("up".to_string()))),
    );

    for value in ["a", "b", ""] {
        assert!(matches!(
            registry.set("serial", value),
            Err(ConfigError::ReadOnly(_))
        ));
        assert!(matches!(
            registry.set("uptime_label", value),
            Err(ConfigError::ReadOnly(_))
        ));
    }
}

#[test]
fn test_fallback_and_required() {
    let env = ConfigTestEnv::new();
    let mut registry = env.open();
    registry.register_element(
        "timezone",
        ElementSpec::stored(
            "system",
            "timezone",
            ItemSpec::new(ValueKind::Str).with_fallback("UTC"),
        ),
    );
    registry.register_element(
        "api_token",
        ElementSpec::stored("http", "token", ItemSpec::new(ValueKind::Str)),
    );

    assert_eq!(
        registry.get("timezone").unwrap(),
        Value::Str("UTC".to_string())
    );
    assert!(matches!(
        registry.get("api_token"),
        Err(ConfigError::MissingRequired { .. })
    ));
}

#[test]
fn test_required_read_succeeds_after_store_has_value() {
    let env = ConfigTestEnv::new();
    env.seed("[http]\ntoken = sekrit\n");
    let mut registry = env.open();
    registry.register_element(
        "api_token",
        ElementSpec::stored("http", "token", ItemSpec::new(ValueKind::Str)),
    );
    assert_eq!(
        registry.get("api_token").unwrap(),
        Value::Str("sekrit".to_string())
    );
}

#[test]
fn test_root_resolution_order() {
    let env = ConfigTestEnv::new();
    let r1 = env.make_root("r1", &["fonts/main.ttf"]);
    let r2 = env.make_root("r2", &[]);
    let r3 = env.make_root("r3", &["fonts/main.ttf"]);

    let mut registry = env.open();
    registry.register_application_root(&r1);
    registry.register_application_root(&r2);
    registry.register_application_root(&r3);

    assert_eq!(
        registry.resolve_path("fonts/main.ttf"),
        r3.join("fonts/main.ttf")
    );
    assert_eq!(
        registry.resolve_path("fonts/missing.ttf"),
        PathBuf::from("fonts/missing.ttf")
    );
}

#[test]
fn test_default_font_resolves_through_roots() {
    let env = ConfigTestEnv::new();
    let themes = env.make_root("themes", &["fonts/display.ttf"]);
    env.seed("[fonts]\ndefault = fonts/display.ttf\n");

    let mut registry = env.open();
    registry.register_application_root(&themes);

    assert_eq!(
        registry.default_font().unwrap(),
        Some(themes.join("fonts/display.ttf"))
    );
}

#[test]
fn test_orientation_derivation() {
    let cases = [
        (false, false, 0),
        (true, false, 90),
        (false, true, 180),
        (true, true, 270),
    ];
    for (portrait, flip, expected) in cases {
        let env = ConfigTestEnv::new();
        let mut registry = env.open();
        registry.set_portrait(portrait).unwrap();
        registry.set_flip(flip).unwrap();
        assert_eq!(
            registry.orientation().unwrap(),
            expected,
            "portrait={portrait} flip={flip}"
        );
    }
}

#[test]
fn test_color_parsing_from_store() {
    let env = ConfigTestEnv::new();
    env.seed("[display]\nimage_bgcolor = 1.0:0.5:0.25\n");
    let registry = env.open();
    assert_eq!(
        registry.image_bgcolor().unwrap(),
        ColorSpec::Rgb(1.0, 0.5, 0.25)
    );

    let env = ConfigTestEnv::new();
    env.seed("[display]\nimage_bgcolor = 1.0:abc\n");
    let registry = env.open();
    assert_eq!(registry.image_bgcolor().unwrap(), ColorSpec::Auto);
}

#[test]
fn test_proxy_url_composition() {
    let env = ConfigTestEnv::new();
    env.seed(
        "[http]\n\
         proxy_host = proxy.local\n\
         proxy_port = 8080\n\
         proxy_user = u\n\
         proxy_pass = p\n",
    );
    let registry = env.open();
    assert!(registry.http_proxy_enabled().unwrap());
    assert_eq!(
        registry.http_proxy_url().unwrap(),
        Some("u:p@proxy.local:8080".to_string())
    );
}

#[test]
fn test_proxy_without_host_is_disabled() {
    let env = ConfigTestEnv::new();
    env.seed("[http]\nproxy_port = 8080\nproxy_user = u\n");
    let registry = env.open();
    assert!(!registry.http_proxy_enabled().unwrap());
    assert_eq!(registry.http_proxy_url().unwrap(), None);
}

#[test]
fn test_proxy_partial_credentials() {
    let env = ConfigTestEnv::new();
    env.seed("[http]\nproxy_host = proxy.local\nproxy_user = u\n");
    let registry = env.open();
    assert_eq!(
        registry.http_proxy_url().unwrap(),
        Some("u@proxy.local".to_string())
    );

    let env = ConfigTestEnv::new();
    env.seed("[http]\nproxy_host = proxy.local\n");
    let registry = env.open();
    assert_eq!(
        registry.http_proxy_url().unwrap(),
        Some("proxy.local".to_string())
    );
}

#[test]
fn test_unknown_element_errors() {
    let env = ConfigTestEnv::new();
    let mut registry = env.open();
    assert!(matches!(
        registry.get("nonexistent"),
        Err(ConfigError::UnknownElement(_))
    ));
    assert!(matches!(
        registry.set("nonexistent", 1i64),
        Err(ConfigError::UnknownElement(_))
    ));
}

#[test]
fn test_derived_reads_other_elements() {
    let env = ConfigTestEnv::new();
    let mut registry = env.open();
    register_writables(&mut registry);
    registry.register_element(
        "endpoint",
        ElementSpec::derived(|config| {
            let host = config.get("hostname")?;
            let port = config.get("poll_interval")?;
            Ok(Value::Str(format!("{host}:{port}")))
        }),
    );
    registry.set("hostname", "kiosk-7").unwrap();
    assert_eq!(
        registry.get("endpoint").unwrap(),
        Value::Str("kiosk-7:30".to_string())
    );
}

#[test]
fn test_display_layer_env_is_not_overwritten() {
    // The variable is process-global; pin it before construction.
    unsafe { std::env::set_var(nodekit_config::DISPLAY_LAYER_ENV, "99") };

    let env = ConfigTestEnv::new();
    env.seed("[platform]\nplatform = rpi\n\n[display-rpi]\ndispmanx_app_layer = 6\n");
    let _registry = env.open();

    assert_eq!(
        std::env::var(nodekit_config::DISPLAY_LAYER_ENV).unwrap(),
        "99"
    );
}
