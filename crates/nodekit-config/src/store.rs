//! Persisted section/key store
//!
//! A flat INI-style UTF-8 text file: `[section]` headers followed by
//! `key = value` pairs. The store is read once at construction and the
//! whole file is rewritten synchronously on every mutation. A process
//! crash mid-write can lose the file; that is an accepted failure mode.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::element::{Value, ValueKind};
use crate::ConfigError;

type Sections = BTreeMap<String, BTreeMap<String, String>>;

pub struct PersistedStore {
    path: PathBuf,
    sections: Sections,
}

impl PersistedStore {
    /// Load the store from `path`. A missing file is an empty store,
    /// not an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let mut sections = Sections::new();
        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            parse_into(&contents, &mut sections);
            debug!(
                "Loaded {} config sections from {}",
                sections.len(),
                path.display()
            );
        } else {
            warn!("No config file at {}, starting empty", path.display());
        }
        Ok(Self { path, sections })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// Ensure a section exists, persisting immediately when one is
    /// created.
    pub fn ensure_section(&mut self, section: &str) -> Result<(), ConfigError> {
        if !self.sections.contains_key(section) {
            self.sections
                .insert(section.to_string(), BTreeMap::new());
            self.flush()?;
        }
        Ok(())
    }

    /// Raw string value, if present.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|keys| keys.get(key))
            .map(String::as_str)
    }

    /// Typed read. `Ok(None)` when the key is absent; text that does
    /// not parse as `kind` is a coercion error, never a default.
    pub fn read(
        &self,
        section: &str,
        key: &str,
        kind: ValueKind,
    ) -> Result<Option<Value>, ConfigError> {
        match self.get(section, key) {
            None => Ok(None),
            Some(raw) => match kind.coerce(raw) {
                Some(value) => Ok(Some(value)),
                None => Err(ConfigError::TypeCoercion {
                    target: format!("[{section}] {key}"),
                    kind,
                    value: raw.to_string(),
                }),
            },
        }
    }

    /// Set a key and rewrite the backing file.
    pub fn set(&mut self, section: &str, key: &str, value: &str) -> Result<(), ConfigError> {
        self.ensure_section(section)?;
        if let Some(keys) = self.sections.get_mut(section) {
            keys.insert(key.to_string(), value.to_string());
        }
        self.flush()
    }

    /// Rewrite the whole backing file.
    pub fn flush(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, self.render())?;
        debug!("Config written to {}", self.path.display());
        Ok(())
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for (name, keys) in &self.sections {
            out.push_str(&format!("[{name}]\n"));
            for (key, value) in keys {
                out.push_str(&format!("{key} = {value}\n"));
            }
            out.push('\n');
        }
        out
    }
}

fn parse_into(contents: &str, sections: &mut Sections) {
    let mut current: Option<String> = None;
    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            let name = line[1..line.len() - 1].trim().to_string();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            warn!("Skipping malformed config line {}: {:?}", lineno + 1, line);
            continue;
        };
        let Some(section) = current.as_ref() else {
            warn!(
                "Skipping config line {} outside any section: {:?}",
                lineno + 1,
                line
            );
            continue;
        };
        if let Some(keys) = sections.get_mut(section) {
            keys.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
}
