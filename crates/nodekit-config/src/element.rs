//! Typed element model
//!
//! An element maps a name to either a section/key slot in the persisted
//! store or a function computed against the registry. The store only
//! holds strings; `ValueKind` carries the declared type and the coercion
//! rules between stored text and typed values.

use std::fmt;

use crate::registry::ConfigRegistry;
use crate::ConfigError;

/// Declared type of a stored element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Str,
    Bool,
    Int,
    Float,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Str => "string",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
        }
    }

    /// Coerce raw store text into a typed value. `None` means the text
    /// does not parse as this kind; the caller attaches context.
    pub(crate) fn coerce(&self, raw: &str) -> Option<Value> {
        match self {
            ValueKind::Str => Some(Value::Str(raw.to_string())),
            ValueKind::Bool => parse_bool(raw).map(Value::Bool),
            ValueKind::Int => raw.trim().parse::<i64>().ok().map(Value::Int),
            ValueKind::Float => raw.trim().parse::<f64>().ok().map(Value::Float),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Boolean tokens accepted from the store.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "true" | "on" => Some(true),
        "0" | "no" | "false" | "off" => Some(false),
        _ => None,
    }
}

/// A typed configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Str(_) => ValueKind::Str,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Float view; integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

/// Canonical store encoding: booleans as yes/no, numbers as decimal
/// text.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Bool(true) => f.write_str("yes"),
            Value::Bool(false) => f.write_str("no"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

/// Behaviour when the backing key is absent from the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Fallback {
    /// Absence is a hard failure.
    Required,
    /// Absence yields this value.
    Value(Value),
}

/// Storage and access rules for one stored element.
#[derive(Debug, Clone)]
pub struct ItemSpec {
    pub kind: ValueKind,
    pub fallback: Fallback,
    pub read_only: bool,
}

impl ItemSpec {
    /// Required, read-only element of the given kind.
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            fallback: Fallback::Required,
            read_only: true,
        }
    }

    pub fn with_fallback(mut self, value: impl Into<Value>) -> Self {
        self.fallback = Fallback::Value(value.into());
        self
    }

    pub fn writable(mut self) -> Self {
        self.read_only = false;
        self
    }
}

impl Default for ItemSpec {
    fn default() -> Self {
        Self::new(ValueKind::Str)
    }
}

/// Function behind a derived element. May read other elements through
/// the registry; transitive lookups must stay acyclic and the registry
/// rejects cycles at read time.
pub type DerivedFn = Box<dyn Fn(&ConfigRegistry) -> Result<Value, ConfigError> + Send + Sync>;

/// A named element either reads a slot in the persisted store or is
/// computed against the registry.
pub enum ElementSpec {
    /// Backed by a section/key slot in the store.
    Stored {
        section: String,
        key: String,
        item: ItemSpec,
    },
    /// Computed; always read only.
    Derived(DerivedFn),
}

impl ElementSpec {
    pub fn stored(section: &str, key: &str, item: ItemSpec) -> Self {
        ElementSpec::Stored {
            section: section.to_string(),
            key: key.to_string(),
            item,
        }
    }

    pub fn derived<F>(f: F) -> Self
    where
        F: Fn(&ConfigRegistry) -> Result<Value, ConfigError> + Send + Sync + 'static,
    {
        ElementSpec::Derived(Box::new(f))
    }

    pub fn is_read_only(&self) -> bool {
        match self {
            ElementSpec::Stored { item, .. } => item.read_only,
            ElementSpec::Derived(_) => true,
        }
    }
}

impl fmt::Debug for ElementSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementSpec::Stored { section, key, item } => f
                .debug_struct("Stored")
                .field("section", section)
                .field("key", key)
                .field("item", item)
                .finish(),
            ElementSpec::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}
