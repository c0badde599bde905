//! Adapter option declarations and the configuration built from them.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Raw `key=value` parameters supplied by the user.
pub type AdapterParams = HashMap<String, String>;

/// Declaration of one configuration knob an adapter understands.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterOption {
    pub name: &'static str,
    pub human_label: &'static str,
    pub description: &'static str,
    pub default: Option<Value>,
    /// Shown in help instead of the literal default, e.g. the name of the
    /// environment variable an API key is read from.
    pub default_display_override: Option<&'static str>,
}

impl AdapterOption {
    pub fn new(name: &'static str, human_label: &'static str, description: &'static str) -> Self {
        Self {
            name,
            human_label,
            description,
            default: None,
            default_display_override: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Default to the value of an environment variable, and show the
    /// variable name in help rather than its value.
    pub fn with_env_default(mut self, var: &'static str) -> Self {
        self.default = env::var(var).ok().map(Value::String);
        self.default_display_override = Some(var);
        self
    }

    /// Text to show as the default in help output, if any.
    pub fn help_default(&self) -> Option<String> {
        if let Some(display) = self.default_display_override {
            return Some(display.to_string());
        }
        self.default.as_ref().and_then(scalar_to_string)
    }
}

/// Configuration an adapter instance was built with.
///
/// Keys keep the declaration order of the adapter's options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterConfig {
    values: Map<String, Value>,
}

impl AdapterConfig {
    /// Caller parameters win; otherwise a non-null default is used;
    /// otherwise the key is left out.
    pub fn from_params(options: &[AdapterOption], params: &AdapterParams) -> Self {
        let mut values = Map::new();
        for option in options {
            if let Some(value) = params.get(option.name) {
                values.insert(option.name.to_string(), Value::String(value.clone()));
            } else if let Some(default) = option.default.as_ref().filter(|v| !v.is_null()) {
                values.insert(option.name.to_string(), default.clone());
            }
        }
        Self { values }
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|value| !value.is_null())
    }

    /// The value rendered as a string, for scalar values.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(scalar_to_string)
    }

    /// The value parsed as `T`.
    ///
    /// `None` means "leave this parameter out of the request": the key is
    /// absent or the value does not parse. Use `unwrap_or` for a concrete
    /// fallback instead.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.get_str(key)?;
        match raw.trim().parse::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                debug!(key, value = %raw, "ignoring option that failed to parse");
                None
            }
        }
    }

    /// The value parsed as a finite `f64`. `nan` and `inf` parse as floats
    /// but serialize as JSON `null`, so they are treated as malformed.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        let value = self.get_parsed::<f64>(key)?;
        if value.is_finite() {
            Some(value)
        } else {
            debug!(key, value, "ignoring non-finite option");
            None
        }
    }

    /// Configuration without the given secret keys and without nulls.
    pub fn masked(&self, masked_keys: &[&str]) -> Map<String, Value> {
        self.values
            .iter()
            .filter(|(key, value)| !masked_keys.contains(&key.as_str()) && !value.is_null())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse `key=value` tokens. Splits on the first `=`, trims both sides,
/// skips tokens without `=`; later duplicates replace earlier ones.
pub fn parse_params<S: AsRef<str>>(tokens: &[S]) -> AdapterParams {
    let mut params = AdapterParams::new();
    for token in tokens {
        match token.as_ref().split_once('=') {
            Some((key, value)) => {
                params.insert(key.trim().to_string(), value.trim().to_string());
            }
            None => warn!(token = token.as_ref(), "ignoring option without '='"),
        }
    }
    params
}
