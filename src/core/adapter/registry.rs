use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::options::AdapterParams;
use super::{AdapterKind, ApiAdapter};
use crate::core::transport::{ChatTransport, HttpTransport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    NoSuchAdapter(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::NoSuchAdapter(identifier) => {
                write!(f, "No such adapter: {identifier}")
            }
        }
    }
}

impl Error for RegistryError {}

/// Resolves adapter identifiers to shared adapter instances.
///
/// Instances are cached by identifier and parameters for the life of the
/// registry, so switching back to an earlier configuration reuses it.
pub struct AdapterRegistry {
    transport: Arc<dyn ChatTransport>,
    cache: HashMap<(String, String), Arc<dyn ApiAdapter>>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::with_transport(Arc::new(HttpTransport::new()))
    }

    pub fn with_transport(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            cache: HashMap::new(),
        }
    }

    pub fn resolve(
        &mut self,
        identifier: &str,
        params: &AdapterParams,
    ) -> Result<Arc<dyn ApiAdapter>, RegistryError> {
        let kind = AdapterKind::find(identifier)
            .ok_or_else(|| RegistryError::NoSuchAdapter(identifier.to_string()))?;

        let key = (identifier.to_string(), canonical_params(params));
        if let Some(adapter) = self.cache.get(&key) {
            debug!(adapter = identifier, "reusing cached adapter");
            return Ok(Arc::clone(adapter));
        }

        debug!(adapter = identifier, "constructing adapter");
        let adapter = kind.build(params, Arc::clone(&self.transport));
        self.cache.insert(key, Arc::clone(&adapter));
        Ok(adapter)
    }
}

/// Parameters as compact JSON with sorted keys, so that equal maps always
/// produce the same cache key.
pub fn canonical_params(params: &AdapterParams) -> String {
    let sorted: BTreeMap<&String, &String> = params.iter().collect();
    let object = sorted
        .into_iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();
    Value::Object(object).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::adapter::parse_params;
    use crate::utils::test_utils::MockTransport;

    fn registry() -> AdapterRegistry {
        AdapterRegistry::with_transport(MockTransport::new(Vec::new()))
    }

    #[test]
    fn same_identifier_and_params_share_an_instance() {
        let mut registry = registry();
        let params = parse_params(&["model=gpt-4o", "temperature=0.5"]);
        let first = registry.resolve("openai", &params).unwrap();
        let second = registry.resolve("openai", &params).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn different_params_build_new_instances() {
        let mut registry = registry();
        let first = registry.resolve("ollama", &parse_params(&["model=a"])).unwrap();
        let second = registry.resolve("ollama", &parse_params(&["model=b"])).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.config().get_str("model").as_deref(), Some("b"));
    }

    #[test]
    fn human_name_resolves_to_same_kind() {
        let mut registry = registry();
        let adapter = registry.resolve("Anthropic", &AdapterParams::new()).unwrap();
        assert_eq!(adapter.kind(), AdapterKind::Anthropic);
    }

    #[test]
    fn unknown_identifier_is_an_error() {
        let mut registry = registry();
        let err = registry
            .resolve("nonexistent-provider", &AdapterParams::new())
            .err()
            .unwrap();
        assert_eq!(
            err,
            RegistryError::NoSuchAdapter("nonexistent-provider".to_string())
        );
        assert_eq!(err.to_string(), "No such adapter: nonexistent-provider");
    }

    #[test]
    fn canonical_params_ignore_insertion_order() {
        let a = parse_params(&["temperature=1", "model=x", "api_key=k"]);
        let b = parse_params(&["api_key=k", "model=x", "temperature=1"]);
        assert_eq!(canonical_params(&a), canonical_params(&b));
        assert_eq!(
            canonical_params(&a),
            r#"{"api_key":"k","model":"x","temperature":"1"}"#
        );
        assert_eq!(canonical_params(&AdapterParams::new()), "{}");
    }
}
