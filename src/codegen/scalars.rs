//! graphql scalar to rust type mapping

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// scalars every graphql schema has without declaring them
pub const BUILTIN_SCALARS: [&str; 5] = ["ID", "String", "Int", "Float", "Boolean"];

const CHRONO: &str = r#"chrono = { version = "0.4", features = ["serde"] }"#;
const UUID: &str = r#"uuid = { version = "1", features = ["serde"] }"#;

/// how a scalar is represented in generated code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarMapping {
    /// rust type path used in models and method signatures
    pub rust_type: String,
    /// dependency line added to the generated `Cargo.toml`,
    /// e.g. `uuid = { version = "1", features = ["serde"] }`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ScalarMapping {
    pub fn new(rust_type: impl Into<String>) -> Self {
        Self {
            rust_type: rust_type.into(),
            dependency: None,
            description: None,
        }
    }

    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependency = Some(dependency.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// fallback for custom scalars nobody registered
    pub fn opaque() -> Self {
        Self::new("String").with_description("opaque custom scalar, passed through as a string")
    }
}

/// registry of scalar mappings, seeded with the built-ins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarRegistry {
    mappings: BTreeMap<String, ScalarMapping>,
}

impl Default for ScalarRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ScalarRegistry {
    /// registry with the built-in and common custom scalars
    pub fn new() -> Self {
        let mut registry = Self {
            mappings: BTreeMap::new(),
        };
        for name in ["ID", "String"] {
            registry.register(name, ScalarMapping::new("String"));
        }
        for name in ["Int", "Long", "BigInt"] {
            registry.register(name, ScalarMapping::new("i64"));
        }
        registry.register("Float", ScalarMapping::new("f64"));
        registry.register("Boolean", ScalarMapping::new("bool"));
        registry.register(
            "DateTime",
            ScalarMapping::new("chrono::DateTime<chrono::Utc>")
                .with_dependency(CHRONO)
                .with_description("ISO 8601 timestamp"),
        );
        registry.register(
            "Date",
            ScalarMapping::new("chrono::NaiveDate")
                .with_dependency(CHRONO)
                .with_description("ISO 8601 calendar date"),
        );
        registry.register(
            "UUID",
            ScalarMapping::new("uuid::Uuid").with_dependency(UUID),
        );
        for name in ["JSON", "JSONObject"] {
            registry.register(name, ScalarMapping::new("serde_json::Value"));
        }
        registry
    }

    /// add or replace a mapping
    pub fn register(&mut self, name: impl Into<String>, mapping: ScalarMapping) -> &mut Self {
        self.mappings.insert(name.into(), mapping);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ScalarMapping> {
        self.mappings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.mappings.contains_key(name)
    }

    /// mapping for a scalar; the bool is true when it fell back to opaque
    pub fn resolve(&self, name: &str) -> (ScalarMapping, bool) {
        match self.mappings.get(name) {
            Some(mapping) => (mapping.clone(), false),
            None => (ScalarMapping::opaque(), true),
        }
    }
}

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_SCALARS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let registry = ScalarRegistry::new();
        assert_eq!(registry.get("ID").unwrap().rust_type, "String");
        assert_eq!(registry.get("BigInt").unwrap().rust_type, "i64");
        assert_eq!(
            registry.get("DateTime").unwrap().rust_type,
            "chrono::DateTime<chrono::Utc>"
        );
        assert!(registry.get("UUID").unwrap().dependency.is_some());
        assert!(registry.get("JSON").unwrap().dependency.is_none());
    }

    #[test]
    fn test_register_overrides() {
        let mut registry = ScalarRegistry::new();
        registry.register(
            "DateTime",
            ScalarMapping::new("time::OffsetDateTime").with_dependency("time = \"0.3\""),
        );
        assert_eq!(
            registry.get("DateTime").unwrap().rust_type,
            "time::OffsetDateTime"
        );
    }

    #[test]
    fn test_unknown_scalar_is_opaque() {
        let registry = ScalarRegistry::new();
        let (mapping, opaque) = registry.resolve("Money");
        assert!(opaque);
        assert_eq!(mapping.rust_type, "String");

        let (_, opaque) = registry.resolve("Int");
        assert!(!opaque);
    }

    #[test]
    fn test_builtins() {
        assert!(is_builtin("Boolean"));
        assert!(!is_builtin("DateTime"));
    }
}
