//! graphql wire types
//!
//! response envelope and server-reported error entries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// graphql response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQlResponse<T> {
    /// response data or null if errors
    pub data: Option<T>,
    /// graphql errors array
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

impl<T> GraphQlResponse<T> {
    /// true if the response contains graphql errors
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// human-readable summary of all error messages
    pub fn error_summary(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        Some(messages.join("; "))
    }
}

impl GraphQlResponse<Value> {
    /// walk the response data along a field path.
    ///
    /// a missing or null level yields `Value::Null`.
    pub fn data_at(&self, path: &[&str]) -> Value {
        let mut current = match &self.data {
            Some(data) => data,
            None => return Value::Null,
        };
        for segment in path {
            match current.get(*segment) {
                Some(next) => current = next,
                None => return Value::Null,
            }
        }
        current.clone()
    }
}

/// graphql error entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQlError {
    /// error message
    pub message: String,
    /// error locations in the query
    #[serde(default)]
    pub locations: Vec<GraphQlLocation>,
    /// response path
    #[serde(default)]
    pub path: Vec<Value>,
    /// optional extensions payload
    #[serde(default)]
    pub extensions: Option<Value>,
}

/// graphql error location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQlLocation {
    /// line number (1-based)
    pub line: i64,
    /// column number (1-based)
    pub column: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn error(message: &str) -> GraphQlError {
        GraphQlError {
            message: message.to_string(),
            locations: vec![],
            path: vec![],
            extensions: None,
        }
    }

    #[test]
    fn test_has_errors() {
        let ok: GraphQlResponse<Value> = GraphQlResponse {
            data: Some(json!({"ok": true})),
            errors: vec![],
        };
        assert!(!ok.has_errors());
        assert!(ok.error_summary().is_none());

        let err = GraphQlResponse::<Value> {
            data: None,
            errors: vec![error("boom"), error("bang")],
        };
        assert!(err.has_errors());
        assert_eq!(err.error_summary().as_deref(), Some("boom; bang"));
    }

    #[test]
    fn test_data_at_nested_path() {
        let response = GraphQlResponse {
            data: Some(json!({"policy": {"firewall": {"addRule": {"id": "r1"}}}})),
            errors: vec![],
        };
        assert_eq!(
            response.data_at(&["policy", "firewall", "addRule"]),
            json!({"id": "r1"})
        );
        assert_eq!(response.data_at(&["policy", "missing"]), Value::Null);
    }

    #[test]
    fn test_data_at_null_level() {
        let response = GraphQlResponse {
            data: Some(json!({"policy": null})),
            errors: vec![],
        };
        assert_eq!(response.data_at(&["policy", "firewall"]), Value::Null);
    }
}
