//! generated operation descriptors
//!
//! every operation in a generated client is an [`OperationDef`] constant.
//! the document is stored split around the selection set so a request-time
//! selection can be spliced in without re-rendering the whole query.

use crate::error::Result;
use crate::selection::{FieldSelection, Planner, SchemaShape, SelectionPlan};
use serde::{Deserialize, Serialize};

/// graphql operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Query,
    Mutation,
}

impl OperationKind {
    /// document keyword
    pub fn keyword(self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
        }
    }
}

/// static description of one generated operation
#[derive(Debug, Clone, Copy)]
pub struct OperationDef {
    /// schema field name of the operation
    pub name: &'static str,
    pub kind: OperationKind,
    /// response keys from `data` down to the operation field
    pub response_path: &'static [&'static str],
    /// named return type (innermost, without modifiers)
    pub return_type: &'static str,
    /// document text up to the operation field and its arguments
    pub document_prefix: &'static str,
    /// closing braces of the enclosing namespace fields
    pub document_suffix: &'static str,
    /// selection text for [`FieldSelection::All`]
    pub query_all: &'static str,
    /// selection text for [`FieldSelection::Minimal`]
    pub query_minimal: &'static str,
    /// serialized [`SelectionPlan`] behind `query_all`
    pub plan_all: &'static str,
    /// serialized [`SelectionPlan`] behind `query_minimal`
    pub plan_minimal: &'static str,
}

/// a document ready to send, with the plan its response is checked against
#[derive(Debug, Clone)]
pub struct PreparedOperation {
    pub document: String,
    pub plan: SelectionPlan,
}

impl OperationDef {
    /// resolve the document and plan for a selection.
    ///
    /// `None` selects all fields. custom selections are planned against
    /// `shape_json`, the generated client's schema shape.
    pub fn prepare(
        &self,
        selection: Option<&FieldSelection>,
        shape_json: &str,
    ) -> Result<PreparedOperation> {
        let (text, plan) = match selection.unwrap_or(&FieldSelection::All) {
            FieldSelection::All => (
                self.query_all.to_string(),
                SelectionPlan::from_json(self.plan_all)?,
            ),
            FieldSelection::Minimal => (
                self.query_minimal.to_string(),
                SelectionPlan::from_json(self.plan_minimal)?,
            ),
            custom @ FieldSelection::Custom(_) => {
                let shape = SchemaShape::from_json(shape_json)?;
                let plan = Planner::new(&shape).plan(self.return_type, custom)?;
                (plan.render(), plan)
            }
        };

        Ok(PreparedOperation {
            document: compose_document(self.document_prefix, &text, self.document_suffix),
            plan,
        })
    }
}

/// splice a selection set between a document prefix and suffix
pub fn compose_document(prefix: &str, selection: &str, suffix: &str) -> String {
    let mut document = String::with_capacity(prefix.len() + selection.len() + suffix.len() + 1);
    document.push_str(prefix);
    if !selection.is_empty() {
        document.push(' ');
        document.push_str(selection);
    }
    document.push_str(suffix);
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const SHAPE: &str = r#"{"types":{"User":{"kind":"object","fields":[{"name":"id","type":"ID","identifier":true},{"name":"name","type":"String"}]}}}"#;

    const GET_USER: OperationDef = OperationDef {
        name: "getUser",
        kind: OperationKind::Query,
        response_path: &["getUser"],
        return_type: "User",
        document_prefix: "query GetUser($id: ID!) { getUser(id: $id)",
        document_suffix: " }",
        query_all: "{ id name }",
        query_minimal: "{ id }",
        plan_all: r#"{"root":{"node":"object","type":"User","fields":[{"name":"id"},{"name":"name"}]}}"#,
        plan_minimal: r#"{"root":{"node":"object","type":"User","fields":[{"name":"id"}]}}"#,
    };

    #[test]
    fn test_compose_document() {
        assert_eq!(
            compose_document("query Q { a(x: 1)", "{ id }", " }"),
            "query Q { a(x: 1) { id } }"
        );
        assert_eq!(
            compose_document("query Q { count", "", " }"),
            "query Q { count }"
        );
    }

    #[test]
    fn test_prepare_defaults_to_all() {
        let prepared = GET_USER.prepare(None, SHAPE).unwrap();
        assert_eq!(
            prepared.document,
            "query GetUser($id: ID!) { getUser(id: $id) { id name } }"
        );
        assert_eq!(prepared.plan.render(), "{ id name }");
    }

    #[test]
    fn test_prepare_minimal_and_custom() {
        let minimal = GET_USER
            .prepare(Some(&FieldSelection::Minimal), SHAPE)
            .unwrap();
        assert!(minimal.document.ends_with("getUser(id: $id) { id } }"));

        let custom = GET_USER
            .prepare(Some(&FieldSelection::custom(["name"])), SHAPE)
            .unwrap();
        assert!(custom.document.ends_with("getUser(id: $id) { name } }"));
    }

    #[test]
    fn test_prepare_rejects_invalid_custom_path() {
        let err = GET_USER
            .prepare(Some(&FieldSelection::custom(["email"])), SHAPE)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFieldPath { .. }));
    }
}
