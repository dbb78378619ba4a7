//! field selection planning
//!
//! a [`SelectionPlan`] is the single source for both the selection-set text
//! sent with a query and the response check run on what comes back. plans
//! are computed by [`Planner`] over a [`SchemaShape`], which the generator
//! builds from the schema and generated clients embed for request-time
//! custom selections.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// discriminator field for union and interface responses
pub const TYPENAME: &str = "__typename";

/// default bound on nested composite types in an ALL plan
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// which fields an operation requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSelection {
    /// every reachable field, cycle-truncated
    #[default]
    All,
    /// identifier-like fields and discriminators only
    Minimal,
    /// dotted field paths, e.g. `profile.email`
    Custom(Vec<String>),
}

impl FieldSelection {
    /// custom selection from dotted field paths
    pub fn custom<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldSelection::Custom(paths.into_iter().map(Into::into).collect())
    }
}

/// kind of composite type in a [`SchemaShape`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Object,
    Interface,
    Union,
}

/// one selectable field of a composite type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldShape {
    pub name: String,
    /// named type without modifiers
    #[serde(rename = "type")]
    pub type_name: String,
    /// graphql type syntax with modifiers, e.g. `[String!]!`
    #[serde(rename = "ref", default, skip_serializing_if = "String::is_empty")]
    pub type_ref: String,
    /// matches the identifier pattern and is a leaf
    #[serde(default, skip_serializing_if = "is_false")]
    pub identifier: bool,
    /// has a non-null argument without default
    #[serde(default, skip_serializing_if = "is_false")]
    pub required_arguments: bool,
}

impl FieldShape {
    /// list and non-null wrapping around the named type, e.g. `[!]!`
    fn wrapping(&self) -> String {
        if self.type_ref.is_empty() {
            String::new()
        } else {
            self.type_ref.replacen(&self.type_name, "", 1)
        }
    }
}

/// structure of one composite type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeShape {
    pub kind: ShapeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldShape>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub possible_types: Vec<String>,
}

impl TypeShape {
    fn field(&self, name: &str) -> Option<&FieldShape> {
        self.fields
            .iter()
            .find(|f| f.name == name && !f.required_arguments)
    }

    fn has_possible_type(&self, name: &str) -> bool {
        self.kind != ShapeKind::Object && self.possible_types.iter().any(|t| t == name)
    }
}

/// composite type structure walked by the planner.
///
/// names missing from the map are leaves (scalars and enums).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaShape {
    pub types: BTreeMap<String, TypeShape>,
}

impl SchemaShape {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn get(&self, name: &str) -> Option<&TypeShape> {
        self.types.get(name)
    }

    pub fn is_composite(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// fields of a union or interface whose sibling fragments cannot share a
    /// response name.
    ///
    /// two fields merge when their wrapping matches and they are either the
    /// same leaf type or both composite. interface fields are selected
    /// outside the fragments and never conflict.
    pub fn conflicting_fields(&self, type_name: &str) -> BTreeSet<String> {
        let mut conflicts = BTreeSet::new();
        let Some(shape) = self.get(type_name) else {
            return conflicts;
        };
        if shape.kind == ShapeKind::Object {
            return conflicts;
        }
        let mut by_name: BTreeMap<&str, Vec<&FieldShape>> = BTreeMap::new();
        for member in &shape.possible_types {
            let Some(member) = self.get(member) else {
                continue;
            };
            for field in &member.fields {
                if field.required_arguments || shape.field(&field.name).is_some() {
                    continue;
                }
                by_name.entry(field.name.as_str()).or_default().push(field);
            }
        }
        for (name, fields) in by_name {
            let clash = fields.iter().enumerate().any(|(idx, a)| {
                fields[idx + 1..].iter().any(|b| self.fields_conflict(a, b))
            });
            if clash {
                conflicts.insert(name.to_string());
            }
        }
        conflicts
    }

    fn fields_conflict(&self, a: &FieldShape, b: &FieldShape) -> bool {
        if a.wrapping() != b.wrapping() {
            return true;
        }
        let both_composite = self.is_composite(&a.type_name) && self.is_composite(&b.type_name);
        !both_composite && a.type_name != b.type_name
    }

    /// response aliases a type's fields get when selected inside fragments,
    /// keyed by field name
    pub fn variant_aliases(&self, type_name: &str) -> BTreeMap<String, String> {
        let mut aliases = BTreeMap::new();
        let Some(shape) = self.get(type_name) else {
            return aliases;
        };
        for parent in self.types.keys() {
            let Some(parent_shape) = self.get(parent) else {
                continue;
            };
            if !parent_shape.possible_types.iter().any(|t| t == type_name) {
                continue;
            }
            for field in self.conflicting_fields(parent) {
                if shape.fields.iter().any(|f| f.name == field) {
                    aliases.insert(field.clone(), variant_alias(type_name, &field));
                }
            }
        }
        aliases
    }
}

/// response key for `field` selected inside a `... on type_name` fragment
/// whose siblings select the same name with another type
pub fn variant_alias(type_name: &str, field: &str) -> String {
    format!("{field}_{type_name}")
}

/// recursive field selection for one return type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum PlanNode {
    #[default]
    Leaf,
    Object(ObjectPlan),
    Polymorphic(PolymorphicPlan),
}

impl PlanNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self, PlanNode::Leaf)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPlan {
    #[serde(rename = "type")]
    pub type_name: String,
    pub fields: Vec<FieldPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPlan {
    pub name: String,
    /// response key when it differs from the field name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "PlanNode::is_leaf")]
    pub node: PlanNode,
}

impl FieldPlan {
    fn new(name: impl Into<String>, node: PlanNode) -> Self {
        Self {
            name: name.into(),
            alias: None,
            node,
        }
    }

    fn leaf(name: impl Into<String>) -> Self {
        Self::new(name, PlanNode::Leaf)
    }

    /// key this field appears under in the response
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// union or interface selection; `__typename` is always requested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolymorphicPlan {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub common: Vec<FieldPlan>,
    #[serde(default)]
    pub variants: Vec<ObjectPlan>,
}

/// selection plan for an operation's return type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionPlan {
    pub root: PlanNode,
}

impl SelectionPlan {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// selection-set text, empty for leaf return types
    pub fn render(&self) -> String {
        let mut out = String::new();
        render_node(&self.root, &mut out);
        out
    }

    /// names of the top-level fields this plan requests
    pub fn top_level_fields(&self) -> Vec<&str> {
        match &self.root {
            PlanNode::Leaf => Vec::new(),
            PlanNode::Object(obj) => obj.fields.iter().map(|f| f.name.as_str()).collect(),
            PlanNode::Polymorphic(poly) => std::iter::once(TYPENAME)
                .chain(
                    poly.common
                        .iter()
                        .map(|f| f.name.as_str())
                        .filter(|name| *name != TYPENAME),
                )
                .collect(),
        }
    }

    /// check a response value against the plan.
    ///
    /// every requested field must be present (null is fine) and every
    /// polymorphic object must carry its discriminator.
    pub fn check(&self, value: &Value) -> Result<()> {
        let mut path = Vec::new();
        check_node(&self.root, value, &mut path)
    }
}

fn render_node(node: &PlanNode, out: &mut String) {
    match node {
        PlanNode::Leaf => {}
        PlanNode::Object(obj) => {
            out.push('{');
            render_fields(&obj.fields, out);
            out.push_str(" }");
        }
        PlanNode::Polymorphic(poly) => {
            out.push_str("{ ");
            out.push_str(TYPENAME);
            let common: Vec<FieldPlan> = poly
                .common
                .iter()
                .filter(|f| f.name != TYPENAME)
                .cloned()
                .collect();
            render_fields(&common, out);
            for variant in &poly.variants {
                out.push_str(" ... on ");
                out.push_str(&variant.type_name);
                out.push(' ');
                out.push('{');
                render_fields(&variant.fields, out);
                out.push_str(" }");
            }
            out.push_str(" }");
        }
    }
}

fn render_fields(fields: &[FieldPlan], out: &mut String) {
    for field in fields {
        out.push(' ');
        if let Some(alias) = &field.alias {
            out.push_str(alias);
            out.push_str(": ");
        }
        out.push_str(&field.name);
        if !field.node.is_leaf() {
            out.push(' ');
            render_node(&field.node, out);
        }
    }
}

fn check_node(node: &PlanNode, value: &Value, path: &mut Vec<String>) -> Result<()> {
    match value {
        Value::Null => Ok(()),
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                path.push(idx.to_string());
                check_node(node, item, path)?;
                path.pop();
            }
            Ok(())
        }
        _ => match node {
            PlanNode::Leaf => Ok(()),
            PlanNode::Object(obj) => {
                let map = expect_object(value, path)?;
                check_fields(&obj.fields, map, path)
            }
            PlanNode::Polymorphic(poly) => {
                let map = expect_object(value, path)?;
                let typename = map
                    .get(TYPENAME)
                    .and_then(Value::as_str)
                    .ok_or_else(|| shape_error(path, format!("missing `{TYPENAME}`")))?;
                check_fields(&poly.common, map, path)?;
                if let Some(variant) = poly.variants.iter().find(|v| v.type_name == typename) {
                    check_fields(&variant.fields, map, path)?;
                }
                Ok(())
            }
        },
    }
}

fn check_fields(
    fields: &[FieldPlan],
    map: &Map<String, Value>,
    path: &mut Vec<String>,
) -> Result<()> {
    for field in fields {
        let key = field.response_key();
        let Some(value) = map.get(key) else {
            return Err(shape_error(path, format!("missing field `{key}`")));
        };
        path.push(key.to_string());
        check_node(&field.node, value, path)?;
        path.pop();
    }
    Ok(())
}

fn expect_object<'v>(value: &'v Value, path: &[String]) -> Result<&'v Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| shape_error(path, "expected an object".to_string()))
}

fn shape_error(path: &[String], message: String) -> Error {
    let path = if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join(".")
    };
    Error::ResponseShape { path, message }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// computes [`SelectionPlan`]s over a [`SchemaShape`]
#[derive(Debug, Clone, Copy)]
pub struct Planner<'a> {
    shape: &'a SchemaShape,
    max_depth: usize,
}

impl<'a> Planner<'a> {
    pub fn new(shape: &'a SchemaShape) -> Self {
        Self {
            shape,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// plan the selection for a return type
    pub fn plan(&self, type_name: &str, selection: &FieldSelection) -> Result<SelectionPlan> {
        let root = match selection {
            FieldSelection::All => self.all(type_name),
            FieldSelection::Minimal => self.minimal(type_name),
            FieldSelection::Custom(paths) if paths.is_empty() => self.minimal(type_name),
            FieldSelection::Custom(paths) => self.custom(type_name, paths)?,
        };
        Ok(SelectionPlan { root })
    }

    fn all(&self, type_name: &str) -> PlanNode {
        let mut stack = Vec::new();
        self.expand(type_name, &mut stack)
    }

    fn expand(&self, type_name: &str, stack: &mut Vec<String>) -> PlanNode {
        let Some(shape) = self.shape.get(type_name) else {
            return PlanNode::Leaf;
        };
        if stack.len() >= self.max_depth {
            return self.minimal(type_name);
        }

        stack.push(type_name.to_string());
        let node = match shape.kind {
            ShapeKind::Object => PlanNode::Object(ObjectPlan {
                type_name: type_name.to_string(),
                fields: self.expand_fields(&shape.fields, stack, &[]),
            }),
            ShapeKind::Interface => {
                let common = self.expand_fields(&shape.fields, stack, &[]);
                let common_names: Vec<&str> = common.iter().map(|f| f.name.as_str()).collect();
                let variants = shape
                    .possible_types
                    .iter()
                    .filter_map(|name| self.expand_variant(name, stack, &common_names))
                    .collect();
                self.polymorphic(type_name, common, variants)
            }
            ShapeKind::Union => {
                let variants = shape
                    .possible_types
                    .iter()
                    .filter_map(|name| self.expand_variant(name, stack, &[]))
                    .collect();
                self.polymorphic(type_name, Vec::new(), variants)
            }
        };
        stack.pop();
        node
    }

    fn expand_variant(
        &self,
        type_name: &str,
        stack: &mut Vec<String>,
        exclude: &[&str],
    ) -> Option<ObjectPlan> {
        let shape = self.shape.get(type_name)?;
        let fields = if stack.iter().any(|t| t == type_name) || stack.len() >= self.max_depth {
            identifier_fields(shape)
        } else {
            stack.push(type_name.to_string());
            let fields = self.expand_fields(&shape.fields, stack, exclude);
            stack.pop();
            fields
        };
        if fields.is_empty() {
            return None;
        }
        Some(ObjectPlan {
            type_name: type_name.to_string(),
            fields,
        })
    }

    fn expand_fields(
        &self,
        fields: &[FieldShape],
        stack: &mut Vec<String>,
        exclude: &[&str],
    ) -> Vec<FieldPlan> {
        let mut out = Vec::new();
        for field in fields {
            if field.required_arguments || exclude.contains(&field.name.as_str()) {
                continue;
            }
            let node = if !self.shape.is_composite(&field.type_name) {
                PlanNode::Leaf
            } else if stack.iter().any(|t| *t == field.type_name) {
                self.minimal(&field.type_name)
            } else {
                self.expand(&field.type_name, stack)
            };
            out.push(FieldPlan::new(field.name.clone(), node));
        }
        if out.is_empty() && exclude.is_empty() {
            out.push(FieldPlan::leaf(TYPENAME));
        }
        out
    }

    fn minimal(&self, type_name: &str) -> PlanNode {
        let Some(shape) = self.shape.get(type_name) else {
            return PlanNode::Leaf;
        };
        match shape.kind {
            ShapeKind::Object => PlanNode::Object(ObjectPlan {
                type_name: type_name.to_string(),
                fields: self.minimal_fields(shape),
            }),
            ShapeKind::Interface | ShapeKind::Union => {
                let variants = if shape.kind == ShapeKind::Union {
                    shape
                        .possible_types
                        .iter()
                        .filter_map(|name| {
                            let fields = identifier_fields(self.shape.get(name)?);
                            (!fields.is_empty()).then(|| ObjectPlan {
                                type_name: name.clone(),
                                fields,
                            })
                        })
                        .collect()
                } else {
                    Vec::new()
                };
                self.polymorphic(type_name, identifier_fields(shape), variants)
            }
        }
    }

    /// aliases fragment fields that would not merge with their siblings
    fn polymorphic(
        &self,
        type_name: &str,
        common: Vec<FieldPlan>,
        mut variants: Vec<ObjectPlan>,
    ) -> PlanNode {
        let conflicts = self.shape.conflicting_fields(type_name);
        for variant in &mut variants {
            for field in &mut variant.fields {
                if conflicts.contains(&field.name) {
                    field.alias = Some(variant_alias(&variant.type_name, &field.name));
                }
            }
        }
        PlanNode::Polymorphic(PolymorphicPlan {
            type_name: type_name.to_string(),
            common,
            variants,
        })
    }

    fn minimal_fields(&self, shape: &TypeShape) -> Vec<FieldPlan> {
        let ids = identifier_fields(shape);
        if !ids.is_empty() {
            return ids;
        }
        let leaves: Vec<FieldPlan> = shape
            .fields
            .iter()
            .filter(|f| !f.required_arguments && !self.shape.is_composite(&f.type_name))
            .map(|f| FieldPlan::leaf(&f.name))
            .collect();
        if leaves.is_empty() {
            vec![FieldPlan::leaf(TYPENAME)]
        } else {
            leaves
        }
    }

    fn custom(&self, type_name: &str, paths: &[String]) -> Result<PlanNode> {
        let mut tree = PathTree::default();
        for path in paths {
            self.validate_path(type_name, path)?;
            tree.insert(path);
        }
        Ok(self.build_custom(type_name, &tree))
    }

    fn validate_path(&self, root: &str, path: &str) -> Result<()> {
        let mut current = root.to_string();
        for segment in path.split('.') {
            let invalid = |type_name: &str| Error::InvalidFieldPath {
                path: path.to_string(),
                segment: segment.to_string(),
                type_name: type_name.to_string(),
            };
            let Some(shape) = self.shape.get(&current) else {
                return Err(invalid(&current));
            };
            if segment == TYPENAME {
                current = TYPENAME.to_string();
                continue;
            }
            let next = match shape.kind {
                ShapeKind::Object => shape.field(segment).map(|f| f.type_name.clone()),
                ShapeKind::Interface => shape
                    .field(segment)
                    .map(|f| f.type_name.clone())
                    .or_else(|| shape.has_possible_type(segment).then(|| segment.to_string())),
                ShapeKind::Union => shape
                    .has_possible_type(segment)
                    .then(|| segment.to_string()),
            };
            match next {
                Some(next) => current = next,
                None => return Err(invalid(&current)),
            }
        }
        Ok(())
    }

    fn build_custom(&self, type_name: &str, tree: &PathTree) -> PlanNode {
        let Some(shape) = self.shape.get(type_name) else {
            return PlanNode::Leaf;
        };
        if tree.children.is_empty() {
            return self.minimal(type_name);
        }
        match shape.kind {
            ShapeKind::Object => PlanNode::Object(ObjectPlan {
                type_name: type_name.to_string(),
                fields: self.custom_fields(shape, tree),
            }),
            ShapeKind::Interface | ShapeKind::Union => {
                let variants = tree
                    .children
                    .iter()
                    .filter(|(key, _)| shape.field(key).is_none() && shape.has_possible_type(key))
                    .filter_map(|(key, sub)| {
                        let variant = self.shape.get(key)?;
                        let fields = if sub.children.is_empty() {
                            self.minimal_fields(variant)
                        } else {
                            self.custom_fields(variant, sub)
                        };
                        Some(ObjectPlan {
                            type_name: key.clone(),
                            fields,
                        })
                    })
                    .collect();
                self.polymorphic(type_name, self.custom_fields(shape, tree), variants)
            }
        }
    }

    fn custom_fields(&self, shape: &TypeShape, tree: &PathTree) -> Vec<FieldPlan> {
        let mut out = Vec::new();
        if tree.children.contains_key(TYPENAME) {
            out.push(FieldPlan::leaf(TYPENAME));
        }
        for field in &shape.fields {
            if field.required_arguments {
                continue;
            }
            let Some(sub) = tree.children.get(&field.name) else {
                continue;
            };
            let node = if self.shape.is_composite(&field.type_name) {
                self.build_custom(&field.type_name, sub)
            } else {
                PlanNode::Leaf
            };
            out.push(FieldPlan::new(field.name.clone(), node));
        }
        out
    }
}

fn identifier_fields(shape: &TypeShape) -> Vec<FieldPlan> {
    shape
        .fields
        .iter()
        .filter(|f| f.identifier && !f.required_arguments)
        .map(|f| FieldPlan::leaf(&f.name))
        .collect()
}

#[derive(Debug, Default)]
struct PathTree {
    children: BTreeMap<String, PathTree>,
}

impl PathTree {
    fn insert(&mut self, path: &str) {
        let mut node = self;
        for segment in path.split('.') {
            node = node.children.entry(segment.to_string()).or_default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(name: &str, type_name: &str) -> FieldShape {
        FieldShape {
            name: name.to_string(),
            type_name: type_name.to_string(),
            type_ref: type_name.to_string(),
            identifier: name == "id",
            required_arguments: false,
        }
    }

    fn typed(name: &str, type_name: &str, type_ref: &str) -> FieldShape {
        FieldShape {
            type_ref: type_ref.to_string(),
            ..field(name, type_name)
        }
    }

    fn outcome_shape() -> SchemaShape {
        let mut types = BTreeMap::new();
        types.insert(
            "Ok".to_string(),
            object(vec![typed("id", "ID", "ID!"), typed("value", "Int", "Int")]),
        );
        types.insert(
            "Failed".to_string(),
            object(vec![
                typed("code", "String", "String!"),
                typed("value", "String", "String"),
            ]),
        );
        types.insert(
            "Outcome".to_string(),
            TypeShape {
                kind: ShapeKind::Union,
                fields: vec![],
                possible_types: vec!["Failed".to_string(), "Ok".to_string()],
            },
        );
        SchemaShape { types }
    }

    fn object(fields: Vec<FieldShape>) -> TypeShape {
        TypeShape {
            kind: ShapeKind::Object,
            fields,
            possible_types: vec![],
        }
    }

    fn shape() -> SchemaShape {
        let mut types = BTreeMap::new();
        types.insert(
            "User".to_string(),
            object(vec![
                field("id", "ID"),
                field("name", "String"),
                field("profile", "Profile"),
                field("friends", "User"),
            ]),
        );
        types.insert(
            "Profile".to_string(),
            object(vec![field("email", "String"), field("owner", "User")]),
        );
        types.insert(
            "Team".to_string(),
            object(vec![field("id", "ID"), field("title", "String")]),
        );
        types.insert(
            "SearchResult".to_string(),
            TypeShape {
                kind: ShapeKind::Union,
                fields: vec![],
                possible_types: vec!["Team".to_string(), "User".to_string()],
            },
        );
        types.insert(
            "Node".to_string(),
            TypeShape {
                kind: ShapeKind::Interface,
                fields: vec![field("id", "ID")],
                possible_types: vec!["Team".to_string(), "User".to_string()],
            },
        );
        SchemaShape { types }
    }

    #[test]
    fn test_minimal_selects_identifier_only() {
        let shape = shape();
        let plan = Planner::new(&shape)
            .plan("User", &FieldSelection::Minimal)
            .unwrap();
        assert_eq!(plan.render(), "{ id }");
    }

    #[test]
    fn test_minimal_falls_back_to_leaf_fields() {
        let shape = shape();
        let plan = Planner::new(&shape)
            .plan("Profile", &FieldSelection::Minimal)
            .unwrap();
        assert_eq!(plan.render(), "{ email }");
    }

    #[test]
    fn test_minimal_never_empty() {
        let mut shape = shape();
        shape
            .types
            .insert("Wrapper".to_string(), object(vec![field("user", "User")]));
        let plan = Planner::new(&shape)
            .plan("Wrapper", &FieldSelection::Minimal)
            .unwrap();
        assert_eq!(plan.render(), "{ __typename }");
    }

    #[test]
    fn test_all_truncates_cycles() {
        let shape = shape();
        let plan = Planner::new(&shape).plan("User", &FieldSelection::All).unwrap();
        assert_eq!(
            plan.render(),
            "{ id name profile { email owner { id } } friends { id } }"
        );
    }

    #[test]
    fn test_all_respects_max_depth() {
        let shape = shape();
        let plan = Planner::new(&shape)
            .with_max_depth(1)
            .plan("User", &FieldSelection::All)
            .unwrap();
        assert_eq!(plan.render(), "{ id name profile { email } friends { id } }");
    }

    #[test]
    fn test_all_skips_fields_with_required_arguments() {
        let mut shape = shape();
        shape.types.insert(
            "Query".to_string(),
            object(vec![
                FieldShape {
                    required_arguments: true,
                    ..field("lookup", "String")
                },
                field("id", "ID"),
            ]),
        );
        let plan = Planner::new(&shape).plan("Query", &FieldSelection::All).unwrap();
        assert_eq!(plan.render(), "{ id }");
    }

    #[test]
    fn test_union_plans_carry_discriminator() {
        let shape = shape();
        let planner = Planner::new(&shape);
        let minimal = planner
            .plan("SearchResult", &FieldSelection::Minimal)
            .unwrap();
        assert_eq!(
            minimal.render(),
            "{ __typename ... on Team { id } ... on User { id } }"
        );

        let all = planner.plan("SearchResult", &FieldSelection::All).unwrap();
        assert_eq!(
            all.render(),
            "{ __typename ... on Team { id title } ... on User { id name profile { email owner { id } } friends { id } } }"
        );
    }

    #[test]
    fn test_interface_all_excludes_common_fields_from_variants() {
        let shape = shape();
        let plan = Planner::new(&shape).plan("Node", &FieldSelection::All).unwrap();
        assert_eq!(
            plan.render(),
            "{ __typename id ... on Team { title } ... on User { name profile { email owner { id } } friends { id } } }"
        );
    }

    #[test]
    fn test_conflicting_variant_fields_are_aliased() {
        let shape = outcome_shape();
        let planner = Planner::new(&shape);
        let all = planner.plan("Outcome", &FieldSelection::All).unwrap();
        assert_eq!(
            all.render(),
            "{ __typename ... on Failed { code value_Failed: value } ... on Ok { id value_Ok: value } }"
        );
        all.check(&json!({"__typename": "Ok", "id": "1", "value_Ok": 3}))
            .unwrap();
        let err = all
            .check(&json!({"__typename": "Ok", "id": "1", "value": 3}))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ResponseShape { message, .. } if message.contains("value_Ok")
        ));

        let custom = planner
            .plan("Outcome", &FieldSelection::custom(["Ok.value"]))
            .unwrap();
        assert_eq!(
            custom.render(),
            "{ __typename ... on Ok { value_Ok: value } }"
        );
    }

    #[test]
    fn test_nullability_difference_conflicts() {
        let mut shape = outcome_shape();
        shape.types.insert(
            "Failed".to_string(),
            object(vec![typed("id", "ID", "ID"), typed("value", "Int", "Int")]),
        );
        assert_eq!(
            shape.conflicting_fields("Outcome"),
            BTreeSet::from(["id".to_string()])
        );
        let minimal = Planner::new(&shape)
            .plan("Outcome", &FieldSelection::Minimal)
            .unwrap();
        assert_eq!(
            minimal.render(),
            "{ __typename ... on Failed { id_Failed: id } ... on Ok { id_Ok: id } }"
        );
        assert_eq!(
            shape.variant_aliases("Ok"),
            BTreeMap::from([("id".to_string(), "id_Ok".to_string())])
        );
    }

    #[test]
    fn test_mergeable_variant_fields_keep_their_names() {
        let shape = shape();
        assert!(shape.conflicting_fields("SearchResult").is_empty());
        assert!(shape.conflicting_fields("Node").is_empty());
        assert!(shape.variant_aliases("User").is_empty());
    }

    #[test]
    fn test_custom_paths() {
        let shape = shape();
        let plan = Planner::new(&shape)
            .plan(
                "User",
                &FieldSelection::custom(["name", "profile.email", "friends"]),
            )
            .unwrap();
        assert_eq!(plan.render(), "{ name profile { email } friends { id } }");
    }

    #[test]
    fn test_custom_fragment_paths() {
        let shape = shape();
        let plan = Planner::new(&shape)
            .plan("SearchResult", &FieldSelection::custom(["User.name", "Team"]))
            .unwrap();
        assert_eq!(
            plan.render(),
            "{ __typename ... on Team { id } ... on User { name } }"
        );
    }

    #[test]
    fn test_custom_rejects_first_invalid_segment() {
        let shape = shape();
        let err = Planner::new(&shape)
            .plan("User", &FieldSelection::custom(["profile.phone.number"]))
            .unwrap_err();
        match err {
            Error::InvalidFieldPath {
                segment, type_name, ..
            } => {
                assert_eq!(segment, "phone");
                assert_eq!(type_name, "Profile");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = Planner::new(&shape)
            .plan("User", &FieldSelection::custom(["name.first"]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFieldPath { segment, .. } if segment == "first"));
    }

    #[test]
    fn test_empty_custom_is_minimal() {
        let shape = shape();
        let plan = Planner::new(&shape)
            .plan("User", &FieldSelection::Custom(vec![]))
            .unwrap();
        assert_eq!(plan.render(), "{ id }");
    }

    #[test]
    fn test_leaf_return_type_renders_nothing() {
        let shape = shape();
        let plan = Planner::new(&shape).plan("String", &FieldSelection::All).unwrap();
        assert!(plan.root.is_leaf());
        assert_eq!(plan.render(), "");
    }

    #[test]
    fn test_check_accepts_matching_response() {
        let shape = shape();
        let plan = Planner::new(&shape)
            .plan("User", &FieldSelection::custom(["id", "profile.email"]))
            .unwrap();
        plan.check(&json!({"id": "1", "profile": null})).unwrap();
        plan.check(&json!([{"id": "1", "profile": {"email": "a@b"}}]))
            .unwrap();
    }

    #[test]
    fn test_check_reports_missing_field_path() {
        let shape = shape();
        let plan = Planner::new(&shape)
            .plan("User", &FieldSelection::custom(["id", "profile.email"]))
            .unwrap();
        let err = plan
            .check(&json!({"id": "1", "profile": {}}))
            .unwrap_err();
        assert!(matches!(err, Error::ResponseShape { path, .. } if path == "profile"));
    }

    #[test]
    fn test_check_requires_discriminator() {
        let shape = shape();
        let plan = Planner::new(&shape)
            .plan("SearchResult", &FieldSelection::Minimal)
            .unwrap();
        plan.check(&json!({"__typename": "Team", "id": "t"})).unwrap();
        assert!(plan.check(&json!({"id": "t"})).is_err());
    }

    #[test]
    fn test_plan_json_roundtrip_keeps_text() {
        let shape = shape();
        let plan = Planner::new(&shape).plan("Node", &FieldSelection::All).unwrap();
        let restored = SelectionPlan::from_json(&plan.to_json().unwrap()).unwrap();
        assert_eq!(restored.render(), plan.render());
        let shape_restored = SchemaShape::from_json(&shape.to_json().unwrap()).unwrap();
        assert_eq!(shape_restored, shape);
    }
}
