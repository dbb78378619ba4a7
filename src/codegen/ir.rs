//! schema intermediate representation
//!
//! a [`Document`] owns every type definition and operation of one schema.
//! references between definitions are type names resolved through the
//! document, so the ir can be filtered or renamed without dangling pointers
//! as long as [`Document::validate`] passes afterwards.

use super::naming;
use super::scalars::{self, ScalarMapping};
use crate::error::{Error, Result};
use crate::operation::OperationKind;
use crate::selection::{FieldShape, SchemaShape, ShapeKind, TypeShape};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// one level of type wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    NonNull,
    List,
}

/// reference to a named type with its list and non-null wrapping.
///
/// modifiers are stored innermost first: `[Foo!]` is `Foo` + `[NonNull, List]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub name: String,
    pub modifiers: Vec<Modifier>,
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifiers: Vec::new(),
        }
    }

    pub fn non_null(mut self) -> Self {
        self.modifiers.push(Modifier::NonNull);
        self
    }

    pub fn list(mut self) -> Self {
        self.modifiers.push(Modifier::List);
        self
    }

    /// true when the outermost level accepts null
    pub fn is_nullable(&self) -> bool {
        self.modifiers.last() != Some(&Modifier::NonNull)
    }

    pub fn list_depth(&self) -> usize {
        self.modifiers
            .iter()
            .filter(|m| **m == Modifier::List)
            .count()
    }

    pub fn is_list(&self) -> bool {
        self.list_depth() > 0
    }

    /// graphql type syntax, e.g. `[[Foo]!]!`
    pub fn to_graphql(&self) -> String {
        let mut out = self.name.clone();
        for modifier in &self.modifiers {
            match modifier {
                Modifier::NonNull => out.push('!'),
                Modifier::List => out = format!("[{out}]"),
            }
        }
        out
    }

    /// rust type for this reference.
    ///
    /// `leaf` is the rust type of the named type. `boxed` wraps a leaf that
    /// is not inside a list. `force_optional` makes the outermost level an
    /// `Option` regardless of nullability.
    pub fn rust_type(&self, leaf: &str, boxed: bool, force_optional: bool) -> String {
        let leaf = if boxed && !self.is_list() {
            format!("Box<{leaf}>")
        } else {
            leaf.to_string()
        };
        let inner = wrap_rust(&self.modifiers, &leaf);
        if force_optional && !self.is_nullable() {
            format!("Option<{inner}>")
        } else {
            inner
        }
    }
}

fn wrap_rust(modifiers: &[Modifier], leaf: &str) -> String {
    let (non_null, rest) = match modifiers.split_last() {
        Some((Modifier::NonNull, rest)) => (true, rest),
        _ => (false, modifiers),
    };
    let inner = match rest.split_last() {
        Some((Modifier::List, rest)) => format!("Vec<{}>", wrap_rust(rest, leaf)),
        _ => leaf.to_string(),
    };
    if non_null {
        inner
    } else {
        format!("Option<{inner}>")
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_graphql())
    }
}

/// field or operation argument
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub ty: TypeRef,
    /// default in graphql literal syntax
    pub default_value: Option<String>,
    pub description: Option<String>,
}

impl Argument {
    /// non-null without a default
    pub fn is_required(&self) -> bool {
        !self.ty.is_nullable() && self.default_value.is_none()
    }
}

/// field of an object, interface or input type
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: TypeRef,
    pub arguments: Vec<Argument>,
    /// input fields only
    pub default_value: Option<String>,
    pub description: Option<String>,
    pub deprecation: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            arguments: Vec::new(),
            default_value: None,
            description: None,
            deprecation: None,
        }
    }

    pub fn has_required_arguments(&self) -> bool {
        self.arguments.iter().any(Argument::is_required)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub name: String,
    pub description: Option<String>,
    pub deprecation: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Object {
        fields: Vec<Field>,
        interfaces: Vec<String>,
    },
    Input {
        fields: Vec<Field>,
    },
    Enum {
        values: Vec<EnumValue>,
    },
    Interface {
        fields: Vec<Field>,
        /// concrete implementors, sorted
        possible_types: Vec<String>,
    },
    Union {
        possible_types: Vec<String>,
    },
    Scalar {
        mapping: ScalarMapping,
        /// no mapping was registered
        opaque: bool,
    },
}

impl TypeKind {
    pub fn label(&self) -> &'static str {
        match self {
            TypeKind::Object { .. } => "object",
            TypeKind::Input { .. } => "input",
            TypeKind::Enum { .. } => "enum",
            TypeKind::Interface { .. } => "interface",
            TypeKind::Union { .. } => "union",
            TypeKind::Scalar { .. } => "scalar",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub name: String,
    pub description: Option<String>,
    pub kind: TypeKind,
}

impl TypeDef {
    pub fn fields(&self) -> &[Field] {
        match &self.kind {
            TypeKind::Object { fields, .. }
            | TypeKind::Input { fields }
            | TypeKind::Interface { fields, .. } => fields,
            _ => &[],
        }
    }

    pub fn fields_mut(&mut self) -> Option<&mut Vec<Field>> {
        match &mut self.kind {
            TypeKind::Object { fields, .. }
            | TypeKind::Input { fields }
            | TypeKind::Interface { fields, .. } => Some(fields),
            _ => None,
        }
    }

    pub fn possible_types(&self) -> &[String] {
        match &self.kind {
            TypeKind::Interface { possible_types, .. } | TypeKind::Union { possible_types } => {
                possible_types
            }
            _ => &[],
        }
    }

    /// object, interface or union
    pub fn is_composite(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Object { .. } | TypeKind::Interface { .. } | TypeKind::Union { .. }
        )
    }

    pub fn is_polymorphic(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Interface { .. } | TypeKind::Union { .. }
        )
    }

    /// every type name this definition refers to, with the referring path
    pub fn references(&self) -> Vec<(String, &str)> {
        let mut out = Vec::new();
        for field in self.fields() {
            out.push((format!("{}.{}", self.name, field.name), field.ty.name.as_str()));
            for arg in &field.arguments {
                out.push((
                    format!("{}.{}({})", self.name, field.name, arg.name),
                    arg.ty.name.as_str(),
                ));
            }
        }
        for member in self.possible_types() {
            out.push((self.name.clone(), member.as_str()));
        }
        if let TypeKind::Object { interfaces, .. } = &self.kind {
            for iface in interfaces {
                out.push((self.name.clone(), iface.as_str()));
            }
        }
        out
    }
}

/// one schema field on the way from a root type to an operation
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub field: String,
    pub arguments: Vec<Argument>,
}

/// a query or mutation field reachable from a root type.
///
/// `path` runs from the root field to the operation field itself, so a
/// plain root field has a path of length one.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub name: String,
    pub kind: OperationKind,
    pub return_type: TypeRef,
    pub description: Option<String>,
    pub deprecation: Option<String>,
    pub path: Vec<PathSegment>,
}

impl Operation {
    /// arguments of the operation field
    pub fn arguments(&self) -> &[Argument] {
        self.path
            .last()
            .map(|segment| segment.arguments.as_slice())
            .unwrap_or(&[])
    }

    /// schema field names of the enclosing namespace fields
    pub fn structural_path(&self) -> impl Iterator<Item = &str> {
        let len = self.path.len().saturating_sub(1);
        self.path[..len].iter().map(|s| s.field.as_str())
    }

    /// `Query.policy.firewall.addRule` style label
    pub fn label(&self) -> String {
        let fields: Vec<&str> = self.path.iter().map(|s| s.field.as_str()).collect();
        format!("{}.{}", self.kind.keyword(), fields.join("."))
    }
}

/// non-fatal finding recorded during generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// custom scalar without a registered mapping
    OpaqueScalar { name: String },
    /// root field skipped (e.g. subscriptions)
    SkippedOperation { name: String, reason: String },
    /// field referring to a type that is not emitted as a model
    UntypedField { field: String, type_name: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::OpaqueScalar { name } => {
                write!(f, "scalar `{name}` has no mapping, treating it as String")
            }
            Warning::SkippedOperation { name, reason } => {
                write!(f, "skipped operation `{name}`: {reason}")
            }
            Warning::UntypedField { field, type_name } => write!(
                f,
                "field `{field}` refers to `{type_name}`, emitted as serde_json::Value"
            ),
        }
    }
}

/// the whole schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub types: BTreeMap<String, TypeDef>,
    pub operations: Vec<Operation>,
    /// root and namespace types; they shape the client and are not models
    pub operation_types: BTreeSet<String>,
    /// definition name (or `Type.field` for extensions) to source file
    pub sources: BTreeMap<String, String>,
    pub warnings: Vec<Warning>,
}

impl Document {
    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    pub fn is_composite(&self, name: &str) -> bool {
        self.types.get(name).is_some_and(TypeDef::is_composite)
    }

    /// types emitted as model structs or enums
    pub fn model_types(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.values().filter(|t| {
            !self.operation_types.contains(&t.name)
                && matches!(
                    t.kind,
                    TypeKind::Object { .. }
                        | TypeKind::Input { .. }
                        | TypeKind::Interface { .. }
                        | TypeKind::Union { .. }
                )
        })
    }

    pub fn enums(&self) -> impl Iterator<Item = &TypeDef> {
        self.types
            .values()
            .filter(|t| matches!(t.kind, TypeKind::Enum { .. }))
    }

    pub fn scalars(&self) -> impl Iterator<Item = &TypeDef> {
        self.types
            .values()
            .filter(|t| matches!(t.kind, TypeKind::Scalar { .. }))
    }

    fn unresolved(&self, type_name: &str, referenced_by: String, owner: &str) -> Error {
        Error::UnresolvedType {
            type_name: type_name.to_string(),
            referenced_by,
            source_file: self.sources.get(owner).cloned(),
        }
    }

    /// check references and normalized names.
    ///
    /// run after the builder and again after pre-hooks, which may have
    /// edited the document.
    pub fn validate(&self) -> Result<()> {
        for def in self.types.values() {
            for (referenced_by, target) in def.references() {
                if !self.types.contains_key(target) {
                    return Err(self.unresolved(target, referenced_by, &def.name));
                }
            }
        }

        for op in &self.operations {
            let root = op.label();
            if !self.types.contains_key(&op.return_type.name) {
                return Err(self.unresolved(&op.return_type.name, root, &op.name));
            }
            for segment in &op.path {
                for arg in &segment.arguments {
                    if !self.types.contains_key(&arg.ty.name) {
                        return Err(self.unresolved(
                            &arg.ty.name,
                            format!("{root}({})", arg.name),
                            &op.name,
                        ));
                    }
                }
            }
        }

        self.check_collisions()
    }

    fn check_collisions(&self) -> Result<()> {
        let emitted: Vec<&TypeDef> = self
            .types
            .values()
            .filter(|t| {
                !self.operation_types.contains(&t.name)
                    && !(matches!(t.kind, TypeKind::Scalar { .. }) && scalars::is_builtin(&t.name))
            })
            .collect();

        check_unique(
            "type names",
            emitted.iter().map(|t| t.name.as_str()),
            naming::type_name,
        )?;
        check_unique(
            "model modules",
            self.model_types().map(|t| t.name.as_str()),
            naming::module_name,
        )?;

        for def in emitted {
            let scope = format!("type `{}`", def.name);
            match &def.kind {
                TypeKind::Enum { values } => {
                    check_unique(
                        &scope,
                        values.iter().map(|v| v.name.as_str()),
                        naming::variant_name,
                    )?;
                }
                TypeKind::Union { possible_types }
                | TypeKind::Interface { possible_types, .. } => {
                    check_unique(
                        &scope,
                        possible_types
                            .iter()
                            .map(String::as_str)
                            .chain(std::iter::once(FALLBACK_VARIANT)),
                        naming::type_name,
                    )?;
                    check_unique(
                        &scope,
                        def.fields().iter().map(|f| f.name.as_str()),
                        naming::field_name,
                    )?;
                }
                _ => {
                    check_unique(
                        &scope,
                        def.fields().iter().map(|f| f.name.as_str()),
                        naming::field_name,
                    )?;
                }
            }
        }
        Ok(())
    }

    /// composite-type structure for the selection planner
    pub fn shape(&self, identifier: &Regex) -> SchemaShape {
        let mut types = BTreeMap::new();
        for def in self.types.values() {
            let kind = match def.kind {
                TypeKind::Object { .. } => ShapeKind::Object,
                TypeKind::Interface { .. } => ShapeKind::Interface,
                TypeKind::Union { .. } => ShapeKind::Union,
                _ => continue,
            };
            let fields = def
                .fields()
                .iter()
                .map(|field| FieldShape {
                    name: field.name.clone(),
                    type_name: field.ty.name.clone(),
                    type_ref: field.ty.to_graphql(),
                    identifier: identifier.is_match(&field.name)
                        && !self.is_composite(&field.ty.name),
                    required_arguments: field.has_required_arguments(),
                })
                .collect();
            types.insert(
                def.name.clone(),
                TypeShape {
                    kind,
                    fields,
                    possible_types: def.possible_types().to_vec(),
                },
            );
        }
        SchemaShape { types }
    }
}

/// variant name reserved for unknown `__typename` values
pub const FALLBACK_VARIANT: &str = "Unrecognized";

fn check_unique<'a>(
    scope: &str,
    names: impl Iterator<Item = &'a str>,
    normalize: fn(&str) -> String,
) -> Result<()> {
    let mut seen: BTreeMap<String, &str> = BTreeMap::new();
    for name in names {
        let normalized = normalize(name);
        if let Some(first) = seen.insert(normalized.clone(), name) {
            return Err(Error::NameCollision {
                scope: scope.to_string(),
                first: first.to_string(),
                second: name.to_string(),
                normalized,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(name: &str) -> TypeDef {
        TypeDef {
            name: name.to_string(),
            description: None,
            kind: TypeKind::Scalar {
                mapping: ScalarMapping::new("String"),
                opaque: false,
            },
        }
    }

    fn object(name: &str, fields: Vec<Field>) -> TypeDef {
        TypeDef {
            name: name.to_string(),
            description: None,
            kind: TypeKind::Object {
                fields,
                interfaces: vec![],
            },
        }
    }

    fn document(defs: Vec<TypeDef>) -> Document {
        Document {
            types: defs.into_iter().map(|d| (d.name.clone(), d)).collect(),
            ..Document::default()
        }
    }

    #[test]
    fn test_type_ref_round_trips_nesting() {
        let ty = TypeRef::named("Foo").list().non_null().list().non_null();
        assert_eq!(ty.to_graphql(), "[[Foo]!]!");
        assert!(!ty.is_nullable());
        assert_eq!(ty.list_depth(), 2);

        let ty = TypeRef::named("Foo").non_null().list();
        assert_eq!(ty.to_graphql(), "[Foo!]");
        assert!(ty.is_nullable());
    }

    #[test]
    fn test_rust_type_mapping() {
        let ty = TypeRef::named("Foo").non_null().list();
        assert_eq!(ty.rust_type("Foo", true, false), "Option<Vec<Foo>>");

        let ty = TypeRef::named("Foo").list().non_null();
        assert_eq!(ty.rust_type("Foo", false, false), "Vec<Option<Foo>>");
        assert_eq!(ty.rust_type("Foo", false, true), "Option<Vec<Option<Foo>>>");

        let ty = TypeRef::named("Foo").non_null();
        assert_eq!(ty.rust_type("Foo", true, true), "Option<Box<Foo>>");
        assert_eq!(ty.rust_type("Foo", true, false), "Box<Foo>");
    }

    #[test]
    fn test_validate_reports_unresolved_reference() {
        let mut doc = document(vec![
            scalar("ID"),
            object(
                "User",
                vec![
                    Field::new("id", TypeRef::named("ID")),
                    Field::new("profile", TypeRef::named("Profile")),
                ],
            ),
        ]);
        doc.sources
            .insert("User".to_string(), "users.graphql".to_string());

        let err = doc.validate().unwrap_err();
        match err {
            Error::UnresolvedType {
                type_name,
                referenced_by,
                source_file,
            } => {
                assert_eq!(type_name, "Profile");
                assert_eq!(referenced_by, "User.profile");
                assert_eq!(source_file.as_deref(), Some("users.graphql"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_reports_field_collision() {
        let doc = document(vec![
            scalar("String"),
            object(
                "User",
                vec![
                    Field::new("firstName", TypeRef::named("String")),
                    Field::new("first_name", TypeRef::named("String")),
                ],
            ),
        ]);
        let err = doc.validate().unwrap_err();
        assert!(matches!(
            err,
            Error::NameCollision { normalized, .. } if normalized == "first_name"
        ));
    }

    #[test]
    fn test_validate_reports_enum_value_collision() {
        let doc = document(vec![TypeDef {
            name: "Status".to_string(),
            description: None,
            kind: TypeKind::Enum {
                values: ["IN_PROGRESS", "InProgress"]
                    .iter()
                    .map(|name| EnumValue {
                        name: name.to_string(),
                        description: None,
                        deprecation: None,
                    })
                    .collect(),
            },
        }]);
        assert!(matches!(
            doc.validate(),
            Err(Error::NameCollision { .. })
        ));
    }

    #[test]
    fn test_shape_marks_identifiers() {
        let doc = document(vec![
            scalar("ID"),
            object(
                "User",
                vec![
                    Field::new("id", TypeRef::named("ID").non_null()),
                    Field::new("friend", TypeRef::named("User")),
                ],
            ),
        ]);
        let shape = doc.shape(&Regex::new("^id$").unwrap());
        let user = shape.get("User").unwrap();
        assert!(user.fields[0].identifier);
        assert!(!user.fields[1].identifier);
        assert!(!shape.is_composite("ID"));
    }
}
