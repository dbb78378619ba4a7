//! ir construction from merged sdl

use super::ir::{
    Argument, Document, EnumValue, Field, Operation, PathSegment, TypeDef, TypeKind, TypeRef,
    Warning,
};
use super::loader::LoadedSchema;
use super::scalars::{self, ScalarRegistry, BUILTIN_SCALARS};
use crate::error::{Error, Result};
use crate::operation::OperationKind;
use graphql_parser::schema::{self as ast, Definition, TypeDefinition, TypeExtension, Value};
use std::collections::BTreeSet;

/// knobs for [`IrBuilder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// object types whose name ends with one of these group operations
    pub namespace_suffixes: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            namespace_suffixes: vec!["Queries".to_string(), "Mutations".to_string()],
        }
    }
}

/// builds a [`Document`] from a [`LoadedSchema`]
#[derive(Debug)]
pub struct IrBuilder<'r> {
    scalars: &'r ScalarRegistry,
    options: BuildOptions,
}

#[derive(Debug, Default)]
struct Roots {
    query: Option<String>,
    mutation: Option<String>,
    subscription: Option<String>,
}

impl<'r> IrBuilder<'r> {
    pub fn new(scalars: &'r ScalarRegistry, options: BuildOptions) -> Self {
        Self { scalars, options }
    }

    pub fn build(&self, schema: &LoadedSchema) -> Result<Document> {
        let parsed =
            graphql_parser::parse_schema::<String>(&schema.text).map_err(|err| Error::Parse {
                source_name: "<merged schema>".to_string(),
                message: err.to_string(),
            })?;

        let mut doc = Document {
            sources: schema.sources.clone(),
            ..Document::default()
        };
        for name in BUILTIN_SCALARS {
            let (mapping, _) = self.scalars.resolve(name);
            doc.types.insert(
                name.to_string(),
                TypeDef {
                    name: name.to_string(),
                    description: None,
                    kind: TypeKind::Scalar {
                        mapping,
                        opaque: false,
                    },
                },
            );
        }

        let mut roots = Roots::default();
        let mut extensions = Vec::new();
        for def in &parsed.definitions {
            match def {
                Definition::TypeDefinition(ty) => self.register(&mut doc, ty)?,
                Definition::TypeExtension(ext) => extensions.push(ext),
                Definition::SchemaDefinition(schema) => {
                    roots.query = schema.query.clone();
                    roots.mutation = schema.mutation.clone();
                    roots.subscription = schema.subscription.clone();
                }
                Definition::DirectiveDefinition(_) => {}
            }
        }
        for ext in extensions {
            apply_extension(&mut doc, ext)?;
        }
        link_interfaces(&mut doc);

        self.collect_operations(&mut doc, roots)?;
        doc.validate()?;

        tracing::info!(
            types = doc.types.len(),
            operations = doc.operations.len(),
            "built schema ir"
        );
        Ok(doc)
    }

    fn register(&self, doc: &mut Document, ty: &TypeDefinition<'_, String>) -> Result<()> {
        let def = match ty {
            TypeDefinition::Scalar(s) => {
                if scalars::is_builtin(&s.name) {
                    return Ok(());
                }
                let (mapping, opaque) = self.scalars.resolve(&s.name);
                if opaque {
                    tracing::warn!(scalar = %s.name, "no mapping for custom scalar, using String");
                    doc.warnings.push(Warning::OpaqueScalar {
                        name: s.name.clone(),
                    });
                }
                TypeDef {
                    name: s.name.clone(),
                    description: s.description.clone(),
                    kind: TypeKind::Scalar { mapping, opaque },
                }
            }
            TypeDefinition::Object(o) => TypeDef {
                name: o.name.clone(),
                description: o.description.clone(),
                kind: TypeKind::Object {
                    fields: o.fields.iter().map(field).collect(),
                    interfaces: o.implements_interfaces.clone(),
                },
            },
            TypeDefinition::Interface(i) => TypeDef {
                name: i.name.clone(),
                description: i.description.clone(),
                kind: TypeKind::Interface {
                    fields: i.fields.iter().map(field).collect(),
                    possible_types: Vec::new(),
                },
            },
            TypeDefinition::Union(u) => {
                let mut members = u.types.clone();
                members.sort();
                members.dedup();
                TypeDef {
                    name: u.name.clone(),
                    description: u.description.clone(),
                    kind: TypeKind::Union {
                        possible_types: members,
                    },
                }
            }
            TypeDefinition::Enum(e) => TypeDef {
                name: e.name.clone(),
                description: e.description.clone(),
                kind: TypeKind::Enum {
                    values: e.values.iter().map(enum_value).collect(),
                },
            },
            TypeDefinition::InputObject(i) => TypeDef {
                name: i.name.clone(),
                description: i.description.clone(),
                kind: TypeKind::Input {
                    fields: i.fields.iter().map(input_field).collect(),
                },
            },
        };

        if doc.types.contains_key(&def.name) {
            let file = doc
                .sources
                .get(&def.name)
                .cloned()
                .unwrap_or_else(|| "<schema>".to_string());
            return Err(Error::SchemaConflict {
                name: def.name,
                first: file.clone(),
                second: file,
            });
        }
        doc.types.insert(def.name.clone(), def);
        Ok(())
    }

    fn is_namespace_type(&self, doc: &Document, name: &str) -> bool {
        self.options
            .namespace_suffixes
            .iter()
            .any(|suffix| name.ends_with(suffix.as_str()))
            && matches!(doc.get(name).map(|t| &t.kind), Some(TypeKind::Object { .. }))
    }

    fn collect_operations(&self, doc: &mut Document, roots: Roots) -> Result<()> {
        let explicit = roots.query.is_some() || roots.mutation.is_some();
        let candidates = [
            (roots.query.unwrap_or_else(|| "Query".to_string()), OperationKind::Query),
            (
                roots.mutation.unwrap_or_else(|| "Mutation".to_string()),
                OperationKind::Mutation,
            ),
        ];

        let subscription = roots
            .subscription
            .unwrap_or_else(|| "Subscription".to_string());
        if let Some(TypeKind::Object { fields, .. }) = doc.get(&subscription).map(|t| &t.kind) {
            tracing::debug!(root = %subscription, "skipping subscription root");
            let skipped: Vec<Warning> = fields
                .iter()
                .map(|field| Warning::SkippedOperation {
                    name: format!("subscription.{}", field.name),
                    reason: "subscriptions are not supported".to_string(),
                })
                .collect();
            doc.warnings.extend(skipped);
        }
        if doc.types.contains_key(&subscription) {
            doc.operation_types.insert(subscription);
        }

        for (root, kind) in candidates {
            let fields = match doc.get(&root).map(|t| &t.kind) {
                Some(TypeKind::Object { fields, .. }) => fields.clone(),
                Some(_) => {
                    return Err(Error::Config(format!(
                        "root type `{root}` must be an object type"
                    )))
                }
                None if explicit && kind == OperationKind::Query => {
                    return Err(Error::UnresolvedType {
                        type_name: root,
                        referenced_by: "schema".to_string(),
                        source_file: None,
                    })
                }
                None => continue,
            };
            doc.operation_types.insert(root.clone());

            let mut visiting = BTreeSet::from([root]);
            for f in &fields {
                self.traverse(doc, kind, f, Vec::new(), &mut visiting);
            }
        }
        Ok(())
    }

    fn traverse(
        &self,
        doc: &mut Document,
        kind: OperationKind,
        field: &Field,
        mut path: Vec<PathSegment>,
        visiting: &mut BTreeSet<String>,
    ) {
        path.push(PathSegment {
            field: field.name.clone(),
            arguments: field.arguments.clone(),
        });

        let target = &field.ty.name;
        if !field.ty.is_list()
            && self.is_namespace_type(doc, target)
            && !visiting.contains(target)
        {
            tracing::debug!(namespace = %target, "descending into namespace type");
            doc.operation_types.insert(target.clone());
            visiting.insert(target.clone());
            let children = doc.get(target).map(|t| t.fields().to_vec()).unwrap_or_default();
            for child in &children {
                self.traverse(doc, kind, child, path.clone(), visiting);
            }
            visiting.remove(target);
            return;
        }

        tracing::debug!(operation = %field.name, depth = path.len(), "found operation");
        doc.operations.push(Operation {
            name: field.name.clone(),
            kind,
            return_type: field.ty.clone(),
            description: field.description.clone(),
            deprecation: field.deprecation.clone(),
            path,
        });
    }
}

fn apply_extension(doc: &mut Document, ext: &TypeExtension<'_, String>) -> Result<()> {
    let (name, keyword) = match ext {
        TypeExtension::Scalar(e) => (&e.name, "scalar"),
        TypeExtension::Object(e) => (&e.name, "type"),
        TypeExtension::Interface(e) => (&e.name, "interface"),
        TypeExtension::Union(e) => (&e.name, "union"),
        TypeExtension::Enum(e) => (&e.name, "enum"),
        TypeExtension::InputObject(e) => (&e.name, "input"),
    };
    let Some(def) = doc.types.get_mut(name.as_str()) else {
        return Err(Error::UnresolvedType {
            type_name: name.clone(),
            referenced_by: format!("extend {keyword} {name}"),
            source_file: doc.sources.get(name.as_str()).cloned(),
        });
    };

    match (ext, &mut def.kind) {
        (TypeExtension::Scalar(_), TypeKind::Scalar { .. }) => {}
        (TypeExtension::Object(e), TypeKind::Object { fields, interfaces }) => {
            merge_fields(fields, e.fields.iter().map(field));
            for iface in &e.implements_interfaces {
                if !interfaces.contains(iface) {
                    interfaces.push(iface.clone());
                }
            }
        }
        (TypeExtension::Interface(e), TypeKind::Interface { fields, .. }) => {
            merge_fields(fields, e.fields.iter().map(field));
        }
        (TypeExtension::InputObject(e), TypeKind::Input { fields }) => {
            merge_fields(fields, e.fields.iter().map(input_field));
        }
        (TypeExtension::Enum(e), TypeKind::Enum { values }) => {
            for value in &e.values {
                if !values.iter().any(|v| v.name == value.name) {
                    values.push(enum_value(value));
                }
            }
        }
        (TypeExtension::Union(e), TypeKind::Union { possible_types }) => {
            possible_types.extend(e.types.iter().cloned());
            possible_types.sort();
            possible_types.dedup();
        }
        (_, kind) => {
            return Err(Error::SchemaConflict {
                name: name.clone(),
                first: format!("{} {name}", kind.label()),
                second: format!("extend {keyword} {name}"),
            })
        }
    }
    Ok(())
}

fn merge_fields(fields: &mut Vec<Field>, extra: impl Iterator<Item = Field>) {
    for f in extra {
        if !fields.iter().any(|existing| existing.name == f.name) {
            fields.push(f);
        }
    }
}

fn link_interfaces(doc: &mut Document) {
    let implementations: Vec<(String, String)> = doc
        .types
        .values()
        .filter_map(|t| match &t.kind {
            TypeKind::Object { interfaces, .. } => Some(
                interfaces
                    .iter()
                    .map(|iface| (iface.clone(), t.name.clone()))
                    .collect::<Vec<_>>(),
            ),
            _ => None,
        })
        .flatten()
        .collect();

    for (iface, object) in implementations {
        if let Some(TypeDef {
            kind: TypeKind::Interface { possible_types, .. },
            ..
        }) = doc.types.get_mut(&iface)
        {
            possible_types.push(object);
        }
    }
    for def in doc.types.values_mut() {
        if let TypeKind::Interface { possible_types, .. } = &mut def.kind {
            possible_types.sort();
            possible_types.dedup();
        }
    }
}

fn type_ref(ty: &ast::Type<'_, String>) -> TypeRef {
    match ty {
        ast::Type::NamedType(name) => TypeRef::named(name.clone()),
        ast::Type::ListType(inner) => type_ref(inner).list(),
        ast::Type::NonNullType(inner) => type_ref(inner).non_null(),
    }
}

fn argument(value: &ast::InputValue<'_, String>) -> Argument {
    Argument {
        name: value.name.clone(),
        ty: type_ref(&value.value_type),
        default_value: value.default_value.as_ref().map(render_value),
        description: value.description.clone(),
    }
}

fn field(f: &ast::Field<'_, String>) -> Field {
    Field {
        name: f.name.clone(),
        ty: type_ref(&f.field_type),
        arguments: f.arguments.iter().map(argument).collect(),
        default_value: None,
        description: f.description.clone(),
        deprecation: deprecation(&f.directives),
    }
}

fn input_field(value: &ast::InputValue<'_, String>) -> Field {
    Field {
        name: value.name.clone(),
        ty: type_ref(&value.value_type),
        arguments: Vec::new(),
        default_value: value.default_value.as_ref().map(render_value),
        description: value.description.clone(),
        deprecation: deprecation(&value.directives),
    }
}

fn enum_value(value: &ast::EnumValue<'_, String>) -> EnumValue {
    EnumValue {
        name: value.name.clone(),
        description: value.description.clone(),
        deprecation: deprecation(&value.directives),
    }
}

fn deprecation(directives: &[ast::Directive<'_, String>]) -> Option<String> {
    let directive = directives.iter().find(|d| d.name == "deprecated")?;
    let reason = directive
        .arguments
        .iter()
        .find(|(name, _)| name == "reason")
        .and_then(|(_, value)| match value {
            Value::String(reason) => Some(reason.clone()),
            _ => None,
        });
    Some(reason.unwrap_or_else(|| "deprecated".to_string()))
}

/// graphql literal syntax for a default value
pub(crate) fn render_value(value: &Value<'_, String>) -> String {
    match value {
        Value::Variable(name) => format!("${name}"),
        Value::Int(n) => n.as_i64().map(|n| n.to_string()).unwrap_or_default(),
        Value::Float(f) => {
            let text = f.to_string();
            if text.contains(['.', 'e', 'E']) {
                text
            } else {
                format!("{text}.0")
            }
        }
        Value::String(s) => serde_json::Value::String(s.clone()).to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Enum(e) => e.clone(),
        Value::List(items) => {
            let items: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(entries) => {
            let entries: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("{k}: {}", render_value(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::loader::{merge_fragments, SchemaFile};

    fn build(sdl: &str) -> Result<Document> {
        let loaded = merge_fragments(vec![SchemaFile::new("schema.graphql", sdl)])?;
        let registry = ScalarRegistry::new();
        IrBuilder::new(&registry, BuildOptions::default()).build(&loaded)
    }

    #[test]
    fn test_forward_references_resolve() {
        let doc = build(
            r#"
            type Query { getUser(id: ID!): User }
            type User { id: ID! profile: Profile }
            type Profile { email: String }
            "#,
        )
        .unwrap();
        assert!(doc.types.contains_key("Profile"));
        assert_eq!(doc.operations.len(), 1);
        assert_eq!(doc.operations[0].arguments()[0].name, "id");
        assert!(doc.operation_types.contains("Query"));
    }

    #[test]
    fn test_unresolved_type_names_field_and_file() {
        let err = build("type Query { me: User }\ntype User { profile: Missing }").unwrap_err();
        match err {
            Error::UnresolvedType {
                type_name,
                referenced_by,
                source_file,
            } => {
                assert_eq!(type_name, "Missing");
                assert_eq!(referenced_by, "User.profile");
                assert_eq!(source_file.as_deref(), Some("schema.graphql"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_extensions_merge_into_base_type() {
        let doc = build(
            r#"
            type Query { a: Int }
            extend type Query { b: Int }
            enum Color { RED }
            extend enum Color { GREEN }
            "#,
        )
        .unwrap();
        let names: Vec<&str> = doc.operations.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        match &doc.types["Color"].kind {
            TypeKind::Enum { values } => assert_eq!(values.len(), 2),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_namespace_types_become_paths() {
        let doc = build(
            r#"
            type Mutation { policy(accountId: ID!): PolicyMutations }
            type PolicyMutations { firewall: FirewallMutations }
            type FirewallMutations { addRule(port: Int!): Rule }
            type Rule { id: ID! }
            type Query { rule(id: ID!): Rule }
            "#,
        )
        .unwrap();
        let op = doc
            .operations
            .iter()
            .find(|o| o.name == "addRule")
            .unwrap();
        assert_eq!(op.kind, OperationKind::Mutation);
        let path: Vec<&str> = op.path.iter().map(|s| s.field.as_str()).collect();
        assert_eq!(path, vec!["policy", "firewall", "addRule"]);
        assert_eq!(op.path[0].arguments[0].name, "accountId");
        assert!(doc.operation_types.contains("PolicyMutations"));
        assert_eq!(doc.model_types().count(), 1);
    }

    #[test]
    fn test_opaque_scalar_warns() {
        let doc = build("scalar Money\ntype Query { price: Money }").unwrap();
        assert_eq!(
            doc.warnings,
            vec![Warning::OpaqueScalar {
                name: "Money".to_string()
            }]
        );
        match &doc.types["Money"].kind {
            TypeKind::Scalar { mapping, opaque } => {
                assert!(*opaque);
                assert_eq!(mapping.rust_type, "String");
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_interfaces_collect_possible_types() {
        let doc = build(
            r#"
            type Query { node(id: ID!): Node }
            interface Node { id: ID! }
            type User implements Node { id: ID! }
            type Team implements Node { id: ID! }
            "#,
        )
        .unwrap();
        assert_eq!(doc.types["Node"].possible_types(), ["Team", "User"]);
    }

    #[test]
    fn test_subscriptions_are_skipped() {
        let doc = build(
            r#"
            schema { query: Query subscription: Subscription }
            type Query { ok: Boolean }
            type Subscription { ticks: Int }
            "#,
        )
        .unwrap();
        assert_eq!(doc.operations.len(), 1);
        assert!(doc.operation_types.contains("Subscription"));
        assert_eq!(
            doc.warnings,
            vec![Warning::SkippedOperation {
                name: "subscription.ticks".to_string(),
                reason: "subscriptions are not supported".to_string(),
            }]
        );
    }

    #[test]
    fn test_default_values_rendered_as_literals() {
        let doc = build(
            r#"
            type Query { list(first: Int = 10, filter: Filter = {status: ACTIVE, tags: ["a"]}): [String] }
            input Filter { status: Status tags: [String] }
            enum Status { ACTIVE }
            "#,
        )
        .unwrap();
        let args = doc.operations[0].arguments();
        assert_eq!(args[0].default_value.as_deref(), Some("10"));
        assert_eq!(
            args[1].default_value.as_deref(),
            Some("{status: ACTIVE, tags: [\"a\"]}")
        );
        assert!(!args[0].is_required());
    }
}
