//! code emission
//!
//! builds serializable contexts from the document, the topology and the
//! selection plans, then renders them through tera templates. output is
//! staged in an [`Emission`]; nothing touches the filesystem until
//! [`Emission::flush`].

use super::config::{GeneratorConfig, OutputMode};
use super::hooks::HookPipeline;
use super::ir::{
    Argument, Document, Field, Operation, TypeDef, TypeKind, Warning, FALLBACK_VARIANT,
};
use super::naming;
use super::scalars;
use super::topology::{NamespaceNode, Topology};
use crate::error::{Error, Result};
use crate::operation::OperationKind;
use crate::selection::{FieldSelection, Planner, SchemaShape};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tera::{Context, Tera};

const VALUE_TYPE: &str = "serde_json::Value";

/// built-in templates, overridable by same-named files in a template dir
static BUILTIN_TEMPLATES: [(&str, &str); 7] = [
    ("lib.rs.tera", include_str!("templates/lib.rs.tera")),
    ("scalars.rs.tera", include_str!("templates/scalars.rs.tera")),
    ("enums.rs.tera", include_str!("templates/enums.rs.tera")),
    ("model.rs.tera", include_str!("templates/model.rs.tera")),
    ("models_mod.rs.tera", include_str!("templates/models_mod.rs.tera")),
    ("client.rs.tera", include_str!("templates/client.rs.tera")),
    ("Cargo.toml.tera", include_str!("templates/Cargo.toml.tera")),
];

/// names of the templates an override directory may replace
pub fn template_names() -> impl Iterator<Item = &'static str> {
    BUILTIN_TEMPLATES.iter().map(|(name, _)| *name)
}

/// compiled template set
pub struct Templates {
    tera: Tera,
}

impl Templates {
    pub fn builtin() -> Result<Self> {
        Self::load(None)
    }

    /// built-ins, with files in `override_dir` taking precedence
    pub fn load(override_dir: Option<&Path>) -> Result<Self> {
        if let Some(dir) = override_dir {
            if !dir.is_dir() {
                return Err(Error::Config(format!(
                    "template directory {} does not exist",
                    dir.display()
                )));
            }
            warn_unknown_templates(dir);
        }

        let mut tera = Tera::default();
        tera.autoescape_on(Vec::new());
        for (name, builtin) in BUILTIN_TEMPLATES {
            let source = match override_dir.map(|dir| dir.join(name)) {
                Some(path) if path.is_file() => {
                    tracing::debug!(
                        template = name,
                        path = %path.display(),
                        "using template override"
                    );
                    std::fs::read_to_string(&path)
                        .map_err(|err| Error::io(path.as_path(), err))?
                }
                _ => builtin.to_string(),
            };
            tera.add_raw_template(name, &source)
                .map_err(|source| Error::TemplateRender {
                    template: name.to_string(),
                    source,
                })?;
        }
        Ok(Self { tera })
    }

    pub fn render(&self, name: &str, context: &Context) -> Result<String> {
        self.tera
            .render(name, context)
            .map_err(|source| Error::TemplateRender {
                template: name.to_string(),
                source,
            })
    }
}

/// `.tera` files in an override dir that replace nothing
fn warn_unknown_templates(dir: &Path) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.ends_with(".tera") && !template_names().any(|known| known == name) {
            tracing::warn!(template = name, dir = %dir.display(), "ignoring unknown template");
        }
    }
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templates")
            .field("templates", &self.tera.get_template_names().collect::<Vec<_>>())
            .finish()
    }
}

/// generated files staged in memory, keyed by path relative to the output dir
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Emission {
    files: BTreeMap<PathBuf, String>,
}

impl Emission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, content: String) {
        self.files.insert(path.into(), content);
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// run post-hooks over every staged file, in path order
    pub fn apply_post_hooks(self, hooks: &HookPipeline) -> Result<Self> {
        let mut files = BTreeMap::new();
        for (path, content) in self.files {
            let content = hooks.run_post(&path, content)?;
            files.insert(path, content);
        }
        Ok(Self { files })
    }

    /// write every file under `out_dir`.
    ///
    /// on failure the files written so far are restored to their previous
    /// content (or removed) before the error is returned.
    pub fn flush(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written: Vec<(PathBuf, Option<Vec<u8>>)> = Vec::new();
        for (relative, content) in &self.files {
            let path = out_dir.join(relative);
            let previous = std::fs::read(&path).ok();
            if let Err(err) = write_file(&path, content) {
                rollback(&written);
                return Err(err);
            }
            tracing::debug!(path = %path.display(), "wrote file");
            written.push((path, previous));
        }
        Ok(written.into_iter().map(|(path, _)| path).collect())
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
    }
    std::fs::write(path, content).map_err(|err| Error::io(path, err))
}

fn rollback(written: &[(PathBuf, Option<Vec<u8>>)]) {
    for (path, previous) in written.iter().rev() {
        let result = match previous {
            Some(bytes) => std::fs::write(path, bytes),
            None => std::fs::remove_file(path),
        };
        if let Err(err) = result {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "failed to roll back generated file"
            );
        }
    }
}

#[derive(Debug, Serialize)]
struct ScalarCtx {
    name: String,
    rust_type: String,
    doc: String,
}

#[derive(Debug, Serialize)]
struct EnumValueCtx {
    name: String,
    rename: Option<String>,
    docs: Vec<String>,
}

#[derive(Debug, Serialize)]
struct EnumCtx {
    name: String,
    doc: String,
    values: Vec<EnumValueCtx>,
}

#[derive(Debug, Serialize)]
struct FieldCtx {
    name: String,
    rename: Option<String>,
    /// extra response key accepted when selected inside a fragment
    alias: Option<String>,
    rust_type: String,
    docs: Vec<String>,
    skip_none: bool,
}

#[derive(Debug, Serialize)]
struct VariantCtx {
    name: String,
    rename: Option<String>,
    payload: String,
}

#[derive(Debug, Serialize)]
struct ModelCtx {
    name: String,
    graphql_name: String,
    kind: &'static str,
    module: String,
    doc: String,
    polymorphic: bool,
    fields: Vec<FieldCtx>,
    variants: Vec<VariantCtx>,
    fallback: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct ParamCtx {
    name: String,
    variable: String,
    rust_type: String,
    optional: bool,
}

#[derive(Debug, Clone, Serialize)]
struct OperationCtx {
    const_name: String,
    label: String,
    graphql_name: String,
    kind: &'static str,
    response_path: String,
    return_type_name: String,
    document_prefix: String,
    document_suffix: String,
    query_all: String,
    query_minimal: String,
    plan_all: String,
    plan_minimal: String,
    method: String,
    docs: Vec<String>,
    deprecation: Option<String>,
    params: Vec<ParamCtx>,
    selection_param: &'static str,
    return_type: String,
}

#[derive(Debug, Serialize)]
struct AccessorCtx {
    method: String,
    struct_name: String,
}

#[derive(Debug, Serialize)]
struct NamespaceCtx {
    struct_name: String,
    is_root: bool,
    doc: String,
    accessors: Vec<AccessorCtx>,
    operations: Vec<OperationCtx>,
}

#[derive(Debug, Serialize)]
struct PresetCtx {
    name: String,
    operation: String,
    summary: String,
    paths: String,
}

/// rust type names for schema types
struct TypeMapper<'a> {
    doc: &'a Document,
}

impl TypeMapper<'_> {
    /// rust type of a named type; `None` for root and namespace types
    fn leaf(&self, name: &str) -> Option<String> {
        let def = self.doc.get(name)?;
        if self.doc.operation_types.contains(name) {
            return None;
        }
        Some(match &def.kind {
            TypeKind::Scalar { mapping, .. } if scalars::is_builtin(name) => {
                mapping.rust_type.clone()
            }
            _ => naming::type_name(name),
        })
    }

    /// struct and enum references that could make a type infinitely sized
    fn boxed(&self, name: &str) -> bool {
        self.doc.get(name).is_some_and(|def| {
            matches!(
                def.kind,
                TypeKind::Object { .. }
                    | TypeKind::Input { .. }
                    | TypeKind::Interface { .. }
                    | TypeKind::Union { .. }
            )
        })
    }

    fn field_type(
        &self,
        owner: &TypeDef,
        field: &Field,
        output: bool,
        warnings: &mut Vec<Warning>,
    ) -> String {
        match self.leaf(&field.ty.name) {
            Some(leaf) => field.ty.rust_type(&leaf, self.boxed(&field.ty.name), output),
            None => {
                warnings.push(Warning::UntypedField {
                    field: format!("{}.{}", owner.name, field.name),
                    type_name: field.ty.name.clone(),
                });
                field.ty.rust_type(VALUE_TYPE, false, output)
            }
        }
    }
}

/// one operation argument bound to a document variable
struct BoundArgument<'a> {
    segment: usize,
    variable: String,
    argument: &'a Argument,
}

/// renders a document, topology and plans into an [`Emission`]
pub struct Emitter<'a> {
    document: &'a Document,
    topology: &'a Topology,
    shape: &'a SchemaShape,
    config: &'a GeneratorConfig,
    templates: &'a Templates,
}

impl<'a> Emitter<'a> {
    pub fn new(
        document: &'a Document,
        topology: &'a Topology,
        shape: &'a SchemaShape,
        config: &'a GeneratorConfig,
        templates: &'a Templates,
    ) -> Self {
        Self {
            document,
            topology,
            shape,
            config,
            templates,
        }
    }

    fn mapper(&self) -> TypeMapper<'a> {
        TypeMapper { doc: self.document }
    }

    fn planner(&self) -> Planner<'a> {
        Planner::new(self.shape).with_max_depth(self.config.max_depth)
    }

    /// render every file the configured output mode asks for
    pub fn emit(&self) -> Result<(Emission, Vec<Warning>)> {
        let mode = self.config.mode;
        let mut emission = Emission::new();
        let mut warnings = Vec::new();

        if mode.includes_models() {
            self.emit_models(&mut emission, &mut warnings)?;
        }
        if mode.includes_client() {
            self.check_client_names()?;
            emission.insert("src/client.rs", self.render_client()?);
        }
        if mode == OutputMode::Crate {
            let mut context = Context::new();
            context.insert("client_name", &self.config.client_name);
            emission.insert(
                "src/lib.rs",
                self.templates.render("lib.rs.tera", &context)?,
            );
            if let Some(crate_name) = &self.config.crate_name {
                emission.insert("Cargo.toml", self.render_manifest(crate_name)?);
            }
        }

        tracing::info!(files = emission.len(), mode = %mode, "rendered output");
        Ok((emission, warnings))
    }

    fn emit_models(&self, emission: &mut Emission, warnings: &mut Vec<Warning>) -> Result<()> {
        let scalars: Vec<ScalarCtx> = self
            .document
            .scalars()
            .filter(|def| !scalars::is_builtin(&def.name))
            .filter_map(|def| match &def.kind {
                TypeKind::Scalar { mapping, .. } => Some(ScalarCtx {
                    name: naming::type_name(&def.name),
                    rust_type: mapping.rust_type.clone(),
                    doc: doc_block(
                        def.description.as_deref().or(mapping.description.as_deref()),
                    ),
                }),
                _ => None,
            })
            .collect();
        let mut context = Context::new();
        context.insert("scalars", &scalars);
        emission.insert(
            "src/scalars.rs",
            self.templates.render("scalars.rs.tera", &context)?,
        );

        let enums: Vec<EnumCtx> = self
            .document
            .enums()
            .filter_map(|def| match &def.kind {
                TypeKind::Enum { values } => Some(EnumCtx {
                    name: naming::type_name(&def.name),
                    doc: doc_block(def.description.as_deref()),
                    values: values
                        .iter()
                        .map(|value| {
                            let name = naming::variant_name(&value.name);
                            EnumValueCtx {
                                rename: (name != value.name).then(|| value.name.clone()),
                                name,
                                docs: member_docs(
                                    value.description.as_deref(),
                                    value.deprecation.as_deref(),
                                    None,
                                ),
                            }
                        })
                        .collect(),
                }),
                _ => None,
            })
            .collect();
        let mut context = Context::new();
        context.insert("enums", &enums);
        emission.insert(
            "src/enums.rs",
            self.templates.render("enums.rs.tera", &context)?,
        );

        let mut modules = Vec::new();
        for def in self.document.model_types() {
            let model = self.model_context(def, warnings);
            tracing::debug!(model = %def.name, module = %model.module, "rendering model");
            let mut context = Context::new();
            context.insert("model", &model);
            emission.insert(
                format!("src/models/{}.rs", model.module),
                self.templates.render("model.rs.tera", &context)?,
            );
            modules.push(model.module);
        }
        modules.sort();
        let mut context = Context::new();
        context.insert("modules", &modules);
        emission.insert(
            "src/models/mod.rs",
            self.templates.render("models_mod.rs.tera", &context)?,
        );
        Ok(())
    }

    fn model_context(&self, def: &TypeDef, warnings: &mut Vec<Warning>) -> ModelCtx {
        let mapper = self.mapper();
        let output = !matches!(def.kind, TypeKind::Input { .. });
        let aliases = if output {
            self.shape.variant_aliases(&def.name)
        } else {
            BTreeMap::new()
        };
        let fields = if def.is_polymorphic() {
            Vec::new()
        } else {
            def.fields()
                .iter()
                .map(|field| {
                    let name = naming::field_name(&field.name);
                    let rust_type = mapper.field_type(def, field, output, warnings);
                    FieldCtx {
                        rename: (naming::unescape(&name) != field.name)
                            .then(|| field.name.clone()),
                        alias: aliases.get(&field.name).cloned(),
                        name,
                        skip_none: !output && field.ty.is_nullable(),
                        rust_type,
                        docs: member_docs(
                            field.description.as_deref(),
                            field.deprecation.as_deref(),
                            field.default_value.as_deref(),
                        ),
                    }
                })
                .collect()
        };
        let variants = def
            .possible_types()
            .iter()
            .map(|member| {
                let name = naming::type_name(member);
                VariantCtx {
                    rename: (name != *member).then(|| member.clone()),
                    payload: mapper.leaf(member).unwrap_or_else(|| VALUE_TYPE.to_string()),
                    name,
                }
            })
            .collect();

        ModelCtx {
            name: naming::type_name(&def.name),
            graphql_name: def.name.clone(),
            kind: def.kind.label(),
            module: naming::module_name(&def.name),
            doc: doc_block(def.description.as_deref()),
            polymorphic: def.is_polymorphic(),
            fields,
            variants,
            fallback: FALLBACK_VARIANT,
        }
    }

    /// namespace structs and the root client share a module with the models
    fn check_client_names(&self) -> Result<()> {
        let emitted: BTreeMap<String, &str> = self
            .document
            .types
            .values()
            .filter(|def| {
                !self.document.operation_types.contains(&def.name)
                    && !(matches!(def.kind, TypeKind::Scalar { .. })
                        && scalars::is_builtin(&def.name))
            })
            .map(|def| (naming::type_name(&def.name), def.name.as_str()))
            .collect();
        for node in self.topology.nodes() {
            let struct_name = node.struct_name(&self.config.client_name);
            if let Some(type_name) = emitted.get(&struct_name) {
                let label = if node.is_root() {
                    "root client".to_string()
                } else {
                    format!("namespace `{}`", node.path.join("."))
                };
                return Err(Error::NameCollision {
                    scope: "client types".to_string(),
                    first: type_name.to_string(),
                    second: label,
                    normalized: struct_name,
                });
            }
        }
        Ok(())
    }

    fn render_client(&self) -> Result<String> {
        let planner = self.planner();
        let mut operations = Vec::with_capacity(self.document.operations.len());
        let mut consts: BTreeMap<String, String> = BTreeMap::new();
        for (index, op) in self.document.operations.iter().enumerate() {
            let ctx = self.operation_context(index, op, &planner)?;
            if let Some(first) = consts.insert(ctx.const_name.clone(), ctx.label.clone()) {
                return Err(Error::NameCollision {
                    scope: "operation constants".to_string(),
                    first,
                    second: ctx.label,
                    normalized: ctx.const_name,
                });
            }
            operations.push(ctx);
        }

        let namespaces: Vec<NamespaceCtx> = self
            .topology
            .nodes()
            .into_iter()
            .map(|node| self.namespace_context(node, &operations))
            .collect();

        let mut sorted = operations.clone();
        sorted.sort_by(|a, b| a.const_name.cmp(&b.const_name));

        let mut context = Context::new();
        context.insert("client_name", &self.config.client_name);
        context.insert("shape_json", &raw_literal(&self.shape.to_json()?));
        context.insert("operations", &sorted);
        context.insert("namespaces", &namespaces);
        context.insert("presets", &self.presets(&planner)?);
        self.templates.render("client.rs.tera", &context)
    }

    fn operation_context(
        &self,
        index: usize,
        op: &Operation,
        planner: &Planner<'_>,
    ) -> Result<OperationCtx> {
        let label = op.label();
        let placement = self.topology.placement(index).ok_or_else(|| {
            Error::Config(format!("operation `{label}` was not placed in the client"))
        })?;
        let mut ident: Vec<&str> = placement.namespace.iter().map(String::as_str).collect();
        ident.push(&placement.method);
        let ident = ident.join("_");
        let const_ident = format!("{}_{ident}", op.kind.keyword());

        let bound = bind_variables(op);
        let (document_prefix, document_suffix) =
            document_parts(op, &naming::operation_name(&ident), &bound);

        let mapper = self.mapper();
        let mut params: Vec<ParamCtx> = bound
            .iter()
            .map(|b| {
                let optional = !b.argument.is_required();
                let leaf = mapper
                    .leaf(&b.argument.ty.name)
                    .unwrap_or_else(|| VALUE_TYPE.to_string());
                ParamCtx {
                    name: naming::field_name(&b.variable),
                    variable: b.variable.clone(),
                    rust_type: b.argument.ty.rust_type(&leaf, false, optional),
                    optional,
                }
            })
            .collect();
        params.sort_by_key(|param| param.optional);
        let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
        for param in &params {
            if let Some(first) = seen.insert(&param.name, &param.variable) {
                return Err(Error::NameCollision {
                    scope: format!("arguments of `{label}`"),
                    first: first.to_string(),
                    second: param.variable.clone(),
                    normalized: param.name.clone(),
                });
            }
        }
        let selection_param = ["fields", "field_selection", "selection"]
            .into_iter()
            .find(|candidate| !seen.contains_key(candidate))
            .unwrap_or("selection_");

        let return_name = &op.return_type.name;
        let all = planner.plan(return_name, &FieldSelection::All)?;
        let minimal = planner.plan(return_name, &FieldSelection::Minimal)?;
        tracing::debug!(operation = %label, selection = %all.render(), "planned operation");

        let return_leaf = mapper
            .leaf(return_name)
            .unwrap_or_else(|| VALUE_TYPE.to_string());
        let response_path: Vec<String> = op
            .path
            .iter()
            .map(|segment| str_literal(&segment.field))
            .collect();

        Ok(OperationCtx {
            const_name: naming::const_name(&const_ident),
            graphql_name: op.name.clone(),
            kind: match op.kind {
                OperationKind::Query => "Query",
                OperationKind::Mutation => "Mutation",
            },
            response_path: format!("&[{}]", response_path.join(", ")),
            return_type_name: return_name.clone(),
            document_prefix: raw_literal(&document_prefix),
            document_suffix: str_literal(&document_suffix),
            query_all: raw_literal(&all.render()),
            query_minimal: raw_literal(&minimal.render()),
            plan_all: raw_literal(&all.to_json()?),
            plan_minimal: raw_literal(&minimal.to_json()?),
            method: naming::field_name(&placement.method),
            docs: operation_docs(op, &bound),
            deprecation: op.deprecation.as_deref().map(str_literal),
            params,
            selection_param,
            return_type: op.return_type.rust_type(&return_leaf, false, false),
            label,
        })
    }

    fn namespace_context(&self, node: &NamespaceNode, operations: &[OperationCtx]) -> NamespaceCtx {
        let client_name = &self.config.client_name;
        let doc = if node.is_root() {
            "/// typed graphql client\n".to_string()
        } else {
            format!("/// `{}` operations\n", node.path.join("."))
        };
        NamespaceCtx {
            struct_name: node.struct_name(client_name),
            is_root: node.is_root(),
            doc,
            accessors: node
                .children
                .iter()
                .map(|child| AccessorCtx {
                    method: naming::field_name(&child.name),
                    struct_name: child.struct_name(client_name),
                })
                .collect(),
            operations: node
                .operations
                .iter()
                .map(|placed| operations[placed.index].clone())
                .collect(),
        }
    }

    fn presets(&self, planner: &Planner<'_>) -> Result<Vec<PresetCtx>> {
        let mut names = BTreeSet::new();
        let mut out = Vec::new();
        for preset in &self.config.selections {
            if !names.insert(preset.name.as_str()) {
                return Err(Error::Config(format!(
                    "selection `{}` is defined twice",
                    preset.name
                )));
            }
            let op = find_operation(self.document, &preset.operation)?;
            planner.plan(
                &op.return_type.name,
                &FieldSelection::custom(preset.fields.iter()),
            )?;
            let summary: Vec<String> = preset.fields.iter().map(|f| format!("`{f}`")).collect();
            let paths: Vec<String> = preset.fields.iter().map(|f| str_literal(f)).collect();
            out.push(PresetCtx {
                name: preset.name.clone(),
                operation: op.label(),
                summary: summary.join(", "),
                paths: paths.join(", "),
            });
        }
        Ok(out)
    }

    fn render_manifest(&self, crate_name: &str) -> Result<String> {
        let runtime = match &self.config.runtime_path {
            Some(path) => format!("gqlkit = {{ path = {} }}", toml_string(path)),
            None => format!("gqlkit = {}", toml_string(env!("CARGO_PKG_VERSION"))),
        };
        let mut dependencies: BTreeSet<String> = BTreeSet::from([
            runtime,
            r#"serde = { version = "1", features = ["derive"] }"#.to_string(),
            r#"serde_json = "1""#.to_string(),
        ]);
        for def in self.document.scalars() {
            if let TypeKind::Scalar { mapping, .. } = &def.kind {
                if let Some(dependency) = &mapping.dependency {
                    dependencies.insert(dependency.clone());
                }
            }
        }

        let mut context = Context::new();
        context.insert("crate_name", &toml_string(crate_name));
        context.insert("dependencies", &dependencies);
        self.templates.render("Cargo.toml.tera", &context)
    }
}

fn find_operation<'d>(doc: &'d Document, name: &str) -> Result<&'d Operation> {
    let matches: Vec<&Operation> = doc
        .operations
        .iter()
        .filter(|op| {
            let dotted: Vec<&str> = op.path.iter().map(|s| s.field.as_str()).collect();
            op.label() == name || dotted.join(".") == name
        })
        .collect();
    match matches.as_slice() {
        [op] => Ok(*op),
        [] => Err(Error::Config(format!(
            "selection refers to unknown operation `{name}`"
        ))),
        _ => Err(Error::Config(format!(
            "operation `{name}` is ambiguous, prefix it with `query.` or `mutation.`"
        ))),
    }
}

/// assign a unique variable to every argument along the operation path
fn bind_variables(op: &Operation) -> Vec<BoundArgument<'_>> {
    let mut used = BTreeSet::new();
    let mut out = Vec::new();
    for (index, segment) in op.path.iter().enumerate() {
        for argument in &segment.arguments {
            let base = if used.contains(&argument.name) {
                format!("{}_{}", segment.field, argument.name)
            } else {
                argument.name.clone()
            };
            let mut variable = base.clone();
            let mut n = 2;
            while used.contains(&variable) {
                variable = format!("{base}{n}");
                n += 1;
            }
            used.insert(variable.clone());
            out.push(BoundArgument {
                segment: index,
                variable,
                argument,
            });
        }
    }
    out
}

/// document text around the selection set: header and field chain, then
/// the closing braces
fn document_parts(op: &Operation, header: &str, bound: &[BoundArgument<'_>]) -> (String, String) {
    let mut prefix = format!("{} {header}", op.kind.keyword());
    if !bound.is_empty() {
        let definitions: Vec<String> = bound
            .iter()
            .map(|b| {
                let mut definition = format!("${}: {}", b.variable, b.argument.ty.to_graphql());
                if let Some(default) = &b.argument.default_value {
                    definition.push_str(" = ");
                    definition.push_str(default);
                }
                definition
            })
            .collect();
        prefix.push('(');
        prefix.push_str(&definitions.join(", "));
        prefix.push(')');
    }
    prefix.push_str(" {");

    for (index, segment) in op.path.iter().enumerate() {
        prefix.push(' ');
        prefix.push_str(&segment.field);
        let arguments: Vec<String> = bound
            .iter()
            .filter(|b| b.segment == index)
            .map(|b| format!("{}: ${}", b.argument.name, b.variable))
            .collect();
        if !arguments.is_empty() {
            prefix.push('(');
            prefix.push_str(&arguments.join(", "));
            prefix.push(')');
        }
        if index + 1 < op.path.len() {
            prefix.push_str(" {");
        }
    }
    (prefix, " }".repeat(op.path.len()))
}

fn operation_docs(op: &Operation, bound: &[BoundArgument<'_>]) -> Vec<String> {
    let mut docs = doc_lines(op.description.as_deref());
    if docs.is_empty() {
        docs.push(format!("/// `{}`", op.label()));
    }
    let arguments: Vec<String> = bound
        .iter()
        .filter_map(|b| {
            let description = b.argument.description.as_deref()?.lines().next()?.trim();
            Some(format!(
                "/// * `{}`: {description}",
                naming::unescape(&naming::field_name(&b.variable))
            ))
        })
        .collect();
    if !arguments.is_empty() {
        docs.push("///".to_string());
        docs.extend(arguments);
    }
    docs
}

/// `///` lines for a description
fn doc_lines(description: Option<&str>) -> Vec<String> {
    let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) else {
        return Vec::new();
    };
    description
        .lines()
        .map(|line| {
            let line = line.trim_end();
            if line.is_empty() {
                "///".to_string()
            } else {
                format!("/// {line}")
            }
        })
        .collect()
}

fn member_docs(
    description: Option<&str>,
    deprecation: Option<&str>,
    default_value: Option<&str>,
) -> Vec<String> {
    let mut docs = doc_lines(description);
    let mut notes = Vec::new();
    if let Some(reason) = deprecation {
        notes.push(format!("/// deprecated: {reason}"));
    }
    if let Some(default) = default_value {
        notes.push(format!("/// defaults to `{default}` on the server"));
    }
    if !docs.is_empty() && !notes.is_empty() {
        docs.push("///".to_string());
    }
    docs.extend(notes);
    docs
}

/// doc lines joined with a trailing newline, ready to sit before an item
fn doc_block(description: Option<&str>) -> String {
    doc_lines(description)
        .into_iter()
        .map(|line| line + "\n")
        .collect()
}

/// raw string literal with enough `#`s for its content
fn raw_literal(text: &str) -> String {
    let mut hashes = 1;
    while text.contains(&format!("\"{}", "#".repeat(hashes))) {
        hashes += 1;
    }
    let hashes = "#".repeat(hashes);
    format!("r{hashes}\"{text}\"{hashes}")
}

fn str_literal(text: &str) -> String {
    format!("{text:?}")
}

fn toml_string(text: &str) -> String {
    toml::Value::String(text.to_string()).to_string()
}
