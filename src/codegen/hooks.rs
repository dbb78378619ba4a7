//! generation hooks
//!
//! pre-hooks rewrite the [`Document`] before topology and planning; post-hooks
//! rewrite each staged file before anything is written. a failing hook stops
//! the run with [`Error::HookExecution`].

use super::ir::{Document, TypeKind};
use super::scalars;
use crate::error::{BoxError, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// transforms the document before generation
pub trait PreHook: Send + Sync {
    fn name(&self) -> &str;
    fn run(&self, document: Document) -> std::result::Result<Document, BoxError>;
}

/// transforms one generated file before it is written
pub trait PostHook: Send + Sync {
    fn name(&self) -> &str;
    /// `path` is relative to the output directory
    fn run(&self, path: &Path, content: String) -> std::result::Result<String, BoxError>;
}

/// pre-hook from a closure
pub struct FnPreHook<F> {
    name: String,
    f: F,
}

impl<F> FnPreHook<F>
where
    F: Fn(Document) -> std::result::Result<Document, BoxError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> PreHook for FnPreHook<F>
where
    F: Fn(Document) -> std::result::Result<Document, BoxError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, document: Document) -> std::result::Result<Document, BoxError> {
        (self.f)(document)
    }
}

/// post-hook from a closure
pub struct FnPostHook<F> {
    name: String,
    f: F,
}

impl<F> FnPostHook<F>
where
    F: Fn(&Path, String) -> std::result::Result<String, BoxError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> PostHook for FnPostHook<F>
where
    F: Fn(&Path, String) -> std::result::Result<String, BoxError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, path: &Path, content: String) -> std::result::Result<String, BoxError> {
        (self.f)(path, content)
    }
}

/// ordered pre- and post-hooks
#[derive(Default)]
pub struct HookPipeline {
    pre: Vec<Box<dyn PreHook>>,
    post: Vec<Box<dyn PostHook>>,
}

impl HookPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pre(&mut self, hook: impl PreHook + 'static) -> &mut Self {
        self.pre.push(Box::new(hook));
        self
    }

    pub fn add_post(&mut self, hook: impl PostHook + 'static) -> &mut Self {
        self.post.push(Box::new(hook));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pre.is_empty() && self.post.is_empty()
    }

    /// apply pre-hooks in order, then re-validate the document
    pub fn run_pre(&self, mut document: Document) -> Result<Document> {
        if self.pre.is_empty() {
            return Ok(document);
        }
        for hook in &self.pre {
            tracing::debug!(hook = hook.name(), "running pre-hook");
            document = hook.run(document).map_err(|source| Error::HookExecution {
                hook: hook.name().to_string(),
                target: "schema document".to_string(),
                source,
            })?;
        }
        document.validate()?;
        Ok(document)
    }

    /// apply post-hooks in order to one file
    pub fn run_post(&self, path: &Path, mut content: String) -> Result<String> {
        for hook in &self.post {
            content = hook
                .run(path, content)
                .map_err(|source| Error::HookExecution {
                    hook: hook.name().to_string(),
                    target: path.display().to_string(),
                    source,
                })?;
        }
        Ok(content)
    }
}

impl std::fmt::Debug for HookPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pre: Vec<&str> = self.pre.iter().map(|h| h.name()).collect();
        let post: Vec<&str> = self.post.iter().map(|h| h.name()).collect();
        f.debug_struct("HookPipeline")
            .field("pre", &pre)
            .field("post", &post)
            .finish()
    }
}

/// prepends a header to generated files
#[derive(Debug, Clone)]
pub struct AddHeaderHook {
    header: String,
    extensions: Vec<String>,
}

impl AddHeaderHook {
    /// header for `.rs` files
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            extensions: vec!["rs".to_string()],
        }
    }

    /// file extensions the header applies to
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }
}

impl PostHook for AddHeaderHook {
    fn name(&self) -> &str {
        "add-header"
    }

    fn run(&self, path: &Path, content: String) -> std::result::Result<String, BoxError> {
        let applies = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext));
        if !applies {
            return Ok(content);
        }
        let separator = if self.header.ends_with('\n') { "\n" } else { "\n\n" };
        Ok(format!("{}{separator}{content}", self.header))
    }
}

/// drops types by name prefix or suffix.
///
/// fields, members and operations that referred to a dropped type are
/// dropped with it. root, namespace and built-in scalar types are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterTypesHook {
    pub exclude_prefix: Option<String>,
    pub exclude_suffix: Option<String>,
    pub include_prefix: Option<String>,
    pub include_suffix: Option<String>,
}

impl FilterTypesHook {
    fn keeps(&self, name: &str) -> bool {
        if self
            .exclude_prefix
            .as_deref()
            .is_some_and(|p| name.starts_with(p))
        {
            return false;
        }
        if self
            .exclude_suffix
            .as_deref()
            .is_some_and(|s| name.ends_with(s))
        {
            return false;
        }
        if self
            .include_prefix
            .as_deref()
            .is_some_and(|p| !name.starts_with(p))
        {
            return false;
        }
        if self
            .include_suffix
            .as_deref()
            .is_some_and(|s| !name.ends_with(s))
        {
            return false;
        }
        true
    }
}

impl PreHook for FilterTypesHook {
    fn name(&self) -> &str {
        "filter-types"
    }

    fn run(&self, mut document: Document) -> std::result::Result<Document, BoxError> {
        let removed: BTreeSet<String> = document
            .types
            .keys()
            .filter(|name| {
                !scalars::is_builtin(name)
                    && !document.operation_types.contains(*name)
                    && !self.keeps(name)
            })
            .cloned()
            .collect();
        if removed.is_empty() {
            return Ok(document);
        }
        tracing::debug!(count = removed.len(), "filtering types");

        document.types.retain(|name, _| !removed.contains(name));
        for def in document.types.values_mut() {
            if let Some(fields) = def.fields_mut() {
                fields.retain(|field| {
                    !removed.contains(&field.ty.name)
                        && field.arguments.iter().all(|a| !removed.contains(&a.ty.name))
                });
            }
            match &mut def.kind {
                TypeKind::Object { interfaces, .. } => {
                    interfaces.retain(|name| !removed.contains(name));
                }
                TypeKind::Interface { possible_types, .. } | TypeKind::Union { possible_types } => {
                    possible_types.retain(|name| !removed.contains(name));
                }
                _ => {}
            }
        }
        document.operations.retain(|op| {
            let keep = !removed.contains(&op.return_type.name)
                && op
                    .path
                    .iter()
                    .flat_map(|segment| &segment.arguments)
                    .all(|arg| !removed.contains(&arg.ty.name));
            if !keep {
                tracing::debug!(operation = %op.label(), "dropping operation on filtered type");
            }
            keep
        });
        Ok(document)
    }
}

/// renames types and rewrites every reference to them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameTypesHook {
    renames: BTreeMap<String, String>,
}

impl RenameTypesHook {
    pub fn new<I, K, V>(renames: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            renames: renames
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    fn rename(&self, name: &mut String) {
        if let Some(new) = self.renames.get(name.as_str()) {
            *name = new.clone();
        }
    }
}

impl PreHook for RenameTypesHook {
    fn name(&self) -> &str {
        "rename-types"
    }

    fn run(&self, mut document: Document) -> std::result::Result<Document, BoxError> {
        for (old, new) in &self.renames {
            if scalars::is_builtin(old) {
                return Err(format!("cannot rename built-in scalar `{old}`").into());
            }
            if document.types.contains_key(new) && !self.renames.contains_key(new) {
                return Err(format!("cannot rename `{old}` to existing type `{new}`").into());
            }
        }

        let types = std::mem::take(&mut document.types);
        for (_, mut def) in types {
            self.rename(&mut def.name);
            if let Some(fields) = def.fields_mut() {
                for field in fields {
                    self.rename(&mut field.ty.name);
                    for arg in &mut field.arguments {
                        self.rename(&mut arg.ty.name);
                    }
                }
            }
            match &mut def.kind {
                TypeKind::Object { interfaces, .. } => {
                    interfaces.iter_mut().for_each(|n| self.rename(n))
                }
                TypeKind::Interface { possible_types, .. } | TypeKind::Union { possible_types } => {
                    possible_types.iter_mut().for_each(|n| self.rename(n));
                    possible_types.sort();
                }
                _ => {}
            }
            document.types.insert(def.name.clone(), def);
        }

        for op in &mut document.operations {
            self.rename(&mut op.return_type.name);
            for segment in &mut op.path {
                for arg in &mut segment.arguments {
                    self.rename(&mut arg.ty.name);
                }
            }
        }

        document.operation_types = std::mem::take(&mut document.operation_types)
            .into_iter()
            .map(|mut name| {
                self.rename(&mut name);
                name
            })
            .collect();
        document.sources = std::mem::take(&mut document.sources)
            .into_iter()
            .map(|(mut key, file)| {
                let (type_name, rest) = match key.split_once('.') {
                    Some((t, r)) => (t.to_string(), Some(r.to_string())),
                    None => (key.clone(), None),
                };
                if let Some(new) = self.renames.get(&type_name) {
                    key = match rest {
                        Some(rest) => format!("{new}.{rest}"),
                        None => new.clone(),
                    };
                }
                (key, file)
            })
            .collect();
        Ok(document)
    }
}
