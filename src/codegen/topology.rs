//! client topology
//!
//! places every operation at a namespace path and a method name. queries
//! and mutations get separate trees under the `query` and `mutation`
//! accessors of the root client. inside a tree the namespace comes from the
//! namespace types the operation was reached through, followed by segments
//! a [`GroupingConvention`] derives from the operation name.

use super::ir::{Document, Operation};
use super::naming;
use crate::error::{Error, Result};
use crate::operation::OperationKind;
use heck::ToSnakeCase;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// how operation names are split into namespace segments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum GroupingConvention {
    /// no derived segments
    Flat,
    /// `firewall_addRule` becomes `firewall` + `add_rule`
    Delimiter {
        #[serde(default = "default_delimiter")]
        delimiter: String,
    },
    /// known nouns inside camel-case names become segments
    Nouns { nouns: Vec<String> },
}

fn default_delimiter() -> String {
    "_".to_string()
}

impl Default for GroupingConvention {
    fn default() -> Self {
        GroupingConvention::Delimiter {
            delimiter: default_delimiter(),
        }
    }
}

/// where one operation lands in the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub kind: OperationKind,
    /// snake-case namespace segments inside the kind's tree, outermost first
    pub namespace: Vec<String>,
    /// snake-case method name, unescaped
    pub method: String,
}

impl Placement {
    /// tree path from the root client: the kind keyword, then the namespace
    pub fn path(&self) -> Vec<String> {
        let mut path = Vec::with_capacity(self.namespace.len() + 1);
        path.push(self.kind.keyword().to_string());
        path.extend(self.namespace.iter().cloned());
        path
    }

    pub fn namespace_label(&self) -> String {
        namespace_label(&self.path())
    }
}

fn namespace_label(path: &[String]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join(".")
    }
}

/// place an operation: structural segments, then convention segments
pub fn place(operation: &Operation, convention: &GroupingConvention) -> Placement {
    let mut namespace: Vec<String> = operation
        .structural_path()
        .map(|field| field.to_snake_case())
        .collect();
    let (derived, method) = split_name(&operation.name, convention);
    namespace.extend(derived);
    Placement {
        kind: operation.kind,
        namespace,
        method,
    }
}

fn split_name(name: &str, convention: &GroupingConvention) -> (Vec<String>, String) {
    match convention {
        GroupingConvention::Flat => (Vec::new(), name.to_snake_case()),
        GroupingConvention::Delimiter { delimiter } => {
            let parts: Vec<&str> = if delimiter.is_empty() {
                vec![name]
            } else {
                name.split(delimiter.as_str()).collect()
            };
            if parts.len() < 2 || parts.iter().any(|p| p.is_empty()) {
                return (Vec::new(), name.to_snake_case());
            }
            let Some((method, segments)) = parts.split_last() else {
                return (Vec::new(), name.to_snake_case());
            };
            (
                segments.iter().map(|s| s.to_snake_case()).collect(),
                method.to_snake_case(),
            )
        }
        GroupingConvention::Nouns { nouns } => split_nouns(name, nouns),
    }
}

fn split_nouns(name: &str, nouns: &[String]) -> (Vec<String>, String) {
    let snake = name.to_snake_case();
    let words: Vec<&str> = snake.split('_').filter(|w| !w.is_empty()).collect();
    let mut noun_words: Vec<Vec<String>> = nouns
        .iter()
        .map(|noun| noun.to_snake_case().split('_').map(str::to_string).collect())
        .filter(|w: &Vec<String>| !w.is_empty())
        .collect();
    // longest match first
    noun_words.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut segments = Vec::new();
    let mut method_words = Vec::new();
    let mut idx = 0;
    while idx < words.len() {
        let matched = noun_words.iter().find(|noun| {
            idx + noun.len() <= words.len()
                && noun.iter().zip(&words[idx..]).all(|(n, w)| n == w)
        });
        match matched {
            Some(noun) => {
                segments.push(noun.join("_"));
                idx += noun.len();
            }
            None => {
                method_words.push(words[idx]);
                idx += 1;
            }
        }
    }

    if method_words.is_empty() {
        match segments.pop() {
            Some(last) => return (segments, last),
            None => return (Vec::new(), snake),
        }
    }
    (segments, method_words.join("_"))
}

/// operation placed on a namespace node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOperation {
    /// index into [`Document::operations`]
    pub index: usize,
    pub method: String,
}

/// one level of the generated client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceNode {
    /// last path segment, empty for the root
    pub name: String,
    /// starts with the kind keyword below the root
    pub path: Vec<String>,
    /// sorted by name
    pub children: Vec<NamespaceNode>,
    /// sorted by method name
    pub operations: Vec<PlacedOperation>,
}

impl NamespaceNode {
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// rust struct name for this level
    pub fn struct_name(&self, client_name: &str) -> String {
        if self.is_root() {
            client_name.to_string()
        } else {
            naming::namespace_struct(&self.path)
        }
    }

    /// this node and all descendants, parents first
    pub fn walk(&self) -> Vec<&NamespaceNode> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}

/// resolved client structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub root: NamespaceNode,
    placements: Vec<Placement>,
}

impl Topology {
    /// placement of the operation at `index`
    pub fn placement(&self, index: usize) -> Option<&Placement> {
        self.placements.get(index)
    }

    pub fn nodes(&self) -> Vec<&NamespaceNode> {
        self.root.walk()
    }
}

#[derive(Default)]
struct NodeBuilder {
    children: BTreeMap<String, NodeBuilder>,
    operations: BTreeMap<String, usize>,
}

impl NodeBuilder {
    fn finish(self, name: String, path: Vec<String>) -> NamespaceNode {
        let children = self
            .children
            .into_iter()
            .map(|(child, builder)| {
                let mut child_path = path.clone();
                child_path.push(child.clone());
                builder.finish(child, child_path)
            })
            .collect();
        NamespaceNode {
            name,
            path,
            children,
            operations: self
                .operations
                .into_iter()
                .map(|(method, index)| PlacedOperation { index, method })
                .collect(),
        }
    }
}

/// resolve the namespace trees for every operation in the document
pub fn resolve(doc: &Document, convention: &GroupingConvention) -> Result<Topology> {
    let placements: Vec<Placement> = doc
        .operations
        .iter()
        .map(|op| place(op, convention))
        .collect();

    let mut root = NodeBuilder::default();
    for (index, placement) in placements.iter().enumerate() {
        let mut node = &mut root;
        for segment in &placement.path() {
            node = node.children.entry(segment.clone()).or_default();
        }
        if let Some(existing) = node.operations.get(&placement.method) {
            return Err(Error::DuplicateOperation {
                namespace: placement.namespace_label(),
                method: placement.method.clone(),
                first: doc.operations[*existing].label(),
                second: doc.operations[index].label(),
            });
        }
        node.operations.insert(placement.method.clone(), index);
    }

    let root = root.finish(String::new(), Vec::new());
    check_node(doc, &root)?;
    check_struct_names(&root)?;

    tracing::info!(
        namespaces = root.walk().len() - 1,
        operations = placements.len(),
        "resolved client topology"
    );
    Ok(Topology { root, placements })
}

fn check_node(doc: &Document, node: &NamespaceNode) -> Result<()> {
    for op in &node.operations {
        if let Some(child) = node.children.iter().find(|c| c.name == op.method) {
            return Err(Error::DuplicateOperation {
                namespace: namespace_label(&node.path),
                method: op.method.clone(),
                first: doc.operations[op.index].label(),
                second: format!("namespace `{}`", namespace_label(&child.path)),
            });
        }
    }
    for child in &node.children {
        check_node(doc, child)?;
    }
    Ok(())
}

fn check_struct_names(root: &NamespaceNode) -> Result<()> {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    for node in root.walk().into_iter().filter(|n| !n.is_root()) {
        let name = naming::namespace_struct(&node.path);
        let label = namespace_label(&node.path);
        if let Some(first) = seen.insert(name.clone(), label.clone()) {
            return Err(Error::NameCollision {
                scope: "namespace structs".to_string(),
                first,
                second: label,
                normalized: name,
            });
        }
    }
    Ok(())
}
