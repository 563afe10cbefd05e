//! Ordered merging of named top-level sections
//!
//! `default<-local` merges section `local` over section `default`; the
//! merged mapping becomes the new root. A section may name its own
//! prerequisites under the reserved key [`PATCH_DIRECTIVE`]; they are
//! expanded in front of it and the key is removed from the data.

use crate::constants::{PATCH_DIRECTIVE, PATCH_SEPARATOR};
use crate::node::{NodeId, Tree};
use crate::value::Value;
use indexmap::IndexMap;
use log::{debug, error, warn};
use std::fmt;
use std::str::FromStr;

/// The sections to merge, leftmost first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PatchOrder(Vec<String>);

impl PatchOrder {
    pub fn new(names: Vec<String>) -> Self {
        PatchOrder(names)
    }

    /// Parses the `a<-b<-c` syntax. Blank entries are dropped.
    pub fn parse(text: &str) -> Self {
        PatchOrder(
            text.split(PATCH_SEPARATOR)
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Reads a patch expression given as a string or a list of names.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(text) => Some(PatchOrder::parse(text)),
            Value::List(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map(PatchOrder),
            _ => None,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for PatchOrder {
    type Err = std::convert::Infallible;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Ok(PatchOrder::parse(text))
    }
}

impl From<&str> for PatchOrder {
    fn from(text: &str) -> Self {
        PatchOrder::parse(text)
    }
}

impl From<Vec<&str>> for PatchOrder {
    fn from(names: Vec<&str>) -> Self {
        PatchOrder(names.into_iter().map(str::to_string).collect())
    }
}

impl fmt::Display for PatchOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(PATCH_SEPARATOR))
    }
}

/// Expands every section's prerequisite chain in front of it and strips the
/// directive. Unknown sections and cycles are logged and left out.
pub fn expand(tree: &mut Tree, root: NodeId, order: &PatchOrder) -> PatchOrder {
    let mut expanded = Vec::new();
    let mut visiting = Vec::new();
    for name in order.names() {
        expand_section(tree, root, name, &mut expanded, &mut visiting);
    }
    let expanded = PatchOrder(expanded);
    debug!("Expanded patch order {order} to {expanded}");
    expanded
}

fn expand_section(
    tree: &mut Tree,
    root: NodeId,
    name: &str,
    expanded: &mut Vec<String>,
    visiting: &mut Vec<String>,
) {
    if visiting.iter().any(|v| v == name) {
        error!("Patch cycle through section {name:?} ({})", visiting.join(PATCH_SEPARATOR));
        return;
    }
    let Some(section) = tree.child_named(root, name) else {
        error!("Section not found: {name:?}");
        return;
    };
    if let Some(directive) = tree.child_named(section, PATCH_DIRECTIVE) {
        let raw = tree.to_value(directive);
        tree.remove(directive);
        match PatchOrder::from_value(&raw) {
            Some(prerequisites) => {
                visiting.push(name.to_string());
                for prerequisite in prerequisites.names() {
                    expand_section(tree, root, prerequisite, expanded, visiting);
                }
                visiting.pop();
            }
            None => error!("Could not parse the {PATCH_DIRECTIVE} of {name:?}: {raw}"),
        }
    }
    expanded.push(name.to_string());
}

/// Merges the named sections of `root` left to right into a new detached
/// dict node and returns it. The sections are consumed.
pub fn patch_sections(tree: &mut Tree, root: NodeId, order: &PatchOrder) -> NodeId {
    let options = tree[root].options;
    let merged = tree.build(Value::Map(IndexMap::new()), options);
    let names = order.names();
    for (position, name) in names.iter().enumerate() {
        let Some(section) = tree.child_named(root, name) else {
            error!("Section not found: {name:?}");
            continue;
        };
        if !tree[section].is_dict() {
            error!("Section {name:?} is not a mapping, it is a {}", tree[section].shape());
            continue;
        }
        debug!("Patching with [{name:?}]");
        if names[position + 1..].contains(name) {
            let copy = tree.copy_subtree(section);
            merge_into(tree, merged, copy);
            tree.free(copy);
        } else {
            merge_into(tree, merged, section);
        }
    }
    merged
}

/// Right-biased deep merge of dict `source` into dict `target`.
///
/// Children of `source` are moved, not copied. Dicts merge recursively, a
/// scalar over a scalar updates the existing node in place, anything else
/// (lists included) replaces the existing child. Schema-synthesised
/// subtrees of `source` without any input data are skipped.
pub fn merge_into(tree: &mut Tree, target: NodeId, source: NodeId) {
    for (key, incoming) in tree.entries(source) {
        if !tree.holds_data(incoming) {
            continue;
        }
        let Some(existing) = tree.child(target, &key) else {
            tree.detach(incoming);
            if let Err(err) = tree.attach(target, key, incoming) {
                warn!("Cannot merge {:?}: {err}", tree.name(incoming));
            }
            continue;
        };

        let (this, other) = (&tree[existing], &tree[incoming]);
        if this.is_dict() && other.is_dict() {
            merge_into(tree, existing, incoming);
        } else if let (true, Some(scalar)) = (this.is_scalar(), other.scalar().cloned()) {
            let node = &mut tree[existing];
            if let Some(current) = node.scalar_mut() {
                *current = scalar;
            }
            node.meta.missing = false;
            node.meta.is_default = false;
        } else {
            debug!("Replacing {:?} ({} over {})", tree.name(existing), other.shape(), this.shape());
            tree.detach(incoming);
            if let Err(err) = tree.attach(target, key, incoming) {
                warn!("Cannot merge into {:?}: {err}", tree.name(target));
            }
        }
    }
}
