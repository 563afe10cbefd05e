//! The configuration facade
//!
//! [`Config`] owns a node [`Tree`] together with everything needed to
//! rebuild it: the raw input, the definitions and the requested patch
//! order. Reads go through the interpolation pipeline; writes re-apply the
//! definitions so synthesised fields and metadata stay current.
//!
//! A process-wide instance is available through [`global`]. Code that must
//! not observe later changes to it takes a [`SharedConfig::snapshot`].

use crate::error::{Error, Result};
use crate::magic;
use crate::node::{NodeId, NodeKind, Tree};
use crate::options::Options;
use crate::patch::{self, PatchOrder};
use crate::path::{Key, KeyPath};
use crate::schema;
use crate::validate::{self, ErrorReport};
use crate::value::Value;
use indexmap::IndexMap;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Config {
    tree: Tree,
    root: NodeId,
    options: Options,
    definition: Option<Value>,
    /// The order as requested, before directive expansion.
    patch: Option<PatchOrder>,
    expanded: Option<PatchOrder>,
    raw: Value,
}

impl Default for Config {
    fn default() -> Self {
        Config::builder().build()
    }
}

/// Collects the inputs of a [`Config`] before building it.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    data: Option<Value>,
    definitions: Option<Value>,
    patch: Option<PatchOrder>,
    options: Options,
}

impl ConfigBuilder {
    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn definitions(mut self, definitions: Value) -> Self {
        self.definitions = Some(definitions);
        self
    }

    pub fn patch(mut self, order: impl Into<PatchOrder>) -> Self {
        self.patch = Some(order.into());
        self
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Builds the tree, patches it, then applies the definitions.
    pub fn build(self) -> Config {
        let raw = self.data.unwrap_or_else(|| Value::Map(IndexMap::new()));
        let mut tree = Tree::new();
        let root = tree.build(raw.clone(), self.options);
        let mut config = Config {
            tree,
            root,
            options: self.options,
            definition: None,
            patch: None,
            expanded: None,
            raw,
        };
        if let Some(order) = self.patch.filter(|order| !order.is_empty()) {
            config.patch_tree(order);
        }
        if let Some(definitions) = self.definitions {
            config.apply_definitions(definitions);
        }
        config
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Builds a configuration with default [`Options`].
    ///
    /// # Arguments
    /// * `raw` - The data, usually a mapping
    /// * `definitions` - Optional definitions document
    /// * `patch` - Optional order of top-level sections to merge
    pub fn build(raw: Value, definitions: Option<Value>, patch: Option<PatchOrder>) -> Config {
        let mut builder = Config::builder().data(raw);
        if let Some(definitions) = definitions {
            builder = builder.definitions(definitions);
        }
        if let Some(patch) = patch {
            builder = builder.patch(patch);
        }
        builder.build()
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn definition(&self) -> Option<&Value> {
        self.definition.as_ref()
    }

    /// The patch order last requested, before directive expansion.
    pub fn patch_order(&self) -> Option<&PatchOrder> {
        self.patch.as_ref()
    }

    /// The patch order actually merged, prerequisites included.
    pub fn expanded_patch_order(&self) -> Option<&PatchOrder> {
        self.expanded.as_ref()
    }

    /// The input data as given, before any patching.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// The fully resolved value of a node.
    pub fn resolve_node(&self, id: NodeId) -> Value {
        magic::read(self, id, &mut Vec::new())
    }

    pub fn node(&self, path: &str) -> Result<NodeId> {
        let path = KeyPath::parse(path)?;
        self.tree.find(self.root, &path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.node(path).is_ok()
    }

    /// Reads the resolved value at `path`.
    pub fn get(&self, path: &str) -> Result<Value> {
        self.node(path).map(|id| self.resolve_node(id))
    }

    /// Reads `path`, falling back to `default` when it is missing or absent.
    pub fn get_or(&self, path: &str, default: Value) -> Value {
        match self.get(path) {
            Ok(value) if !value.is_absent() => value,
            _ => default,
        }
    }

    /// Reads `path`, answering [`Value::Absent`] when it does not exist.
    pub fn lookup(&self, path: &str) -> Value {
        self.get(path).unwrap_or_default()
    }

    /// Sets the value at `path`. The parent must exist.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<NodeId> {
        let parsed = KeyPath::parse(path)?;
        let Some((parent, key)) = parsed.split_last() else {
            return Err(Error::InvalidPath {
                path: path.to_string(),
                reason: "the root cannot be assigned".to_string(),
            });
        };
        let parent = self.tree.find(self.root, &parent)?;
        let id = self.tree.assign(parent, key.clone(), value.into())?;
        self.tree.mark_present(id);
        debug!("Set {:?}", self.tree.name(id));
        self.reapply_definitions();
        Ok(id)
    }

    /// Sets the value at `path`, creating intermediate mappings on the way.
    ///
    /// An intermediate holding nothing is replaced by a mapping; one holding
    /// a value is an error.
    pub fn override_key(&mut self, path: &str, value: impl Into<Value>) -> Result<NodeId> {
        let parsed = KeyPath::parse(path)?;
        let Some((parents, last)) = parsed.split_last() else {
            return Err(Error::InvalidPath {
                path: path.to_string(),
                reason: "the root cannot be overridden".to_string(),
            });
        };
        let mut current = self.root;
        for key in parents.keys() {
            current = match self.tree.child(current, key) {
                Some(child) if self.tree[child].is_container() => child,
                Some(child) => {
                    let holds_nothing = self
                        .tree[child]
                        .scalar()
                        .is_some_and(|scalar| scalar.value.is_nothing());
                    if !holds_nothing {
                        return Err(Error::NotAContainer { path: self.tree.name(child) });
                    }
                    debug!("Replacing empty {:?} with a mapping", self.tree.name(child));
                    self.tree.assign(current, key.clone(), Value::Map(IndexMap::new()))?
                }
                None => {
                    debug!("Creating {key} under {:?}", self.tree.name(current));
                    self.tree.assign(current, key.clone(), Value::Map(IndexMap::new()))?
                }
            };
        }
        let id = self.tree.assign(current, last.clone(), value.into())?;
        self.tree.mark_present(id);
        info!("Overrode {:?}", self.tree.name(id));
        self.reapply_definitions();
        Ok(id)
    }

    /// Removes the node at `path` and returns its resolved value.
    pub fn remove(&mut self, path: &str) -> Result<Value> {
        let id = self.node(path)?;
        if id == self.root {
            return Err(Error::InvalidPath {
                path: path.to_string(),
                reason: "the root cannot be removed".to_string(),
            });
        }
        let value = self.resolve_node(id);
        self.tree.remove(id);
        Ok(value)
    }

    /// Merges the named top-level sections of the current tree into a new
    /// root, then re-applies the definitions.
    pub fn patch(&mut self, order: impl Into<PatchOrder>) {
        self.patch_tree(order.into());
        self.reapply_definitions();
    }

    fn patch_tree(&mut self, order: PatchOrder) {
        let expanded = patch::expand(&mut self.tree, self.root, &order);
        let merged = patch::patch_sections(&mut self.tree, self.root, &expanded);
        self.tree.free(self.root);
        self.root = merged;
        info!("Patched configuration with {expanded}");
        self.patch = Some(order);
        self.expanded = Some(expanded);
    }

    /// Rebuilds the tree from the raw input and patches it again, with
    /// `order` or the last requested order.
    pub fn reset_sections(&mut self, order: Option<PatchOrder>) {
        let order = order.or_else(|| self.patch.clone());
        self.tree = Tree::new();
        self.root = self.tree.build(self.raw.clone(), self.options);
        self.patch = None;
        self.expanded = None;
        if let Some(order) = order.filter(|order| !order.is_empty()) {
            self.patch_tree(order);
        }
        self.reapply_definitions();
    }

    /// Applies a definitions document to the whole tree and keeps it for
    /// later writes.
    pub fn apply_definitions(&mut self, definitions: Value) {
        self.definition = Some(definitions);
        self.reapply_definitions();
    }

    fn reapply_definitions(&mut self) {
        if let Some(definitions) = self.definition.clone() {
            let root = self.root;
            schema::apply(self, root, &definitions);
        }
    }

    /// Writes every resolved value back into the tree.
    ///
    /// The inputs stay available through [`Config::reset_values`]. A value
    /// that resolved to a section rebuilds its node as that section.
    pub fn resolve_all(&mut self) {
        let resolved: Vec<(NodeId, Value)> = self
            .tree
            .descendants(self.root)
            .into_iter()
            .filter(|id| self.tree[*id].is_scalar())
            .map(|id| (id, self.resolve_node(id)))
            .collect();

        for (id, value) in resolved {
            if value.is_container() {
                let (Some(parent), Some(key)) = (self.tree[id].parent, self.tree[id].key.clone()) else {
                    warn!("Cannot expand the root into a section");
                    continue;
                };
                if let Err(err) = self.tree.assign(parent, key, value) {
                    warn!("Cannot expand {:?}: {err}", self.tree.name(id));
                }
                continue;
            }
            let node = &mut self.tree[id];
            let from_default = node.meta.missing && !node.meta.default.is_nothing() && value == node.meta.default;
            if let NodeKind::Scalar(scalar) = &mut node.kind {
                scalar.value = value;
            }
            node.meta.is_default = from_default;
        }
        self.reapply_definitions();
    }

    /// Restores every scalar to its input value.
    pub fn reset_values(&mut self) {
        self.tree.reset_values(self.root);
    }

    /// Validates the tree. `strict` also checks synthesised fields.
    pub fn validate(&self, strict: bool) -> ErrorReport {
        validate::validate(self, strict || self.options.strict)
    }

    /// The resolved configuration as plain data.
    pub fn to_value(&self) -> Value {
        self.resolve_node(self.root)
    }

    /// The working values without interpolation or defaults.
    pub fn to_raw_value(&self) -> Value {
        self.tree.to_value(self.root)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.to_value())?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_value())?)
    }

    /// An independent deep copy.
    pub fn local(&self) -> Config {
        self.clone()
    }
}

/// A configuration shared between owners.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig(Arc<RwLock<Config>>);

impl SharedConfig {
    pub fn new(config: Config) -> Self {
        SharedConfig(Arc::new(RwLock::new(config)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Config> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Config> {
        self.0.write()
    }

    /// Swaps in a new configuration for every holder of this handle.
    pub fn replace(&self, config: Config) -> Config {
        std::mem::replace(&mut *self.0.write(), config)
    }

    /// A copy that does not observe later changes.
    pub fn snapshot(&self) -> Config {
        self.0.read().local()
    }
}

static GLOBAL: Lazy<SharedConfig> = Lazy::new(SharedConfig::default);

/// The process-wide configuration.
pub fn global() -> &'static SharedConfig {
    &GLOBAL
}
