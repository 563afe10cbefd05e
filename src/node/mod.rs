//! The configuration tree
//!
//! Nodes live in an arena owned by [`Tree`] and refer to each other by
//! [`NodeId`]. A node knows its key and parent; its dotted name is always
//! recomputed from those, so moving a subtree never leaves a stale name.

mod meta;

pub use meta::{CheckSpec, Meta, Subtype};

use crate::error::{Error, Result};
use crate::options::Options;
use crate::path::{Key, KeyPath};
use crate::value::Value;
use indexmap::IndexMap;
use log::trace;
use std::ops::{Index, IndexMut};

/// Handle of a node inside its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// The input value of a scalar next to its working value.
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    pub original: Value,
    pub value: Value,
}

impl Scalar {
    pub fn new(value: Value) -> Self {
        Self { original: value.clone(), value }
    }

    pub fn reset(&mut self) {
        self.value = self.original.clone();
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Dict(IndexMap<String, NodeId>),
    List(Vec<NodeId>),
    Scalar(Scalar),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub key: Option<Key>,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    pub meta: Meta,
    pub options: Options,
}

impl Node {
    fn new(kind: NodeKind, options: Options) -> Self {
        Self { key: None, parent: None, kind, meta: Meta::default(), options }
    }

    pub fn is_dict(&self) -> bool {
        matches!(self.kind, NodeKind::Dict(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind, NodeKind::List(_))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, NodeKind::Scalar(_))
    }

    pub fn is_container(&self) -> bool {
        !self.is_scalar()
    }

    pub fn scalar(&self) -> Option<&Scalar> {
        match &self.kind {
            NodeKind::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn scalar_mut(&mut self) -> Option<&mut Scalar> {
        match &mut self.kind {
            NodeKind::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// `dict`, `list` or `var`, as shown in debug output and templates.
    pub fn shape(&self) -> &'static str {
        match self.kind {
            NodeKind::Dict(_) => "dict",
            NodeKind::List(_) => "list",
            NodeKind::Scalar(_) => "var",
        }
    }
}

/// Arena of nodes. Freed slots are reused.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
}

impl Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        match self.slots.get(id.0) {
            Some(Some(node)) => node,
            _ => panic!("node {id:?} is not part of this tree"),
        }
    }
}

impl IndexMut<NodeId> for Tree {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        match self.slots.get_mut(id.0) {
            Some(Some(node)) => node,
            _ => panic!("node {id:?} is not part of this tree"),
        }
    }
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    /// Builds a detached subtree from a raw value: maps become dicts,
    /// sequences become lists and everything else a scalar.
    pub fn build(&mut self, value: Value, options: Options) -> NodeId {
        match value {
            Value::Map(map) => {
                let id = self.alloc(Node::new(NodeKind::Dict(IndexMap::new()), options));
                for (key, child) in map {
                    let child_id = self.build(child, options);
                    self.link(id, Key::Name(key.clone()), child_id);
                    if let NodeKind::Dict(children) = &mut self[id].kind {
                        children.insert(key, child_id);
                    }
                }
                id
            }
            Value::List(items) => {
                let id = self.alloc(Node::new(NodeKind::List(Vec::new()), options));
                for (index, item) in items.into_iter().enumerate() {
                    let child_id = self.build(item, options);
                    self.link(id, Key::Index(index), child_id);
                    if let NodeKind::List(children) = &mut self[id].kind {
                        children.push(child_id);
                    }
                }
                id
            }
            scalar => self.alloc(Node::new(NodeKind::Scalar(Scalar::new(scalar)), options)),
        }
    }

    fn link(&mut self, parent: NodeId, key: Key, child: NodeId) {
        let node = &mut self[child];
        node.parent = Some(parent);
        node.key = Some(key);
    }

    /// Child ids in order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match &self[id].kind {
            NodeKind::Dict(map) => map.values().copied().collect(),
            NodeKind::List(items) => items.clone(),
            NodeKind::Scalar(_) => Vec::new(),
        }
    }

    /// Child keys and ids in order.
    pub fn entries(&self, id: NodeId) -> Vec<(Key, NodeId)> {
        match &self[id].kind {
            NodeKind::Dict(map) => map.iter().map(|(k, v)| (Key::Name(k.clone()), *v)).collect(),
            NodeKind::List(items) => {
                items.iter().enumerate().map(|(i, v)| (Key::Index(i), *v)).collect()
            }
            NodeKind::Scalar(_) => Vec::new(),
        }
    }

    pub fn child(&self, id: NodeId, key: &Key) -> Option<NodeId> {
        match &self.get(id)?.kind {
            NodeKind::Dict(map) => map.get(&key.to_name()).copied(),
            NodeKind::List(items) => items.get(key.as_index()?).copied(),
            NodeKind::Scalar(_) => None,
        }
    }

    pub fn child_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.child(id, &Key::from(name))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self[id].parent
    }

    pub fn root_of(&self, mut id: NodeId) -> NodeId {
        while let Some(parent) = self[id].parent {
            id = parent;
        }
        id
    }

    /// The dotted name of a node relative to the top of its tree.
    pub fn name(&self, id: NodeId) -> String {
        self.path_of(id).to_string()
    }

    pub fn path_of(&self, mut id: NodeId) -> KeyPath {
        let mut keys = Vec::new();
        while let Some(node) = self.get(id) {
            match (&node.key, node.parent) {
                (Some(key), Some(parent)) => {
                    keys.push(key.clone());
                    id = parent;
                }
                _ => break,
            }
        }
        keys.reverse();
        KeyPath::from(keys)
    }

    /// Walks `path` down from `from`.
    pub fn find(&self, from: NodeId, path: &KeyPath) -> Result<NodeId> {
        let mut current = from;
        for key in path.keys() {
            if self[current].is_scalar() {
                return Err(Error::NotAContainer { path: self.name(current) });
            }
            current = self
                .child(current, key)
                .ok_or_else(|| Error::KeyNotFound { path: path.to_string() })?;
        }
        Ok(current)
    }

    /// Sets `key` of `parent` to `value`.
    ///
    /// An existing scalar receiving a scalar is updated in place so its
    /// identity and metadata survive; anything else is built fresh and
    /// replaces the previous child.
    pub fn assign(&mut self, parent: NodeId, key: Key, value: Value) -> Result<NodeId> {
        if let Some(existing) = self.child(parent, &key) {
            if !value.is_container() {
                let node = &mut self[existing];
                if let Some(scalar) = node.scalar_mut() {
                    *scalar = Scalar::new(value);
                    node.meta.missing = false;
                    node.meta.is_default = false;
                    return Ok(existing);
                }
            }
        }
        let options = self[parent].options;
        let id = self.build(value, options);
        if let Err(err) = self.attach(parent, key, id) {
            self.free(id);
            return Err(err);
        }
        Ok(id)
    }

    /// Places the detached node `child` under `parent`, replacing and freeing
    /// whatever was held at `key`. Index `len` appends to a list.
    pub fn attach(&mut self, parent: NodeId, key: Key, child: NodeId) -> Result<()> {
        let parent_name = self.name(parent);
        let (key, replaced) = match &mut self[parent].kind {
            NodeKind::Dict(map) => {
                let name = key.to_name();
                let replaced = map.insert(name.clone(), child);
                (Key::Name(name), replaced)
            }
            NodeKind::List(items) => {
                let index = key.as_index().ok_or_else(|| Error::InvalidPath {
                    path: format!("{parent_name}.{key}"),
                    reason: "list children are addressed by index".to_string(),
                })?;
                if index < items.len() {
                    let replaced = std::mem::replace(&mut items[index], child);
                    (Key::Index(index), Some(replaced))
                } else if index == items.len() {
                    items.push(child);
                    (Key::Index(index), None)
                } else {
                    return Err(Error::InvalidPath {
                        path: format!("{parent_name}[{index}]"),
                        reason: format!("index out of range for a list of {}", items.len()),
                    });
                }
            }
            NodeKind::Scalar(_) => return Err(Error::NotAContainer { path: parent_name }),
        };
        self.link(parent, key, child);
        if let Some(old) = replaced.filter(|old| *old != child) {
            self.free(old);
        }
        Ok(())
    }

    /// Unlinks a node from its parent without freeing it. Later list
    /// siblings shift down one position.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self[id].parent else {
            return;
        };
        let mut shifted = Vec::new();
        match &mut self[parent].kind {
            NodeKind::Dict(map) => {
                map.retain(|_, child| *child != id);
            }
            NodeKind::List(items) => {
                if let Some(position) = items.iter().position(|child| *child == id) {
                    items.remove(position);
                    shifted = items[position..]
                        .iter()
                        .enumerate()
                        .map(|(offset, child)| (*child, position + offset))
                        .collect();
                }
            }
            NodeKind::Scalar(_) => {}
        }
        for (child, index) in shifted {
            self[child].key = Some(Key::Index(index));
        }
        let node = &mut self[id];
        node.parent = None;
        node.key = None;
    }

    /// Detaches and frees a subtree.
    pub fn remove(&mut self, id: NodeId) {
        self.detach(id);
        self.free(id);
    }

    /// Frees a subtree without touching its parent.
    pub fn free(&mut self, id: NodeId) {
        for node in self.descendants(id) {
            if let Some(slot) = self.slots.get_mut(node.0) {
                if slot.take().is_some() {
                    self.free.push(node.0);
                }
            }
        }
        trace!("Freed subtree {id:?}, {} live nodes", self.len());
    }

    /// Marks `id` and its ancestors as holding input data.
    pub fn mark_present(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node) = current {
            self[node].meta.missing = false;
            current = self[node].parent;
        }
    }

    /// Whether any node of the subtree came from input data rather than
    /// from the definitions.
    pub fn holds_data(&self, id: NodeId) -> bool {
        self.descendants(id).iter().any(|node| !self[*node].meta.missing)
    }

    /// The node and all its descendants, parents before children.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            let mut children = self.children(current);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Deep copies a subtree into a new detached subtree.
    pub fn copy_subtree(&mut self, id: NodeId) -> NodeId {
        let mut node = self[id].clone();
        node.parent = None;
        node.key = None;
        let entries = self.entries(id);
        match &mut node.kind {
            NodeKind::Dict(map) => map.clear(),
            NodeKind::List(items) => items.clear(),
            NodeKind::Scalar(_) => {}
        }
        let copy = self.alloc(node);
        for (key, child) in entries {
            let child_copy = self.copy_subtree(child);
            self.link(copy, key.clone(), child_copy);
            match &mut self[copy].kind {
                NodeKind::Dict(map) => {
                    map.insert(key.to_name(), child_copy);
                }
                NodeKind::List(items) => items.push(child_copy),
                NodeKind::Scalar(_) => {}
            }
        }
        copy
    }

    /// The unresolved working values of a subtree.
    pub fn to_value(&self, id: NodeId) -> Value {
        match &self[id].kind {
            NodeKind::Dict(map) => {
                Value::Map(map.iter().map(|(k, v)| (k.clone(), self.to_value(*v))).collect())
            }
            NodeKind::List(items) => Value::List(items.iter().map(|v| self.to_value(*v)).collect()),
            NodeKind::Scalar(scalar) => scalar.value.clone(),
        }
    }

    /// Restores every scalar of a subtree to its input value.
    pub fn reset_values(&mut self, id: NodeId) {
        for node in self.descendants(id) {
            let node = &mut self[node];
            if let Some(scalar) = node.scalar_mut() {
                scalar.reset();
                node.meta.is_default = false;
            }
        }
    }

    /// Replaces the options of every node of a subtree.
    pub fn set_options(&mut self, id: NodeId, options: Options) {
        for node in self.descendants(id) {
            self[node].options = options;
        }
    }
}
