//! Definitions: schema metadata laid over a data tree
//!
//! A definitions document mirrors the data. Keys starting with `.` declare
//! fields; the remaining keys (`dtype`, `default`, `required`, `checks`,
//! `tags`, `subtypes`, `items`, `match`, ...) describe the node itself.
//! Applying a definition synthesises declared fields the data lacks,
//! attaches the metadata and recurses.

mod definition;

pub use definition::{Case, Definition};

use crate::config::Config;
use crate::constants::schema_keys;
use crate::dtype::{DType, TypeRef};
use crate::node::{NodeId, NodeKind, Tree};
use crate::path::Key;
use crate::value::Value;
use indexmap::IndexMap;
use log::{debug, trace, warn};

/// Applies the raw definition `raw` to node `id` and its descendants.
///
/// Re-applying a definition equal to the one already recorded on a node
/// leaves that node's metadata untouched.
pub fn apply(config: &mut Config, id: NodeId, raw: &Value) {
    let effective = effective_definition(config, id, raw);
    let def = Definition::parse(&effective);

    let tree = config.tree_mut();
    if tree[id].meta.applied.as_ref() == Some(&effective) {
        trace!("Definitions of {:?} unchanged", tree.name(id));
    } else {
        debug!("Applying definitions to {:?}", tree.name(id));
        let meta = &mut tree[id].meta;
        def.attach(meta);
        meta.applied = Some(effective);
    }
    synthesize(tree, id, &def);

    let targets: Vec<(NodeId, Value)> = match &tree[id].kind {
        NodeKind::Dict(children) => def
            .fields
            .iter()
            .filter_map(|(name, raw)| children.get(name).map(|child| (*child, raw.clone())))
            .collect(),
        NodeKind::List(items) => items
            .iter()
            .enumerate()
            .filter_map(|(index, child)| def.element(index).map(|raw| (*child, raw.clone())))
            .collect(),
        NodeKind::Scalar(_) => Vec::new(),
    };
    for (child, raw) in targets {
        apply(config, child, &raw);
    }
}

/// Creates the declared fields a dict node does not hold yet.
fn synthesize(tree: &mut Tree, id: NodeId, def: &Definition) {
    if !tree[id].is_dict() {
        if !def.fields.is_empty() {
            warn!(
                "{:?} is a {} but its definitions declare fields, skipping them",
                tree.name(id),
                tree[id].shape()
            );
        }
        return;
    }
    for (name, raw) in &def.fields {
        if tree.child_named(id, name).is_some() {
            continue;
        }
        let dtype = raw
            .get(schema_keys::DTYPE)
            .and_then(TypeRef::from_value)
            .unwrap_or_default();
        let value = match dtype.primary() {
            DType::Dict => Value::Map(IndexMap::new()),
            DType::List => Value::List(Vec::new()),
            _ => Value::Absent,
        };
        debug!("Creating missing {} field {name:?} under {:?}", dtype.label(), tree.name(id));
        match tree.assign(id, Key::from(name.as_str()), value) {
            Ok(child) => tree[child].meta.missing = true,
            Err(err) => warn!("Cannot create field {name:?}: {err}"),
        }
    }
}

/// `raw` with every matching `match` case merged on top, in order.
pub fn effective_definition(config: &Config, id: NodeId, raw: &Value) -> Value {
    let Some(cases) = raw.get(schema_keys::MATCH).and_then(Value::as_list) else {
        return raw.clone();
    };
    let mut effective = raw.clone();
    if let Some(map) = effective.as_map_mut() {
        map.shift_remove(schema_keys::MATCH);
    }

    let tree = config.tree();
    let label = match &tree[id].kind {
        NodeKind::Dict(_) => "dict",
        NodeKind::List(_) => "list",
        NodeKind::Scalar(_) => config.resolve_node(id).type_label(),
    };
    for case in cases.iter().filter_map(Case::parse) {
        if !case.accepts_dtype(label) {
            continue;
        }
        let matched = case.matches_any_key()
            || match tree.child_named(id, &case.key) {
                Some(child) => {
                    let value = config.resolve_node(child);
                    if case.value.is_absent() {
                        !value.is_nothing()
                    } else {
                        value == case.value
                    }
                }
                None => false,
            };
        if matched {
            debug!("Matched case {}={} on {:?}", case.key, case.value, tree.name(id));
            effective.merge(case.fragment);
        }
    }
    effective
}
