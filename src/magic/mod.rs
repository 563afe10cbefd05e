//! Interpolation of `${...}` references
//!
//! | syntax       | meaning                                               |
//! |--------------|-------------------------------------------------------|
//! | `${.a.b}`    | value at `a.b`, looked up from the root               |
//! | `${..a}`     | `a` next to the referencing value (one more `.` per level up) |
//! | `${$NAME}`   | environment variable `NAME`                           |
//! | `${?func}`   | result of registered function `func`, as text         |
//! | `${!func}`   | result of `func` replacing the whole value            |
//!
//! A value that is exactly one reference takes the referenced value as is,
//! so numbers, lists and whole sections flow through untouched. Embedded
//! references are stringified; those resolving to nothing or to a section
//! are left in place.

mod parse;

pub use parse::{contains_magic, find, Magic, Marker};

use crate::config::Config;
use crate::node::{NodeId, NodeKind};
use crate::path::KeyPath;
use crate::registry::{self, Call};
use crate::value::Value;
use log::{debug, trace, warn};

/// Resolves the references in `text`, read on behalf of node `id`.
pub fn resolve(config: &Config, id: NodeId, text: &str, stack: &mut Vec<NodeId>) -> Value {
    let relativity = config.tree()[id].options.relativity;
    let magics = find(text, relativity);
    if magics.is_empty() {
        return Value::Str(text.to_string());
    }

    if let [only] = magics.as_slice() {
        if only.start == 0 && only.end == text.len() {
            if let Marker::Replace(name) = &only.marker {
                match registry::call(name, &Call::default()) {
                    Ok(value) => {
                        trace!("Replacing the whole value with the result of {name:?}");
                        return value;
                    }
                    Err(err) => {
                        warn!("Interpolating function {name:?} failed: {err}");
                        return Value::Str(text.to_string());
                    }
                }
            }
            let value = lookup(config, id, &only.marker, stack);
            if value.is_absent() {
                debug!("{} resolved to nothing, leaving it as is", only.text);
                return Value::Str(text.to_string());
            }
            trace!("Returning single-value lookup of {}", only.text);
            return value;
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for magic in &magics {
        out.push_str(&text[last..magic.start]);
        let replacement = match &magic.marker {
            Marker::Replace(name) => {
                warn!("${{!{name}}} can only be the whole value, leaving it as is in {text:?}");
                None
            }
            marker => match lookup(config, id, marker, stack) {
                Value::Absent => None,
                value if value.is_container() => {
                    debug!("{} is a section, refusing to embed it", magic.text);
                    None
                }
                value => Some(value.to_string()),
            },
        };
        match replacement {
            Some(replacement) => {
                trace!("Replacing {} with {replacement:?}", magic.text);
                out.push_str(&replacement);
            }
            None => out.push_str(&magic.text),
        }
        last = magic.end;
    }
    out.push_str(&text[last..]);
    Value::Str(out)
}

fn lookup(config: &Config, id: NodeId, marker: &Marker, stack: &mut Vec<NodeId>) -> Value {
    match marker {
        Marker::Env(name) => {
            let call = Call::default().with_args(vec![Value::from(name.as_str())]);
            registry::call("get_env", &call).unwrap_or(Value::Absent)
        }
        Marker::Call(name) | Marker::Replace(name) => match registry::call(name, &Call::default()) {
            Ok(value) => value,
            Err(err) => {
                warn!("Interpolating function {name:?} failed: {err}");
                Value::Absent
            }
        },
        Marker::Path { up, path } => lookup_path(config, id, *up, path, stack),
        Marker::Unknown(body) => {
            debug!("Unrecognised reference ${{{body}}}");
            Value::Absent
        }
    }
}

fn lookup_path(
    config: &Config,
    id: NodeId,
    up: Option<usize>,
    path: &str,
    stack: &mut Vec<NodeId>,
) -> Value {
    let tree = config.tree();
    let start = match up {
        None => tree.root_of(id),
        Some(levels) => {
            let mut current = id;
            for _ in 0..levels {
                match tree.parent(current) {
                    Some(parent) => current = parent,
                    None => {
                        debug!("Cannot climb {levels} levels from {:?}", tree.name(id));
                        return Value::Absent;
                    }
                }
            }
            current
        }
    };
    let target = match KeyPath::parse(path).and_then(|path| tree.find(start, &path)) {
        Ok(target) => target,
        Err(err) => {
            debug!("Lookup of {path:?} for {:?} failed: {err}", tree.name(id));
            return Value::Absent;
        }
    };

    let node = &tree[target];
    match &node.kind {
        NodeKind::Scalar(scalar) if !node.options.recursive => scalar.value.clone(),
        _ => read(config, target, stack),
    }
}

/// Reads the fully resolved value of a node.
///
/// `stack` holds the nodes currently being read; reaching one of them
/// again is a reference cycle, answered with the raw value.
pub fn read(config: &Config, id: NodeId, stack: &mut Vec<NodeId>) -> Value {
    let tree = config.tree();
    if stack.contains(&id) {
        warn!("Reference cycle through {:?}, using its raw value", tree.name(id));
        return tree.to_value(id);
    }
    stack.push(id);
    let value = match &tree[id].kind {
        NodeKind::Dict(children) => Value::Map(
            children
                .iter()
                .map(|(key, child)| (key.clone(), read(config, *child, stack)))
                .collect(),
        ),
        NodeKind::List(items) => {
            Value::List(items.iter().map(|child| read(config, *child, stack)).collect())
        }
        NodeKind::Scalar(scalar) => read_scalar(config, id, scalar.value.clone(), stack),
    };
    stack.pop();
    value
}

/// Default, interpolation, subtype selection, coercion and the absent
/// spelling, in that order.
fn read_scalar(config: &Config, id: NodeId, raw: Value, stack: &mut Vec<NodeId>) -> Value {
    let node = &config.tree()[id];
    let (meta, options) = (&node.meta, node.options);

    let mut value = raw;
    let mut defaulted = false;
    if meta.missing && value.is_nothing() {
        value = meta.default.clone();
        defaulted = true;
    }

    loop {
        if options.interpolate {
            if let Value::Str(text) = &value {
                if contains_magic(text) {
                    value = resolve(config, id, text, stack);
                }
            }
        }

        if options.coerce && !value.is_nothing() && !value.is_container() {
            let dtype = meta.dtype_for(&value);
            if !dtype.istype(&value) {
                match dtype.coerce(&value) {
                    Ok(coerced) => {
                        trace!("Coerced {:?} from {} to {}", config.tree().name(id), value.type_label(), coerced.type_label());
                        value = coerced;
                    }
                    Err(err) => debug!("Failed to coerce {:?}: {err}", config.tree().name(id)),
                }
            }
        }

        if options.convert_slashes && value.as_str() == Some(crate::constants::ABSENT_TOKEN) {
            value = Value::Absent;
        }

        if value.is_absent() && options.absent_is_missing && !defaulted && !meta.default.is_nothing() {
            debug!("{:?} is explicitly absent, falling back to its default", config.tree().name(id));
            value = meta.default.clone();
            defaulted = true;
            continue;
        }
        return value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::options::Options;
    use test_log::test;

    fn yaml(text: &str) -> Value {
        Value::from(serde_yaml::from_str::<serde_yaml::Value>(text).unwrap())
    }

    #[test]
    fn absolute_lookups_from_the_root() {
        let config = Config::build(
            yaml(
                r#"
default: {path: /abc, vars: {x: 1, y: 2}}
foo: {file: "${.default.path}/${.default.vars.x}/${.default.vars.y}"}
"#,
            ),
            None,
            None,
        );
        assert_eq!(config.get("foo.file").unwrap(), Value::from("/abc/1/2"));
    }

    #[test]
    fn relative_lookups_climb_parents() {
        let config = Config::build(
            yaml("a: {b: {x: 1, y: '${..x}', z: '${...c}'}, c: 3}"),
            None,
            None,
        );
        assert_eq!(config.get("a.b.y").unwrap(), Value::Int(1));
        assert_eq!(config.get("a.b.z").unwrap(), Value::Int(3));
    }

    #[test]
    fn whole_value_lookups_keep_their_type() {
        let config = Config::build(
            yaml("n: 5\nl: [1, 2]\nsect: {k: v}\nrefs: {n: '${.n}', l: '${.l}', s: '${.sect}'}"),
            None,
            None,
        );
        assert_eq!(config.get("refs.n").unwrap(), Value::Int(5));
        assert_eq!(config.get("refs.l").unwrap(), yaml("[1, 2]"));
        assert_eq!(config.get("refs.s").unwrap(), yaml("{k: v}"));
    }

    #[test]
    fn unresolvable_and_section_references_stay_in_place() {
        let config = Config::build(
            yaml("sect: {k: v}\na: '${.missing}'\nb: 'x-${.missing}-${.sect}'"),
            None,
            None,
        );
        assert_eq!(config.get("a").unwrap(), Value::from("${.missing}"));
        assert_eq!(config.get("b").unwrap(), Value::from("x-${.missing}-${.sect}"));
    }

    #[test]
    fn environment_and_functions() {
        std::env::set_var("SECTREE_MAGIC_TEST", "envval");
        registry::register("magic_test_answer", |_| Ok(Value::Int(42)));
        let config = Config::build(
            yaml("e: 'pre-${$SECTREE_MAGIC_TEST}'\nf: 'n=${?magic_test_answer}'\ng: '${!magic_test_answer}'"),
            None,
            None,
        );
        assert_eq!(config.get("e").unwrap(), Value::from("pre-envval"));
        assert_eq!(config.get("f").unwrap(), Value::from("n=42"));
        assert_eq!(config.get("g").unwrap(), Value::Int(42));
    }

    #[test]
    fn recursive_references_resolve_in_any_order() {
        let config = Config::build(yaml("a: '${.b}/a'\nb: '${.c}/b'\nc: root"), None, None);
        assert_eq!(config.get("a").unwrap(), Value::from("root/b/a"));
    }

    #[test]
    fn cycles_fall_back_to_raw_values() {
        let config = Config::build(yaml("a: '${.b}'\nb: '${.a}'"), None, None);
        assert_eq!(config.get("a").unwrap(), Value::from("${.b}"));
    }

    #[test]
    fn backslash_reads_as_absent() {
        let config = Config::build(yaml(r"a: '\'"), None, None);
        assert!(config.get("a").unwrap().is_absent());
    }

    #[test]
    fn relativity_can_be_disabled() {
        let options = Options { relativity: false, ..Options::default() };
        let config = Config::builder()
            .data(yaml("x: top\na: {x: inner, y: '${..x}'}"))
            .options(options)
            .build();
        assert_eq!(config.get("a.y").unwrap(), Value::from("top"));
    }

    #[test]
    fn replacing_calls_may_return_absent() {
        let config = Config::build(yaml("a: '${!absent}'\nb: 'x-${?absent}'"), None, None);
        assert!(config.get("a").unwrap().is_absent());
        assert_eq!(config.get("b").unwrap(), Value::from("x-${?absent}"));
    }

    #[test]
    fn failing_replacing_calls_keep_the_text() {
        let config = Config::build(yaml("a: '${!magic_test_not_registered}'"), None, None);
        assert_eq!(config.get("a").unwrap(), Value::from("${!magic_test_not_registered}"));
    }

    #[test]
    fn explicit_absent_falls_back_to_the_default() {
        let defs = yaml(".a: {dtype: int, default: 4}\n.b: {dtype: int}");
        let data = yaml("a: '\\'\nb: '\\'");
        let plain = Config::build(data.clone(), Some(defs.clone()), None);
        assert!(plain.get("a").unwrap().is_absent());

        let config = Config::builder()
            .data(data)
            .definitions(defs)
            .options(Options { absent_is_missing: true, ..Options::default() })
            .build();
        assert_eq!(config.get("a").unwrap(), Value::Int(4));
        assert!(config.get("b").unwrap().is_absent());
    }

    #[test]
    fn non_recursive_lookups_read_raw_values() {
        let data = yaml("a: '${.b}'\nb: '${.c}'\nc: x");
        let config = Config::builder()
            .data(data)
            .definitions(yaml(".d: {dtype: int, default: 7}\n.e: {dtype: str}"))
            .options(Options { recursive: false, ..Options::default() })
            .build();
        assert_eq!(config.get("a").unwrap(), Value::from("${.c}"));
        assert_eq!(config.get("b").unwrap(), Value::from("x"));
        assert_eq!(config.get("d").unwrap(), Value::Int(7));
    }

    #[test]
    fn interpolation_can_be_disabled() {
        std::env::set_var("SECTREE_MAGIC_OFF", "on");
        let config = Config::builder()
            .data(yaml("a: '${.b}'\nb: 1\nc: '${$SECTREE_MAGIC_OFF}'"))
            .options(Options { interpolate: false, ..Options::default() })
            .build();
        assert_eq!(config.get("a").unwrap(), Value::from("${.b}"));
        assert_eq!(config.get("c").unwrap(), Value::from("${$SECTREE_MAGIC_OFF}"));
    }
}
