use crate::constants::{schema_keys, FIELD_MARKER};
use crate::dtype::TypeRef;
use crate::node::{CheckSpec, Meta, Subtype};
use crate::value::Value;
use indexmap::IndexMap;
use log::{debug, warn};

/// A conditional fragment merged into a definition when it matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    /// Shape or value type the node must have; `None` or `*` matches all.
    pub dtype: Option<String>,
    /// Child whose value is compared; `*` matches unconditionally.
    pub key: String,
    /// Expected value of `key`. `Absent` only requires the child to be set.
    pub value: Value,
    pub fragment: Value,
}

impl Case {
    pub(crate) fn parse(raw: &Value) -> Option<Case> {
        let map = raw.as_map()?;
        let mut fragment = map.clone();
        let dtype = fragment.shift_remove(schema_keys::CASE).map(|v| v.to_string());
        let key = fragment
            .shift_remove(schema_keys::KEY)
            .map(|v| v.to_string())
            .unwrap_or_else(|| schema_keys::WILDCARD.to_string());
        let value = fragment.shift_remove(schema_keys::VALUE).unwrap_or_default();
        Some(Case { dtype, key, value, fragment: Value::Map(fragment) })
    }

    pub fn matches_any_key(&self) -> bool {
        self.key == schema_keys::WILDCARD
    }

    pub fn accepts_dtype(&self, label: &str) -> bool {
        match self.dtype.as_deref() {
            None | Some(schema_keys::WILDCARD) => true,
            Some(dtype) => dtype == label,
        }
    }
}

/// The parsed form of one definitions mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Definition {
    pub dtype: Option<TypeRef>,
    pub default: Value,
    pub required: bool,
    pub strict: bool,
    pub checks: Vec<CheckSpec>,
    pub tags: Vec<String>,
    pub sdesc: Option<String>,
    pub subtypes: Vec<Subtype>,
    /// Raw definitions of named children, in declaration order.
    pub fields: IndexMap<String, Value>,
    /// Raw definitions of specific list positions.
    pub positions: IndexMap<usize, Value>,
    /// Raw definition applied to every list element without a position entry.
    pub items: Option<Value>,
    pub cases: Vec<Case>,
}

impl Definition {
    /// Parses a definitions mapping. Malformed directives are logged and
    /// skipped; anything that is not a mapping yields an empty definition.
    pub fn parse(raw: &Value) -> Definition {
        let mut def = Definition::default();
        let Some(map) = raw.as_map() else {
            if !raw.is_nothing() {
                warn!("Definitions must be a mapping, ignoring {raw}");
            }
            return def;
        };

        for (key, value) in map {
            if let Some(field) = key.strip_prefix(FIELD_MARKER) {
                def.add_field(field, value);
                continue;
            }
            match key.as_str() {
                schema_keys::DTYPE => match TypeRef::from_value(value) {
                    Some(dtype) => def.dtype = Some(dtype),
                    None => warn!("Invalid dtype declaration {value}, expected a name or list of names"),
                },
                schema_keys::DEFAULT => def.default = value.clone(),
                schema_keys::REQUIRED => def.required = value.is_truthy(),
                schema_keys::STRICT => def.strict = value.is_truthy(),
                schema_keys::CHECKS => def.checks = parse_checks(value),
                schema_keys::TAGS => def.tags = parse_tags(value),
                schema_keys::SDESC => def.sdesc = Some(value.to_string()),
                schema_keys::SUBTYPES => def.subtypes = parse_subtypes(value),
                schema_keys::ITEMS => def.items = Some(value.clone()),
                schema_keys::CHILDREN => match value.as_map() {
                    Some(children) => {
                        for (name, child) in children {
                            let name = name.strip_prefix(FIELD_MARKER).unwrap_or(name);
                            def.add_field(name, child);
                        }
                    }
                    None => warn!("'children' must be a mapping of field definitions"),
                },
                schema_keys::MATCH => match value.as_list() {
                    Some(cases) => def.cases = cases.iter().filter_map(Case::parse).collect(),
                    None => warn!("'match' must be a list of cases"),
                },
                other => debug!("Ignoring unknown definitions key {other:?}"),
            }
        }
        def
    }

    fn add_field(&mut self, name: &str, raw: &Value) {
        let declares_type = raw
            .as_map()
            .is_some_and(|map| map.contains_key(schema_keys::DTYPE) || map.contains_key(schema_keys::SUBTYPES));
        if !declares_type {
            warn!("The dtype must be defined for every key in the definitions, missing for: {FIELD_MARKER}{name}");
            return;
        }
        match name.parse::<usize>() {
            Ok(index) => {
                self.positions.insert(index, raw.clone());
            }
            Err(_) => {
                self.fields.insert(name.to_string(), raw.clone());
            }
        }
    }

    /// The dtype a node synthesised for this definition is shaped after.
    pub fn dtype_or_any(&self) -> TypeRef {
        self.dtype.clone().unwrap_or_default()
    }

    /// The definition that applies to list element `index`.
    pub fn element(&self, index: usize) -> Option<&Value> {
        self.positions.get(&index).or(self.items.as_ref())
    }

    /// Writes the schema metadata onto a node's [`Meta`].
    pub fn attach(&self, meta: &mut Meta) {
        meta.clear_schema();
        meta.required = self.required;
        meta.strict = self.strict;
        meta.dtype = self.dtype_or_any();
        meta.default = self.default.clone();
        meta.checks = self.checks.clone();
        meta.subtypes = self.subtypes.clone();
        meta.tags = self.tags.clone();
        meta.description = self.sdesc.clone();
    }
}

fn parse_checks(value: &Value) -> Vec<CheckSpec> {
    let entries = match value {
        Value::List(items) => items.clone(),
        Value::Absent | Value::Null => Vec::new(),
        single => vec![single.clone()],
    };
    entries
        .iter()
        .filter_map(|entry| {
            let spec = CheckSpec::parse(entry);
            if spec.is_none() {
                warn!("Invalid check {entry}, expected a name or a single-entry mapping");
            }
            spec
        })
        .collect()
}

fn parse_tags(value: &Value) -> Vec<String> {
    match value {
        Value::List(items) => items.iter().map(ToString::to_string).collect(),
        Value::Absent | Value::Null => Vec::new(),
        single => vec![single.to_string()],
    }
}

fn parse_subtypes(value: &Value) -> Vec<Subtype> {
    let Some(items) = value.as_list() else {
        warn!("'subtypes' must be a list, ignoring {value}");
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let map = item.as_map()?;
            let Some(dtype) = map.get(schema_keys::DTYPE).and_then(TypeRef::from_value) else {
                warn!("Every subtype needs a dtype, ignoring {item}");
                return None;
            };
            Some(Subtype {
                dtype,
                default: map.get(schema_keys::DEFAULT).cloned().unwrap_or_default(),
                checks: map.get(schema_keys::CHECKS).map(parse_checks).unwrap_or_default(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DType;
    use test_log::test;

    fn yaml(text: &str) -> Value {
        Value::from(serde_yaml::from_str::<serde_yaml::Value>(text).unwrap())
    }

    #[test]
    fn parses_field_directives() {
        let def = Definition::parse(&yaml(
            r#"
.name:
  dtype: str
  required: true
  sdesc: The name
.count:
  dtype: int
  default: 3
  checks:
    - compare: {gte: 0}
"#,
        ));
        assert_eq!(def.fields.keys().collect::<Vec<_>>(), vec!["name", "count"]);
        let count = Definition::parse(&def.fields["count"]);
        assert_eq!(count.dtype, Some(TypeRef::one(DType::Int)));
        assert_eq!(count.default, Value::Int(3));
        assert_eq!(count.checks[0].name, "compare");
        assert!(Definition::parse(&def.fields["name"]).required);
    }

    #[test]
    fn fields_without_dtype_are_skipped() {
        let def = Definition::parse(&yaml(".a: {default: 1}\n.b: {dtype: int}"));
        assert_eq!(def.fields.len(), 1);
        assert!(def.fields.contains_key("b"));
    }

    #[test]
    fn children_map_and_positions() {
        let def = Definition::parse(&yaml(
            "dtype: list\nitems: {dtype: int}\n.0: {dtype: str}\nchildren: {.x: {dtype: bool}}",
        ));
        assert!(def.positions.contains_key(&0));
        assert!(def.fields.contains_key("x"));
        assert_eq!(def.element(0), def.positions.get(&0));
        assert_eq!(def.element(4), def.items.as_ref());
    }

    #[test]
    fn parses_match_cases() {
        let def = Definition::parse(&yaml(
            "match:\n  - {case: dict, key: kind, value: a, .extra: {dtype: int}}\n  - {key: '*', sdesc: any}",
        ));
        assert_eq!(def.cases.len(), 2);
        assert_eq!(def.cases[0].key, "kind");
        assert_eq!(def.cases[0].value, Value::from("a"));
        assert!(def.cases[0].fragment.get(".extra").is_some());
        assert!(def.cases[1].matches_any_key());
        assert!(def.cases[1].accepts_dtype("list"));
        assert!(!def.cases[0].accepts_dtype("list"));
    }

    #[test]
    fn parses_subtypes() {
        let def = Definition::parse(&yaml(
            "subtypes:\n  - {dtype: int, default: 1}\n  - {dtype: str, checks: [isfile]}\n  - {default: 2}",
        ));
        assert_eq!(def.subtypes.len(), 2);
        assert_eq!(def.subtypes[1].checks[0].name, "isfile");
    }
}
