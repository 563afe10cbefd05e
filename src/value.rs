//! Raw configuration values
//!
//! [`Value`] is the in-memory form of everything that enters or leaves the
//! tree: parsed YAML/JSON documents, defaults from definitions, results of
//! registered functions and resolved reads. It differs from
//! `serde_json::Value` in one way: it carries an explicit [`Value::Absent`]
//! variant, which is the sentinel for "explicitly nothing" and which
//! serialises as the reserved escape token.

use crate::constants::ABSENT_TOKEN;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A nested map/list/scalar value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// The sentinel. Distinct from [`Value::Null`] when serialised, equal to it
    /// when compared.
    #[default]
    Absent,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// True for both the sentinel and a native null.
    pub fn is_nothing(&self) -> bool {
        matches!(self, Value::Absent | Value::Null)
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Value::List(_) | Value::Map(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view used by comparisons; ints widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut IndexMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a key when this is a map, `None` otherwise.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Truthiness in the loose sense used by patch directives and checks.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Absent | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
        }
    }

    /// Short type name used in messages and generated templates.
    pub fn type_label(&self) -> &'static str {
        match self {
            Value::Absent => "absent",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
        }
    }

    /// Right-biased deep merge: maps are unioned recursively, anything else
    /// is replaced by `other`.
    pub fn merge(&mut self, other: Value) {
        match (self, other) {
            (Value::Map(this), Value::Map(that)) => {
                for (key, value) in that {
                    match this.get_mut(&key) {
                        Some(existing) if existing.as_map().is_some() && value.as_map().is_some() => {
                            existing.merge(value)
                        }
                        _ => {
                            this.insert(key, value);
                        }
                    }
                }
            }
            (this, other) => *this = other,
        }
    }

    /// Parses command line text as a YAML scalar, falling back to a string.
    pub fn parse_scalar(text: &str) -> Value {
        if text == ABSENT_TOKEN {
            return Value::Str(text.to_string());
        }
        match serde_yaml::from_str::<serde_yaml::Value>(text) {
            Ok(parsed) => Value::from(parsed),
            Err(_) => Value::Str(text.to_string()),
        }
    }

    /// Converts to JSON, spelling [`Value::Absent`] as the escape token.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Absent => serde_json::Value::String(ABSENT_TOKEN.to_string()),
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Absent | Null, Absent | Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Int(a), Float(b)) | (Float(b), Int(a)) => (*a as f64) == *b,
            (Str(a), Str(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Absent | Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{x:.1}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(_) | Value::Map(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<serde_yaml::Value> for Value {
    fn from(value: serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::Null => Value::Null,
            serde_yaml::Value::Bool(b) => Value::Bool(b),
            serde_yaml::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_yaml::Value::String(s) => Value::Str(s),
            serde_yaml::Value::Sequence(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_yaml::Value::Mapping(map) => Value::Map(
                map.into_iter().map(|(k, v)| (yaml_key(k), Value::from(v))).collect(),
            ),
            serde_yaml::Value::Tagged(tagged) => Value::from(tagged.value),
        }
    }
}

/// YAML allows non-string keys; they are stringified the way they print.
fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        other => Value::from(other).to_string(),
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(map: IndexMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Absent => serializer.serialize_str(ABSENT_TOKEN),
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) => items.serialize(serializer),
            Value::Map(map) => map.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: serde_json::Value) -> Value {
        Value::from(value)
    }

    #[test]
    fn absent_equals_null_but_not_concrete_values() {
        assert_eq!(Value::Absent, Value::Null);
        assert_eq!(Value::Null, Value::Absent);
        assert_ne!(Value::Absent, Value::Int(0));
        assert_ne!(Value::Absent, Value::from(""));
        assert_ne!(Value::Bool(false), Value::Absent);
    }

    #[test]
    fn ints_and_floats_compare_numerically() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Int(1), Value::Float(1.5));
    }

    #[test]
    fn merge_is_right_biased_and_deep() {
        let mut a = map(json!({"a": {"x": 1, "y": 2}}));
        a.merge(map(json!({"a": {"x": -1, "z": 3}})));
        assert_eq!(a, map(json!({"a": {"x": -1, "y": 2, "z": 3}})));
    }

    #[test]
    fn merge_replaces_lists_and_mismatched_kinds() {
        let mut a = map(json!({"a": [1, 2, 3], "b": {"c": 1}}));
        a.merge(map(json!({"a": [9], "b": 2})));
        assert_eq!(a, map(json!({"a": [9], "b": 2})));
    }

    #[test]
    fn serialises_absent_as_escape_token() {
        let value = Value::Map(IndexMap::from([("a".to_string(), Value::Absent)]));
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"a":"\\"}"#);
        assert_eq!(value.to_json(), json!({"a": "\\"}));
    }

    #[test]
    fn converts_yaml_documents() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("a: 1\nb: [x, 2.5]\n3: null").unwrap();
        let value = Value::from(yaml);
        assert_eq!(value, map(json!({"a": 1, "b": ["x", 2.5], "3": null})));
    }

    #[test]
    fn parses_scalars_like_yaml() {
        assert_eq!(Value::parse_scalar("3"), Value::Int(3));
        assert_eq!(Value::parse_scalar("true"), Value::Bool(true));
        assert_eq!(Value::parse_scalar("1.5"), Value::Float(1.5));
        assert_eq!(Value::parse_scalar("hello"), Value::from("hello"));
        assert_eq!(Value::parse_scalar("\\"), Value::from("\\"));
    }

    #[test]
    fn displays_for_substitution() {
        assert_eq!(Value::Int(1).to_string(), "1");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::from("/abc").to_string(), "/abc");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(map(json!([1, "a"])).to_string(), r#"[1,"a"]"#);
    }
}
