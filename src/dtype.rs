//! Type references used by definitions
//!
//! A field declares one dtype or a list of acceptable dtypes. Names that are
//! not built in refer to a registered predicate function.

use crate::constants::ABSENT_TOKEN;
use crate::registry::{self, Call, CheckOutcome, Subject};
use crate::value::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum DType {
    Any,
    Str,
    Int,
    Float,
    Bool,
    Path,
    Dict,
    List,
    /// A registered predicate, called with the value as subject.
    Custom(String),
}

impl DType {
    pub fn parse(name: &str) -> DType {
        match name.trim() {
            "str" | "string" => DType::Str,
            "int" | "integer" => DType::Int,
            "float" => DType::Float,
            "bool" | "boolean" => DType::Bool,
            "path" | "Path" => DType::Path,
            "dict" => DType::Dict,
            "list" => DType::List,
            "any" | "none" | "None" | "null" | "Null" | "*" | "" => DType::Any,
            other => DType::Custom(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            DType::Any => "any",
            DType::Str => "str",
            DType::Int => "int",
            DType::Float => "float",
            DType::Bool => "bool",
            DType::Path => "path",
            DType::Dict => "dict",
            DType::List => "list",
            DType::Custom(name) => name,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, DType::Dict | DType::List)
    }

    pub fn istype(&self, value: &Value) -> bool {
        match (self, value) {
            (DType::Any, _) => true,
            (DType::Str | DType::Path, Value::Str(_)) => true,
            (DType::Int, Value::Int(_)) => true,
            (DType::Float, Value::Float(_)) => true,
            (DType::Bool, Value::Bool(_)) => true,
            (DType::Dict, Value::Map(_)) => true,
            (DType::List, Value::List(_)) => true,
            (DType::Custom(name), value) => {
                let call = Call::new(Subject::Value(value.clone()));
                CheckOutcome::from(registry::call(name, &call)).passed()
            }
            _ => false,
        }
    }

    /// Attempts to convert `value` into this dtype.
    pub fn coerce(&self, value: &Value) -> Result<Value, String> {
        if self.istype(value) {
            return Ok(value.clone());
        }
        let failed = || {
            Err(format!(
                "cannot coerce {} {value} to {}",
                value.type_label(),
                self.label()
            ))
        };
        let coerced = match (self, value) {
            (DType::Str | DType::Path, Value::Bool(_) | Value::Int(_) | Value::Float(_)) => {
                Value::Str(value.to_string())
            }
            (DType::Int, Value::Str(s)) => match s.trim().parse::<i64>() {
                Ok(i) => Value::Int(i),
                Err(_) => return failed(),
            },
            (DType::Int, Value::Float(f)) if f.is_finite() && f.fract() == 0.0 => {
                Value::Int(*f as i64)
            }
            (DType::Int, Value::Bool(b)) => Value::Int(i64::from(*b)),
            (DType::Float, Value::Int(i)) => Value::Float(*i as f64),
            (DType::Float, Value::Str(s)) => match s.trim().parse::<f64>() {
                Ok(f) => Value::Float(f),
                Err(_) => return failed(),
            },
            (DType::Bool, Value::Str(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Value::Bool(true),
                "false" | "no" | "off" | "0" => Value::Bool(false),
                _ => return failed(),
            },
            (DType::Bool, Value::Int(i)) => Value::Bool(*i != 0),
            _ => return failed(),
        };
        Ok(coerced)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One dtype or a list of acceptable dtypes.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef(Vec<DType>);

impl Default for TypeRef {
    fn default() -> Self {
        TypeRef::any()
    }
}

impl TypeRef {
    pub fn any() -> Self {
        TypeRef(vec![DType::Any])
    }

    pub fn one(dtype: DType) -> Self {
        TypeRef(vec![dtype])
    }

    pub fn many(dtypes: Vec<DType>) -> Self {
        if dtypes.is_empty() {
            TypeRef::any()
        } else {
            TypeRef(dtypes)
        }
    }

    /// Reads a dtype declaration: a name, a list of names, or nothing.
    pub fn from_value(value: &Value) -> Option<TypeRef> {
        match value {
            Value::Str(name) => Some(TypeRef::one(DType::parse(name))),
            Value::List(items) => {
                let dtypes = items
                    .iter()
                    .map(|item| item.as_str().map(DType::parse))
                    .collect::<Option<Vec<_>>>()?;
                Some(TypeRef::many(dtypes))
            }
            Value::Absent | Value::Null => Some(TypeRef::any()),
            _ => None,
        }
    }

    /// The inferred dtype of a raw value, used before definitions apply.
    pub fn infer(value: &Value) -> TypeRef {
        TypeRef::one(match value {
            Value::Str(_) => DType::Str,
            Value::Int(_) => DType::Int,
            Value::Float(_) => DType::Float,
            Value::Bool(_) => DType::Bool,
            Value::Map(_) => DType::Dict,
            Value::List(_) => DType::List,
            Value::Absent | Value::Null => DType::Any,
        })
    }

    pub fn dtypes(&self) -> &[DType] {
        &self.0
    }

    pub fn is_any(&self) -> bool {
        self.0.iter().any(|dtype| *dtype == DType::Any)
    }

    /// The first declared dtype, which decides the node shape.
    pub fn primary(&self) -> &DType {
        self.0.first().unwrap_or(&DType::Any)
    }

    pub fn istype(&self, value: &Value) -> bool {
        self.0.iter().any(|dtype| dtype.istype(value))
    }

    /// Coerces to the first dtype that accepts the value. The explicit
    /// absent spelling always becomes [`Value::Absent`]; nothing is never
    /// converted.
    pub fn coerce(&self, value: &Value) -> Result<Value, String> {
        match value {
            Value::Str(s) if s == ABSENT_TOKEN => return Ok(Value::Absent),
            Value::Absent | Value::Null => return Ok(value.clone()),
            _ => {}
        }
        if self.istype(value) {
            return Ok(value.clone());
        }
        let mut last = None;
        for dtype in &self.0 {
            match dtype.coerce(value) {
                Ok(coerced) => return Ok(coerced),
                Err(message) => last = Some(message),
            }
        }
        Err(last.unwrap_or_else(|| format!("no dtype accepts {value}")))
    }

    pub fn label(&self) -> String {
        match self.0.as_slice() {
            [single] => single.label().to_string(),
            many => format!(
                "[{}]",
                many.iter().map(DType::label).collect::<Vec<_>>().join(", ")
            ),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!(DType::parse("string"), DType::Str);
        assert_eq!(DType::parse("integer"), DType::Int);
        assert_eq!(DType::parse("boolean"), DType::Bool);
        assert_eq!(DType::parse("*"), DType::Any);
        assert_eq!(DType::parse("even"), DType::Custom("even".into()));
    }

    #[test]
    fn reads_lists_of_dtypes() {
        let tref = TypeRef::from_value(&Value::List(vec!["int".into(), "str".into()])).unwrap();
        assert_eq!(tref.label(), "[int, str]");
        assert!(tref.istype(&Value::Int(1)));
        assert!(tref.istype(&Value::from("a")));
        assert!(!tref.istype(&Value::Float(1.5)));
        assert!(TypeRef::from_value(&Value::Int(3)).is_none());
    }

    #[test]
    fn coerces_strings_to_numbers_and_bools() {
        assert_eq!(TypeRef::one(DType::Int).coerce(&"42".into()), Ok(Value::Int(42)));
        assert_eq!(TypeRef::one(DType::Float).coerce(&"1.5".into()), Ok(Value::Float(1.5)));
        assert_eq!(TypeRef::one(DType::Float).coerce(&Value::Int(2)), Ok(Value::Float(2.0)));
        assert_eq!(TypeRef::one(DType::Bool).coerce(&"False".into()), Ok(Value::Bool(false)));
        assert_eq!(TypeRef::one(DType::Str).coerce(&Value::Int(7)), Ok(Value::from("7")));
        assert!(TypeRef::one(DType::Int).coerce(&"abc".into()).is_err());
    }

    #[test]
    fn never_coerces_nothing() {
        let tref = TypeRef::one(DType::Int);
        assert_eq!(tref.coerce(&Value::Null), Ok(Value::Null));
        assert!(tref.coerce(&"\\".into()).unwrap().is_absent());
    }

    #[test]
    fn any_accepts_everything() {
        let tref = TypeRef::default();
        assert!(tref.is_any());
        assert!(tref.istype(&Value::List(vec![])));
        assert!(tref.istype(&Value::Null));
    }
}
