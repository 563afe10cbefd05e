use crate::dtype::TypeRef;
use crate::value::Value;
use indexmap::IndexMap;

/// One entry of a `checks` list: a function name plus its arguments.
///
/// Written either as a bare name or as a single-entry mapping whose value
/// is a list (positional arguments), a mapping (keyword arguments) or a
/// single scalar argument.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckSpec {
    pub name: String,
    pub args: Vec<Value>,
    pub kwargs: IndexMap<String, Value>,
}

impl CheckSpec {
    pub fn named(name: &str) -> Self {
        Self { name: name.to_string(), ..Default::default() }
    }

    pub fn parse(value: &Value) -> Option<CheckSpec> {
        match value {
            Value::Str(name) => Some(CheckSpec::named(name)),
            Value::Map(map) if map.len() == 1 => {
                let (name, params) = map.first()?;
                let mut spec = CheckSpec::named(name);
                match params {
                    Value::List(args) => spec.args = args.clone(),
                    Value::Map(kwargs) => spec.kwargs = kwargs.clone(),
                    Value::Absent | Value::Null => {}
                    scalar => spec.args = vec![scalar.clone()],
                }
                Some(spec)
            }
            _ => None,
        }
    }

    /// The tags a group check applies to.
    pub fn tags(&self) -> Vec<String> {
        self.args.iter().map(ToString::to_string).collect()
    }
}

/// An alternative shape of a polymorphic scalar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subtype {
    pub dtype: TypeRef,
    pub default: Value,
    pub checks: Vec<CheckSpec>,
}

/// Schema metadata attached to a node.
#[derive(Debug, Clone, Default)]
pub struct Meta {
    pub required: bool,
    pub dtype: TypeRef,
    /// `Absent` when no default is declared.
    pub default: Value,
    pub checks: Vec<CheckSpec>,
    pub subtypes: Vec<Subtype>,
    pub tags: Vec<String>,
    pub strict: bool,
    pub description: Option<String>,
    /// The node exists only because a definition synthesised it.
    pub missing: bool,
    /// The last definition applied to this node.
    pub applied: Option<Value>,
    /// The node's working value came from its default.
    pub is_default: bool,
}

impl Meta {
    /// The first subtype whose dtype accepts `value`.
    pub fn subtype_for(&self, value: &Value) -> Option<&Subtype> {
        if value.is_nothing() {
            return None;
        }
        self.subtypes.iter().find(|sub| sub.dtype.istype(value))
    }

    pub fn dtype_for(&self, value: &Value) -> &TypeRef {
        self.subtype_for(value).map_or(&self.dtype, |sub| &sub.dtype)
    }

    pub fn checks_for(&self, value: &Value) -> &[CheckSpec] {
        self.subtype_for(value).map_or(&self.checks, |sub| &sub.checks)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Clears everything a definition attached, keeping the `missing` flag.
    pub fn clear_schema(&mut self) {
        *self = Meta { missing: self.missing, ..Meta::default() };
    }
}
