use crate::config::Config;
use crate::node::{Meta, NodeId};
use crate::validate::{self, ErrorReport};
use crate::value::Value;
use indexmap::IndexMap;

/// A borrowed view of a node handed to registered functions.
///
/// The resolved value is computed once when the view is created so checks
/// see the same value the validator type-checked.
#[derive(Debug, Clone)]
pub struct NodeRef<'a> {
    config: &'a Config,
    id: NodeId,
    value: Value,
}

impl<'a> NodeRef<'a> {
    pub fn new(config: &'a Config, id: NodeId) -> Self {
        let value = config.resolve_node(id);
        Self { config, id, value }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    /// Dotted name from the root, e.g. `a.b[2].c`.
    pub fn name(&self) -> String {
        self.config.tree().name(self.id)
    }

    /// The last segment of the name.
    pub fn key(&self) -> String {
        self.config.tree()[self.id]
            .key
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn meta(&self) -> &'a Meta {
        &self.config.tree()[self.id].meta
    }

    pub fn is_missing(&self) -> bool {
        self.meta().missing
    }

    /// Present in the input and holding something other than nothing.
    pub fn is_set(&self) -> bool {
        !self.is_missing() && !self.value.is_nothing()
    }

    pub fn validate(&self, strict: bool) -> ErrorReport {
        validate::validate_node(self.config, self.id, strict)
    }
}

/// What a registered function is invoked on.
#[derive(Debug, Clone, Default)]
pub enum Subject<'a> {
    #[default]
    None,
    Value(Value),
    Node(NodeRef<'a>),
    /// The tagged siblings handed to a group check.
    Nodes(Vec<NodeRef<'a>>),
}

/// The arguments of one invocation.
#[derive(Debug, Clone, Default)]
pub struct Call<'a> {
    pub subject: Subject<'a>,
    pub args: Vec<Value>,
    pub kwargs: IndexMap<String, Value>,
}

impl<'a> Call<'a> {
    pub fn new(subject: Subject<'a>) -> Self {
        Self { subject, args: Vec::new(), kwargs: IndexMap::new() }
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn with_kwargs(mut self, kwargs: IndexMap<String, Value>) -> Self {
        self.kwargs = kwargs;
        self
    }

    /// The value of the subject: the node's resolved value, the plain value,
    /// or `Absent` when there is none.
    pub fn value(&self) -> Value {
        match &self.subject {
            Subject::Value(value) => value.clone(),
            Subject::Node(node) => node.value().clone(),
            Subject::Nodes(nodes) => Value::List(nodes.iter().map(|n| n.value().clone()).collect()),
            Subject::None => Value::Absent,
        }
    }

    pub fn node(&self) -> Option<&NodeRef<'a>> {
        match &self.subject {
            Subject::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn nodes(&self) -> &[NodeRef<'a>] {
        match &self.subject {
            Subject::Nodes(nodes) => nodes,
            Subject::Node(node) => std::slice::from_ref(node),
            _ => &[],
        }
    }

    /// A parameter given either at `position` or by `name`.
    pub fn param(&self, position: usize, name: &str) -> Option<&Value> {
        self.kwargs.get(name).or_else(|| self.args.get(position))
    }

    /// A string parameter, when present and a string.
    pub fn str_param(&self, position: usize, name: &str) -> Option<&str> {
        self.param(position, name).and_then(Value::as_str)
    }
}
