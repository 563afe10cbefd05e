//! Annotated YAML documents
//!
//! [`generate`] renders a template from a definitions document, [`dump`]
//! renders a built configuration. Both align a comment column after every
//! line holding a flag, the dtype and the short description:
//!
//! ```text
//! name: \           # * | str  | Who runs it
//! opts:             #   | dict |
//!   level: 2        #   | int  |
//! ```
//!
//! Flags are `*` for required and `+` for optional fields inside a required
//! section.

use crate::config::Config;
use crate::constants::ABSENT_TOKEN;
use crate::dtype::DType;
use crate::node::{NodeId, NodeKind};
use crate::schema::Definition;
use crate::value::Value;
use log::debug;

const HEADER: &str = "# Flags: * required, + optional inside a required section";
const INDENT: &str = "  ";

struct Row {
    line: String,
    flag: char,
    dtype: String,
    desc: String,
}

impl Row {
    fn new(line: String, flag: char, dtype: String, desc: Option<&str>) -> Self {
        Row { line, flag, dtype, desc: desc.unwrap_or_default().to_string() }
    }
}

fn flag(required: bool, parent_required: bool) -> char {
    if required {
        '*'
    } else if parent_required {
        '+'
    } else {
        ' '
    }
}

fn render(rows: &[Row]) -> String {
    let line_width = rows.iter().map(|row| row.line.len()).max().unwrap_or(0);
    let dtype_width = rows.iter().map(|row| row.dtype.len()).max().unwrap_or(0);
    let mut out = String::from(HEADER);
    out.push('\n');
    for row in rows {
        let line = format!(
            "{:<line_width$}  # {} | {:<dtype_width$} | {}",
            row.line, row.flag, row.dtype, row.desc
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// A value as it appears after `key: `.
fn inline(value: &Value) -> String {
    match value {
        Value::Absent => ABSENT_TOKEN.to_string(),
        Value::Null => "null".to_string(),
        Value::List(_) | Value::Map(_) => value.to_string(),
        scalar => serde_yaml::to_string(scalar)
            .map(|text| text.trim_end().to_string())
            .unwrap_or_else(|_| scalar.to_string()),
    }
}

/// Renders a template document for the definitions `raw`.
pub fn generate(raw: &Value) -> String {
    let mut rows = Vec::new();
    definition_rows(&Definition::parse(raw), 0, false, &mut rows);
    debug!("Generated a template of {} lines", rows.len());
    render(&rows)
}

fn definition_rows(def: &Definition, depth: usize, parent_required: bool, rows: &mut Vec<Row>) {
    let indent = INDENT.repeat(depth);
    for (name, raw) in &def.fields {
        let field = Definition::parse(raw);
        let dtype = field.dtype_or_any();
        let flag = flag(field.required, parent_required);
        let label = dtype.label();
        let desc = field.sdesc.as_deref();

        if !field.fields.is_empty() {
            rows.push(Row::new(format!("{indent}{name}:"), flag, label, desc));
            definition_rows(&field, depth + 1, field.required, rows);
        } else if *dtype.primary() == DType::List && field.default.is_nothing() {
            match field.items.as_ref().map(Definition::parse) {
                Some(items) if !items.fields.is_empty() => {
                    rows.push(Row::new(format!("{indent}{name}:"), flag, label, desc));
                    rows.push(Row::new(
                        format!("{indent}{INDENT}-"),
                        ' ',
                        items.dtype_or_any().label(),
                        items.sdesc.as_deref(),
                    ));
                    definition_rows(&items, depth + 2, field.required, rows);
                }
                _ => rows.push(Row::new(format!("{indent}{name}: []"), flag, label, desc)),
            }
        } else if *dtype.primary() == DType::Dict && field.default.is_nothing() {
            rows.push(Row::new(format!("{indent}{name}: {{}}"), flag, label, desc));
        } else {
            let line = format!("{indent}{name}: {}", inline(&field.default));
            rows.push(Row::new(line, flag, label, desc));
        }
    }
}

/// Renders the resolved configuration with the metadata of its nodes.
pub fn dump(config: &Config) -> String {
    let mut rows = Vec::new();
    node_rows(config, config.root(), 0, false, &mut rows);
    render(&rows)
}

fn node_rows(config: &Config, id: NodeId, depth: usize, parent_required: bool, rows: &mut Vec<Row>) {
    let tree = config.tree();
    let in_list = tree[id].is_list();
    let indent = INDENT.repeat(depth);
    for child in tree.children(id) {
        let node = &tree[child];
        let meta = &node.meta;
        let prefix = match &node.key {
            Some(key) if !in_list => format!("{indent}{key}:"),
            _ => format!("{indent}-"),
        };
        let flag = flag(meta.required, parent_required);
        let desc = meta.description.as_deref();

        match &node.kind {
            NodeKind::Scalar(_) => {
                let value = config.resolve_node(child);
                let label = if meta.dtype.is_any() {
                    value.type_label().to_string()
                } else {
                    meta.dtype_for(&value).label()
                };
                rows.push(Row::new(format!("{prefix} {}", inline(&value)), flag, label, desc));
            }
            NodeKind::Dict(children) if children.is_empty() => {
                rows.push(Row::new(format!("{prefix} {{}}"), flag, "dict".to_string(), desc));
            }
            NodeKind::List(items) if items.is_empty() => {
                rows.push(Row::new(format!("{prefix} []"), flag, "list".to_string(), desc));
            }
            NodeKind::Dict(_) | NodeKind::List(_) => {
                rows.push(Row::new(prefix, flag, node.shape().to_string(), desc));
                node_rows(config, child, depth + 1, meta.required, rows);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn yaml(text: &str) -> Value {
        Value::from(serde_yaml::from_str::<serde_yaml::Value>(text).unwrap())
    }

    const DEFS: &str = r#"
.name:
  dtype: str
  required: true
  sdesc: Who runs it
.opts:
  dtype: dict
  required: true
  .level:
    dtype: int
    default: 2
.paths:
  dtype: list
  items:
    dtype: dict
    .src: {dtype: str}
.tags: {dtype: list}
"#;

    fn line_starting<'a>(text: &'a str, start: &str) -> &'a str {
        text.lines()
            .find(|line| line.starts_with(start))
            .unwrap_or_else(|| panic!("no line starting with {start:?} in\n{text}"))
    }

    #[test]
    fn generates_annotated_template() {
        let text = generate(&yaml(DEFS));
        assert!(text.starts_with(HEADER));

        let name = line_starting(&text, "name: \\");
        assert!(name.contains("# * | str "), "{name}");
        assert!(name.ends_with("Who runs it"), "{name}");

        assert!(line_starting(&text, "opts:").contains("# * | dict"));
        assert!(line_starting(&text, "  level: 2").contains("# + | int"));
        assert!(line_starting(&text, "paths:").contains("list"));
        assert!(line_starting(&text, "  -").contains("dict"));
        line_starting(&text, "    src: \\");
        line_starting(&text, "tags: []");
    }

    #[test]
    fn generated_template_parses_back() {
        let text = generate(&yaml(DEFS));
        let parsed = yaml(&text);
        assert_eq!(parsed.get("opts").unwrap().get("level"), Some(&Value::Int(2)));
        assert_eq!(parsed.get("name"), Some(&Value::from(ABSENT_TOKEN)));
    }

    #[test]
    fn dumps_resolved_configuration() {
        let config = Config::build(
            yaml("name: me\nopts: {}\npaths: [{src: '${.name}'}]\nempty: []"),
            Some(yaml(DEFS)),
            None,
        );
        let text = dump(&config);
        assert!(line_starting(&text, "name: me").contains("# * | str"));
        line_starting(&text, "  level: 2");
        line_starting(&text, "  -");
        line_starting(&text, "    src: me");
        line_starting(&text, "empty: []");

        let parsed = yaml(&text);
        assert_eq!(parsed.get("paths"), Some(&yaml("[{src: me}]")));
    }
}
