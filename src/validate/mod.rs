//! Validation of a configuration against its definitions
//!
//! Scalars run their type check and declared checks; containers run group
//! checks over tagged children and recurse. Results land in an
//! [`ErrorReport`] mirroring the tree.

mod engine;
mod report;

pub use engine::{validate, validate_node};
pub use report::{Entry, ErrorReport};

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::registry;
    use crate::validate::Entry;
    use crate::value::Value;
    use anyhow::bail;
    use test_log::test;

    fn yaml(text: &str) -> Value {
        Value::from(serde_yaml::from_str::<serde_yaml::Value>(text).unwrap())
    }

    const DEFS: &str = r#"
.name:
  dtype: str
  required: true
.count:
  dtype: int
  checks:
    - compare: {gte: 0}
.path:
  dtype: str
  checks: [isfile]
"#;

    #[test]
    fn missing_optional_fields_are_not_checked() {
        let config = Config::build(yaml("name: x"), Some(yaml(DEFS)), None);
        let report = config.validate(false).reduce();
        assert!(report.is_empty(), "{report}");
    }

    #[test]
    fn strict_mode_checks_missing_fields() {
        let defs = yaml(".path: {dtype: str, default: /does/not/exist, checks: [isfile]}");
        let config = Config::build(yaml("{}"), Some(defs), None);
        assert!(config.validate(false).reduce().is_empty());
        let strict = config.validate(true).reduce();
        assert_eq!(strict.count(), 1, "{strict}");
    }

    #[test]
    fn reports_required_type_and_checks() {
        let config = Config::build(yaml("count: -1\npath: /nope/nothing"), Some(yaml(DEFS)), None);
        let report = config.validate(false).reduce();
        let rendered = report.render();
        assert!(rendered.contains("name:\n  required: This key is required"), "{rendered}");
        assert!(rendered.contains("count:\n  compare:"), "{rendered}");
        assert!(rendered.contains("path:\n  isfile: File Not Found: /nope/nothing"), "{rendered}");
        assert_eq!(report.count(), 3);
    }

    #[test]
    fn wrong_types_are_reported() {
        let config = Config::build(yaml("name: x\ncount: many"), Some(yaml(DEFS)), None);
        let report = config.validate(false).reduce();
        let Some(Entry::Nested(count)) = report.get("count") else {
            panic!("expected a report for count: {report}");
        };
        let Some(Entry::Message(message)) = count.get("type") else {
            panic!("expected a type failure: {count}");
        };
        assert!(message.starts_with("Wrong type: Expected \"int\""), "{message}");
    }

    #[test]
    fn explicitly_absent_required_field_is_reported() {
        let config = Config::build(yaml(r"name: '\'"), Some(yaml(DEFS)), None);
        let report = config.validate(false).reduce();
        assert!(report.get("name").is_some(), "{report}");
    }

    #[test]
    fn subtype_checks_replace_base_checks() {
        let defs = yaml(
            r#"
.limit:
  dtype: [int, str]
  checks: [isfile]
  subtypes:
    - dtype: int
      checks:
        - compare: {lt: 10}
"#,
        );
        let ok = Config::build(yaml("limit: 3"), Some(defs.clone()), None);
        assert!(ok.validate(false).reduce().is_empty());
        let bad = Config::build(yaml("limit: 30"), Some(defs), None);
        assert!(bad.validate(false).reduce().render().contains("compare"));
    }

    #[test]
    fn group_checks_run_over_tagged_children() {
        let defs = yaml(
            r#"
dtype: dict
checks:
  - mutually_exclusive: [group1]
.a: {dtype: str, tags: [group1]}
.b: {dtype: str, tags: [group1]}
.c: {dtype: str, tags: [group1]}
"#,
        );
        let one = Config::build(yaml("a: x"), Some(defs.clone()), None);
        assert!(one.validate(false).reduce().is_empty());

        let two = Config::build(yaml("a: x\nc: y"), Some(defs), None);
        let report = two.validate(false).reduce();
        let Some(Entry::Message(message)) = report.get("mutually_exclusive[group1]") else {
            panic!("expected one group failure: {report}");
        };
        assert!(message.contains('a') && message.contains('c'), "{message}");
        assert_eq!(report.count(), 1);
    }

    #[test]
    fn failing_custom_checks_become_messages() {
        registry::register("validate_test_explodes", |_| bail!("exploded"));
        let defs = yaml(".x: {dtype: int, checks: [validate_test_explodes, validate_test_unknown]}");
        let config = Config::build(yaml("x: 1"), Some(defs), None);
        let rendered = config.validate(false).reduce().render();
        assert!(rendered.contains("validate_test_explodes: exploded"), "{rendered}");
        assert!(rendered.contains("is not registered"), "{rendered}");
    }

    #[test]
    fn container_shape_mismatch_and_missing_required_sections() {
        let defs = yaml(".s: {dtype: dict, required: true, .k: {dtype: int}}\n.l: {dtype: dict}");
        let config = Config::build(yaml("l: [1]"), Some(defs), None);
        let report = config.validate(false).reduce();
        let rendered = report.render();
        assert!(rendered.contains("s:\n  required:"), "{rendered}");
        assert!(rendered.contains("l:\n  type: Wrong type"), "{rendered}");
    }

    #[test]
    fn present_null_values_are_type_checked() {
        let defs = yaml(".n: {dtype: int}\n.s: {dtype: str, required: true}\n.any: {dtype: any}");
        let config = Config::build(yaml("n: null\ns: null\nany: null"), Some(defs), None);
        let report = config.validate(false).reduce();
        let rendered = report.render();
        assert!(rendered.contains("n:\n  type: Wrong type: Expected \"int\", got null"), "{rendered}");
        assert!(rendered.contains("s:\n  required:"), "{rendered}");
        assert!(report.get("any").is_none(), "{rendered}");
        assert_eq!(report.count(), 3, "{rendered}");
    }

    const GROUPS: &str = r#"
dtype: dict
checks:
  - one_valid: [g]
  - if_one_then_all: [h]
.a: {dtype: int, tags: [g]}
.b: {dtype: int, tags: [g]}
.x: {dtype: str, tags: [h]}
.y: {dtype: str, tags: [h]}
.z: {dtype: str, tags: [h]}
"#;

    #[test]
    fn one_valid_needs_a_set_and_valid_member() {
        let invalid_and_valid = Config::build(yaml("a: many\nb: 2"), Some(yaml(GROUPS)), None);
        let report = invalid_and_valid.validate(false).reduce();
        assert!(report.get("one_valid[g]").is_none(), "{report}");
        assert!(report.get("a").is_some(), "{report}");

        let only_invalid = Config::build(yaml("a: many"), Some(yaml(GROUPS)), None);
        let report = only_invalid.validate(false).reduce();
        let Some(Entry::Message(message)) = report.get("one_valid[g]") else {
            panic!("expected a one_valid failure: {report}");
        };
        assert!(message.ends_with("a, b"), "{message}");
    }

    #[test]
    fn if_one_then_all_names_the_missing_keys() {
        let none = Config::build(yaml("{}"), Some(yaml(GROUPS)), None);
        assert!(none.validate(false).reduce().get("if_one_then_all[h]").is_none());

        let all = Config::build(yaml("x: 1\ny: 2\nz: 3"), Some(yaml(GROUPS)), None);
        assert!(all.validate(false).reduce().get("if_one_then_all[h]").is_none());

        let partial = Config::build(yaml("y: set"), Some(yaml(GROUPS)), None);
        let report = partial.validate(false).reduce();
        let Some(Entry::Message(message)) = report.get("if_one_then_all[h]") else {
            panic!("expected an if_one_then_all failure: {report}");
        };
        assert!(message.ends_with("missing: x, z"), "{message}");
    }
}
