mod utils;

use sectree::cli::{
    Cli, Commands, DumpArgs, Format, GenerateArgs, GetArgs, Runner, SourceArgs, ValidateArgs,
};
use sectree::{Error, Result, Value};
use clap::Parser;
use std::fs;
use tempfile::TempDir;
use test_log::test;
use utils::{fixture, fixture_source, yaml};

fn run(args: &[&str]) -> (Result<()>, String) {
    let cli = Cli::parse_from(args);
    let mut out = Vec::new();
    let result = Runner::new(cli.command).run(&mut out);
    (result, String::from_utf8(out).unwrap())
}

fn fixture_args(patch: &str) -> SourceArgs {
    SourceArgs {
        config: fixture_source("config.yaml"),
        definitions: Some(fixture_source("definitions.yaml")),
        patch: Some(patch.to_string()),
        ..SourceArgs::default()
    }
}

#[test]
fn test_validate_command_accepts_a_valid_configuration() {
    let config = fixture_source("config.yaml");
    let definitions = fixture_source("definitions.yaml");
    let (result, out) = run(&["sectree", "validate", "-c", &config, "-d", &definitions, "-p", "local"]);
    assert!(result.is_ok(), "{out}");
    assert_eq!(out, "Configuration is valid.\n");
}

#[test]
fn test_validate_command_reports_overridden_errors() {
    let config = fixture_source("config.yaml");
    let definitions = fixture_source("definitions.yaml");
    let (result, out) = run(&[
        "sectree",
        "validate",
        "-c",
        &config,
        "-d",
        &definitions,
        "-p",
        "default<-foo",
        "-o",
        "output.retries=-2",
        "-o",
        "exclusive.a=x",
        "-o",
        "exclusive.b=y",
    ]);
    assert!(matches!(result, Err(Error::ValidationFailed { count: 2 })), "{result:?}\n{out}");
    assert!(out.starts_with("Validation errors:\n"), "{out}");
    assert!(out.contains("Value must be greater than or equal to: 0"), "{out}");
    assert!(out.contains("mutually_exclusive[group1]"), "{out}");
}

#[test]
fn test_strict_validation_checks_synthesised_fields() {
    let (result, _) = run(&[
        "sectree",
        "validate",
        "-c",
        "a: 1",
        "-d",
        ".b: {dtype: int, default: -5, checks: [{compare: {gt: 0}}]}",
    ]);
    assert!(result.is_ok());

    let mut out = Vec::new();
    let source = SourceArgs {
        config: "a: 1".to_string(),
        definitions: Some(".b: {dtype: int, default: -5, checks: [{compare: {gt: 0}}]}".to_string()),
        ..SourceArgs::default()
    };
    let result = Runner::new(Commands::Validate(ValidateArgs { source, strict: true })).run(&mut out);
    assert!(matches!(result, Err(Error::ValidationFailed { count: 1 })), "{result:?}");
}

#[test]
fn test_dump_command_prints_the_patched_configuration() {
    let mut out = Vec::new();
    Runner::new(Commands::Dump(DumpArgs {
        source: fixture_args("local"),
        format: Format::Yaml,
        output: None,
    }))
    .run(&mut out)
    .unwrap();
    let dumped = yaml(&String::from_utf8(out).unwrap());
    assert_eq!(dumped.get("file"), Some(&Value::from("/abc/10/2")));
    assert_eq!(dumped.get("output").unwrap().get("retries"), Some(&Value::Int(3)));
    assert_eq!(dumped.get("exclusive").unwrap().get("a"), Some(&Value::from("\\")));
}

#[test]
fn test_dump_command_annotates_and_writes_files() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("dump.yaml");
    let mut out = Vec::new();
    Runner::new(Commands::Dump(DumpArgs {
        source: fixture_args("default<-foo"),
        format: Format::Annotated,
        output: Some(target.clone()),
    }))
    .run(&mut out)
    .unwrap();
    assert!(out.is_empty());

    let written = fs::read_to_string(&target).unwrap();
    let path_line = written.lines().find(|line| line.starts_with("path: /abc")).unwrap();
    assert!(path_line.contains("# * | str"), "{path_line}");
    assert!(path_line.ends_with("Root directory of the run"), "{path_line}");
    assert_eq!(yaml(&written).get("file"), Some(&Value::from("/abc/1/2")));
}

#[test]
fn test_dump_command_merges_glob_matches() {
    let pattern = format!("{}/*", fixture("split").display());
    let (result, out) = run(&["sectree", "dump", "-c", &pattern, "--format", "json"]);
    assert!(result.is_ok(), "{out}");
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["service"]["name"], "base");
    assert_eq!(json["service"]["port"], 9090);
    assert_eq!(json["service"]["hosts"], serde_json::json!(["c"]));
}

#[test]
fn test_get_command_prints_one_value() {
    let mut out = Vec::new();
    Runner::new(Commands::Get(GetArgs {
        source: fixture_args("local"),
        path: "vars".to_string(),
        format: Format::Json,
    }))
    .run(&mut out)
    .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(json, serde_json::json!({"x": 10, "y": 2}));

    let config = fixture_source("config.yaml");
    let (result, out) = run(&["sectree", "get", "-c", &config, "-p", "default<-foo", "file"]);
    assert!(result.is_ok());
    assert_eq!(out, "/abc/1/2\n");

    let (result, _) = run(&["sectree", "get", "-c", &config, "nope"]);
    assert!(matches!(result, Err(Error::KeyNotFound { .. })));
}

#[test]
fn test_generate_command_renders_definitions() {
    let definitions = fixture_source("definitions.yaml");
    let (result, out) = run(&["sectree", "generate", "-d", &definitions]);
    assert!(result.is_ok());

    let line = |start: &str| {
        out.lines()
            .find(|line| line.starts_with(start))
            .unwrap_or_else(|| panic!("no line starting with {start:?} in\n{out}"))
            .to_string()
    };
    assert!(line("path: \\").contains("# * | str"));
    assert!(line("vars:").contains("dict"));
    assert!(line("  x: \\").contains("# * | int"));
    assert!(line("  format: csv").contains("str"));
    assert!(line("  retries: 3").contains("int"));

    let template = yaml(&out);
    assert_eq!(template.get("output").unwrap().get("retries"), Some(&Value::Int(3)));
}

#[test]
fn test_generate_command_requires_loadable_definitions() {
    let mut out = Vec::new();
    let result = Runner::new(Commands::Generate(GenerateArgs {
        definitions: "no-such-definitions.yaml".to_string(),
        output: None,
    }))
    .run(&mut out);
    assert!(matches!(result, Err(Error::SourceError { .. })));
}
