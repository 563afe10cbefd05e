#![allow(dead_code)]

use sectree::Value;
use std::path::PathBuf;

/// Absolute path of a file under `tests/fixtures`.
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

/// The fixture path as a loader source string.
pub fn fixture_source(name: &str) -> String {
    fixture(name).display().to_string()
}

/// Loads a fixture through the loader.
pub fn load_fixture(name: &str) -> Value {
    sectree::loader::load(&fixture_source(name)).unwrap()
}

/// Parses inline YAML.
pub fn yaml(text: &str) -> Value {
    Value::from(serde_yaml::from_str::<serde_yaml::Value>(text).unwrap())
}
