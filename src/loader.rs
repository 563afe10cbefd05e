//! Loading raw data from files, glob patterns or inline text
//!
//! Every command line input goes through [`load`]: a path to a YAML or JSON
//! file, a glob pattern whose matches are merged in sorted order, or the
//! document itself.

use crate::constants::extensions;
use crate::error::{Error, Result};
use crate::ext::PathExt;
use crate::value::Value;
use globset::GlobBuilder;
use indexmap::IndexMap;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const GLOB_CHARS: &[char] = &['*', '?', '[', '{'];

/// Where raw data comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadSource {
    File(PathBuf),
    Glob(String),
    Text(String),
    /// Data that is already in memory.
    Value(Value),
}

impl LoadSource {
    /// Classifies a command line style source string.
    ///
    /// An existing file wins; a single line containing glob characters is a
    /// pattern; anything else is treated as document text.
    pub fn detect(source: &str) -> LoadSource {
        let path = Path::new(source);
        if !source.contains('\n') && path.is_file() {
            LoadSource::File(path.to_path_buf())
        } else if !source.contains('\n') && !source.contains(": ") && source.contains(GLOB_CHARS) {
            LoadSource::Glob(source.to_string())
        } else {
            LoadSource::Text(source.to_string())
        }
    }
}

/// Loads a path, glob pattern or YAML/JSON text.
pub fn load(source: &str) -> Result<Value> {
    load_value(LoadSource::detect(source))
}

pub fn load_value(source: LoadSource) -> Result<Value> {
    match source {
        LoadSource::File(path) => load_file(&path),
        LoadSource::Glob(pattern) => load_glob(&pattern),
        LoadSource::Text(text) => parse_text(&text),
        LoadSource::Value(value) => Ok(value),
    }
}

/// Reads one file, parsing JSON by extension and YAML otherwise.
pub fn load_file(path: &Path) -> Result<Value> {
    debug!("Loading {}", path.display());
    let content = fs::read_to_string(path)?;
    if path.has_extension(extensions::JSON) {
        let parsed: serde_json::Value = serde_json::from_str(&content)?;
        return Ok(Value::from(parsed));
    }
    let parsed: serde_yaml::Value = serde_yaml::from_str(&content)?;
    Ok(empty_as_map(Value::from(parsed)))
}

/// Merges every YAML or JSON file matching `pattern`, in sorted order.
pub fn load_glob(pattern: &str) -> Result<Value> {
    let files = expand_glob(pattern)?;
    if files.is_empty() {
        info!("No files matched {pattern:?}, using an empty configuration");
        return Ok(Value::Map(IndexMap::new()));
    }
    let mut merged = Value::Map(IndexMap::new());
    for file in files {
        merged.merge(load_file(&file)?);
    }
    Ok(merged)
}

/// The data files matching `pattern`, sorted.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let matcher = GlobBuilder::new(pattern).literal_separator(true).build()?.compile_matcher();
    let root = glob_root(pattern);
    let relative = root.as_os_str().is_empty();
    let walk_root = if relative { Path::new(".") } else { root.as_path() };
    debug!("Expanding {pattern:?} under {}", walk_root.display());

    let mut files: Vec<PathBuf> = WalkDir::new(walk_root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| {
            let path = entry.path();
            if relative {
                path.strip_prefix(".").unwrap_or(path).to_path_buf()
            } else {
                path.to_path_buf()
            }
        })
        .filter(|path| matcher.is_match(path))
        .filter(|path| path.has_extension(extensions::YAML) || path.has_extension(extensions::JSON))
        .collect();
    files.sort();
    debug!("Matched {} file(s)", files.len());
    Ok(files)
}

/// The leading directories of `pattern` that contain no glob characters.
fn glob_root(pattern: &str) -> PathBuf {
    Path::new(pattern)
        .components()
        .take_while(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|part| !part.contains(GLOB_CHARS))
        })
        .collect()
}

/// Parses inline YAML (and therefore JSON) text. Only documents holding a
/// mapping or a list are accepted.
pub fn parse_text(text: &str) -> Result<Value> {
    let parsed: serde_yaml::Value = serde_yaml::from_str(text)?;
    match empty_as_map(Value::from(parsed)) {
        value if value.is_container() => Ok(value),
        _ => Err(Error::SourceError { source_str: text.to_string() }),
    }
}

fn empty_as_map(value: Value) -> Value {
    if value.is_nothing() {
        Value::Map(IndexMap::new())
    } else {
        value
    }
}
