//! Behaviour flags shared by every node of a tree

use crate::error::Result;
use crate::ext::PathExt;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Flags propagated from the root to every node at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// Coerce resolved scalars to their declared dtype.
    #[serde(default = "get_default_true")]
    pub coerce: bool,
    /// Resolve `${...}` references when a value is read.
    #[serde(default = "get_default_true")]
    pub interpolate: bool,
    /// Honour relative `${..key}` lookups. When off they are read as absolute.
    #[serde(default = "get_default_true")]
    pub relativity: bool,
    /// Read a lone backslash as the absent sentinel.
    #[serde(default = "get_default_true")]
    pub convert_slashes: bool,
    /// Resolve referenced scalars before using them in a lookup.
    #[serde(default = "get_default_true")]
    pub recursive: bool,
    /// Treat an explicit absent value like a missing one, so the default applies.
    #[serde(default)]
    pub absent_is_missing: bool,
    /// Run checks on schema-synthesised fields during validation.
    #[serde(default)]
    pub strict: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            coerce: true,
            interpolate: true,
            relativity: true,
            convert_slashes: true,
            recursive: true,
            absent_is_missing: false,
            strict: false,
        }
    }
}

impl Options {
    /// Reads options from a YAML or JSON document.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading options from {}", path.to_str_checked()?);
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }
}

fn get_default_true() -> bool {
    true
}
