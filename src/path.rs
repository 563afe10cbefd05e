//! Dotted key paths such as `a.b[2].c`

use crate::error::{Error, Result};
use std::fmt;

/// One step of a path: a mapping key or a list position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Name(String),
    Index(usize),
}

impl Key {
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Key::Name(name) => Some(name),
            Key::Index(_) => None,
        }
    }

    /// The position this key addresses in a list, if any.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(index) => Some(*index),
            Key::Name(name) => name.parse().ok(),
        }
    }

    /// The key this addresses in a mapping.
    pub fn to_name(&self) -> String {
        match self {
            Key::Name(name) => name.clone(),
            Key::Index(index) => index.to_string(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => write!(f, "{name}"),
            Key::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

/// A parsed path. The empty path addresses the root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyPath(Vec<Key>);

impl KeyPath {
    pub fn root() -> Self {
        KeyPath(Vec::new())
    }

    pub fn parse(text: &str) -> Result<KeyPath> {
        let invalid = |reason: &str| Error::InvalidPath {
            path: text.to_string(),
            reason: reason.to_string(),
        };
        if text.is_empty() {
            return Ok(KeyPath::root());
        }

        let mut keys = Vec::new();
        for part in text.split('.') {
            if part.is_empty() {
                return Err(invalid("empty segment"));
            }
            let (name, mut rest) = match part.find('[') {
                Some(start) => part.split_at(start),
                None => (part, ""),
            };
            if !name.is_empty() {
                keys.push(match name.parse::<usize>() {
                    Ok(index) => Key::Index(index),
                    Err(_) => Key::Name(name.to_string()),
                });
            } else if rest.is_empty() {
                return Err(invalid("empty segment"));
            }
            while !rest.is_empty() {
                let close = rest.find(']').ok_or_else(|| invalid("unclosed '['"))?;
                let index = rest[1..close]
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| invalid("list index must be a non-negative integer"))?;
                keys.push(Key::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(invalid("unexpected text after ']'"));
                }
            }
        }
        Ok(KeyPath(keys))
    }

    pub fn keys(&self) -> &[Key] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Splits into the path of the parent and the last key.
    pub fn split_last(&self) -> Option<(KeyPath, &Key)> {
        let (last, parent) = self.0.split_last()?;
        Some((KeyPath(parent.to_vec()), last))
    }

    pub fn push(&mut self, key: Key) {
        self.0.push(key);
    }
}

impl From<Vec<Key>> for KeyPath {
    fn from(keys: Vec<Key>) -> Self {
        KeyPath(keys)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.0.iter().enumerate() {
            match key {
                Key::Index(index) => write!(f, "[{index}]")?,
                Key::Name(name) if i == 0 => write!(f, "{name}")?,
                Key::Name(name) => write!(f, ".{name}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dots_and_brackets() {
        let path = KeyPath::parse("a.b[2].c").unwrap();
        assert_eq!(
            path.keys(),
            &[Key::from("a"), Key::from("b"), Key::Index(2), Key::from("c")]
        );
        assert_eq!(KeyPath::parse("a.b.2.c").unwrap(), path);
        assert_eq!(path.to_string(), "a.b[2].c");
    }

    #[test]
    fn parses_nested_indices() {
        let path = KeyPath::parse("m[0][1]").unwrap();
        assert_eq!(path.keys(), &[Key::from("m"), Key::Index(0), Key::Index(1)]);
    }

    #[test]
    fn rejects_empty_segments() {
        assert!(matches!(KeyPath::parse("a..b"), Err(Error::InvalidPath { .. })));
        assert!(KeyPath::parse(".a").is_err());
        assert!(KeyPath::parse("a[x]").is_err());
        assert!(KeyPath::parse("a[1").is_err());
    }

    #[test]
    fn empty_text_is_root() {
        assert!(KeyPath::parse("").unwrap().is_root());
    }

    #[test]
    fn splits_last_key() {
        let path = KeyPath::parse("a.b").unwrap();
        let (parent, last) = path.split_last().unwrap();
        assert_eq!(parent.to_string(), "a");
        assert_eq!(last, &Key::from("b"));
    }
}
