use crate::constants::magic;
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

static PATTERN: Lazy<Option<Regex>> = Lazy::new(|| match Regex::new(magic::PATTERN) {
    Ok(regex) => Some(regex),
    Err(err) => {
        warn!("Invalid interpolation pattern: {err}");
        None
    }
});

/// What a `${...}` occurrence refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// A config path. `up` is `None` for lookups from the root, otherwise
    /// the number of levels to climb from the referencing node first.
    Path { up: Option<usize>, path: String },
    Env(String),
    /// Function call whose result is substituted as text.
    Call(String),
    /// Function call whose result replaces the whole value.
    Replace(String),
    Unknown(String),
}

impl Marker {
    /// Classifies the text between `${` and `}`.
    pub fn parse(body: &str, relativity: bool) -> Marker {
        let body = body.trim();
        let mut chars = body.chars();
        match chars.next() {
            Some(magic::ENV) => Marker::Env(chars.as_str().to_string()),
            Some(magic::CALL) => Marker::Call(chars.as_str().trim().to_string()),
            Some(magic::REPLACE) => Marker::Replace(chars.as_str().trim().to_string()),
            Some(magic::PATH) => {
                let dots = body.chars().take_while(|c| *c == magic::PATH).count();
                let path = body[dots..].to_string();
                let up = (dots > 1 && relativity).then_some(dots - 1);
                Marker::Path { up, path }
            }
            Some(c) if c.is_alphanumeric() || c == '_' => Marker::Path { up: None, path: body.to_string() },
            _ => Marker::Unknown(body.to_string()),
        }
    }
}

/// One `${...}` occurrence inside a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Magic {
    /// The occurrence including `${` and `}`.
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub marker: Marker,
}

/// All occurrences in `text`, in order.
pub fn find(text: &str, relativity: bool) -> Vec<Magic> {
    let Some(pattern) = PATTERN.as_ref() else {
        return Vec::new();
    };
    pattern
        .captures_iter(text)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let body = captures.get(1)?;
            Some(Magic {
                text: whole.as_str().to_string(),
                start: whole.start(),
                end: whole.end(),
                marker: Marker::parse(body.as_str(), relativity),
            })
        })
        .collect()
}

pub fn contains_magic(text: &str) -> bool {
    PATTERN.as_ref().is_some_and(|pattern| pattern.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(up: Option<usize>, path: &str) -> Marker {
        Marker::Path { up, path: path.to_string() }
    }

    #[test]
    fn classifies_markers() {
        assert_eq!(Marker::parse(".a.b", true), path(None, "a.b"));
        assert_eq!(Marker::parse("..a", true), path(Some(1), "a"));
        assert_eq!(Marker::parse("...a.b", true), path(Some(2), "a.b"));
        assert_eq!(Marker::parse("a.b", true), path(None, "a.b"));
        assert_eq!(Marker::parse("$HOME", true), Marker::Env("HOME".into()));
        assert_eq!(Marker::parse("?gen_hash", true), Marker::Call("gen_hash".into()));
        assert_eq!(Marker::parse("!absent", true), Marker::Replace("absent".into()));
        assert_eq!(Marker::parse("", true), Marker::Unknown(String::new()));
    }

    #[test]
    fn relativity_off_makes_paths_absolute() {
        assert_eq!(Marker::parse("..a", false), path(None, "a"));
    }

    #[test]
    fn finds_every_occurrence() {
        let found = find("${.a}/x/${$HOME}", true);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].text, "${.a}");
        assert_eq!((found[0].start, found[0].end), (0, 5));
        assert_eq!(found[1].marker, Marker::Env("HOME".into()));
        assert!(contains_magic("a ${b} c"));
        assert!(!contains_magic("a $b c"));
    }
}
