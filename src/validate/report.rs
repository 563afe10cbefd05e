use crate::registry::CheckOutcome;
use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;

/// The result stored under one report key.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Pass,
    Message(String),
    Messages(Vec<String>),
    Nested(ErrorReport),
}

impl Entry {
    pub fn is_pass(&self) -> bool {
        match self {
            Entry::Pass => true,
            Entry::Message(_) => false,
            Entry::Messages(messages) => messages.is_empty(),
            Entry::Nested(report) => report.count() == 0,
        }
    }

    fn count(&self) -> usize {
        match self {
            Entry::Pass => 0,
            Entry::Message(_) => 1,
            Entry::Messages(messages) => messages.len(),
            Entry::Nested(report) => report.count(),
        }
    }
}

impl From<CheckOutcome> for Entry {
    fn from(outcome: CheckOutcome) -> Self {
        match outcome {
            CheckOutcome::Pass => Entry::Pass,
            CheckOutcome::Fail(message) => Entry::Message(message),
            CheckOutcome::FailMany(messages) => Entry::Messages(messages),
        }
    }
}

impl Serialize for Entry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Entry::Pass => serializer.serialize_bool(true),
            Entry::Message(message) => serializer.serialize_str(message),
            Entry::Messages(messages) => messages.serialize(serializer),
            Entry::Nested(report) => report.serialize(serializer),
        }
    }
}

/// Validation results keyed by check name, with children nested under
/// their dotted names.
///
/// A fresh report records passing checks too; [`ErrorReport::reduce`]
/// keeps only the failures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorReport(IndexMap<String, Entry>);

impl ErrorReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: Entry) {
        self.0.insert(key.into(), entry);
    }

    /// Records a check result. A second result under the same key is
    /// combined with the first.
    pub fn record(&mut self, key: impl Into<String>, outcome: CheckOutcome) {
        let key = key.into();
        let Some(previous) = self.0.get_mut(&key) else {
            self.0.insert(key, Entry::from(outcome));
            return;
        };
        if outcome.passed() && !previous.is_pass() {
            return;
        }
        *previous = match std::mem::replace(previous, Entry::Pass) {
            Entry::Message(message) => {
                let mut messages = vec![message];
                messages.extend(outcome.messages());
                Entry::Messages(messages)
            }
            Entry::Messages(mut messages) => {
                messages.extend(outcome.messages());
                Entry::Messages(messages)
            }
            _ => Entry::from(outcome),
        };
    }

    /// Nests a child's report under `key`.
    pub fn nest(&mut self, key: impl Into<String>, report: ErrorReport) {
        self.0.insert(key.into(), Entry::Nested(report));
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Entry)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No entries at all. Reduce first to ask whether anything failed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of failure messages, nested ones included.
    pub fn count(&self) -> usize {
        self.0.values().map(Entry::count).sum()
    }

    /// A copy holding only failures. Nested reports without failures are
    /// dropped entirely.
    pub fn reduce(&self) -> ErrorReport {
        ErrorReport(
            self.0
                .iter()
                .filter(|(_, entry)| !entry.is_pass())
                .map(|(key, entry)| {
                    let entry = match entry {
                        Entry::Nested(report) => Entry::Nested(report.reduce()),
                        other => other.clone(),
                    };
                    (key.clone(), entry)
                })
                .collect(),
        )
    }

    /// Indented lines, one per key, nesting by two spaces.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        for (key, entry) in &self.0 {
            match entry {
                Entry::Pass => out.push_str(&format!("{indent}{key}: ok\n")),
                Entry::Message(message) => out.push_str(&format!("{indent}{key}: {message}\n")),
                Entry::Messages(messages) => {
                    out.push_str(&format!("{indent}{key}:\n"));
                    for message in messages {
                        out.push_str(&format!("{indent}  - {message}\n"));
                    }
                }
                Entry::Nested(report) => {
                    out.push_str(&format!("{indent}{key}:\n"));
                    report.render_into(out, depth + 1);
                }
            }
        }
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl Serialize for ErrorReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, entry) in &self.0 {
            map.serialize_entry(key, entry)?;
        }
        map.end()
    }
}
