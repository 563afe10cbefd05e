//! The `Absent` sentinel
//!
//! `Absent` stands for "explicitly nothing". Every access on it yields
//! `Absent` again, so chained lookups never fail. Calling it or assigning
//! into it is tolerated but counted: a burst of such misuse within one
//! window means some caller is spinning on the sentinel, and the process
//! is aborted instead of flooding the log forever.

use crate::constants::{absent, ABSENT_TOKEN};
use crate::value::Value;
use log::{error, warn};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// The sentinel type. All instances are interchangeable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Absent;

/// The sentinel value.
pub const ABSENT: Absent = Absent;

static WARNINGS: AtomicBool = AtomicBool::new(true);

static MISUSE: Lazy<Mutex<MisuseWindow>> = Lazy::new(|| Mutex::new(MisuseWindow::new()));

/// Enables or disables the misuse warning. Misuse is counted either way.
pub fn set_warnings(enabled: bool) {
    WARNINGS.store(enabled, Ordering::Relaxed);
}

impl Absent {
    /// Attribute-style access; always the sentinel.
    pub fn get(&self, _key: &str) -> Absent {
        Absent
    }

    /// Item-style access; always the sentinel.
    pub fn index(&self, _index: usize) -> Absent {
        Absent
    }

    pub fn is_truthy(&self) -> bool {
        false
    }

    pub fn len(&self) -> usize {
        0
    }

    pub fn is_empty(&self) -> bool {
        true
    }

    pub fn iter(&self) -> std::iter::Empty<Value> {
        std::iter::empty()
    }

    /// Calling the sentinel returns it, but counts as misuse.
    pub fn call(&self) -> Absent {
        record_misuse("Absent was called like a function");
        Absent
    }

    /// Assigning into the sentinel does nothing, but counts as misuse.
    pub fn set(&self, key: &str, _value: Value) {
        record_misuse(&format!(
            "Absent cannot take assignments (key {key:?}), the value is dropped"
        ));
    }

    pub fn to_value(self) -> Value {
        Value::Absent
    }
}

impl fmt::Display for Absent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ABSENT_TOKEN}")
    }
}

impl From<Absent> for Value {
    fn from(_: Absent) -> Self {
        Value::Absent
    }
}

impl PartialEq<Value> for Absent {
    fn eq(&self, other: &Value) -> bool {
        other.is_nothing()
    }
}

impl PartialEq<Absent> for Value {
    fn eq(&self, _: &Absent) -> bool {
        self.is_nothing()
    }
}

impl<T> PartialEq<Option<T>> for Absent {
    fn eq(&self, other: &Option<T>) -> bool {
        other.is_none()
    }
}

/// Sliding counter of misuse events.
#[derive(Debug)]
pub(crate) struct MisuseWindow {
    start: Instant,
    count: u32,
    limit: u32,
    span: Duration,
}

impl MisuseWindow {
    fn new() -> Self {
        Self::with_limit(absent::MISUSE_LIMIT, Duration::from_millis(absent::MISUSE_WINDOW_MS))
    }

    pub(crate) fn with_limit(limit: u32, span: Duration) -> Self {
        Self { start: Instant::now(), count: 0, limit, span }
    }

    /// Records one event at `now`; returns true once the limit is exceeded.
    pub(crate) fn record(&mut self, now: Instant) -> bool {
        if now.duration_since(self.start) > self.span {
            self.start = now;
            self.count = 0;
        }
        self.count += 1;
        self.count > self.limit
    }
}

fn record_misuse(message: &str) {
    if WARNINGS.load(Ordering::Relaxed) {
        warn!("{message}");
    }
    let tripped = MISUSE.lock().record(Instant::now());
    if tripped {
        error!(
            "Absent was misused more than {} times within {}ms, aborting to stop a runaway loop",
            absent::MISUSE_LIMIT,
            absent::MISUSE_WINDOW_MS
        );
        std::process::abort();
    }
}
