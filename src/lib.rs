/// The explicitly absent sentinel and its misuse circuit breaker.
pub mod absent;

/// Functions registered in every function registry.
pub mod builtins;

/// Handles argument parsing and command execution.
pub mod cli;

/// The configuration facade and the process-wide shared instance.
pub mod config;

/// Reserved keys, markers and other constants.
pub mod constants;

/// Type references declared by definitions.
pub mod dtype;

/// Defines custom error types.
pub mod error;

/// Extension traits for standard library types.
pub mod ext;

/// Loads raw data from files, glob patterns and inline text.
pub mod loader;

/// Interpolation of `${...}` references.
pub mod magic;

/// The arena node tree.
pub mod node;

/// Behavioural flags shared by every node.
pub mod options;

/// Ordered merging of named sections.
pub mod patch;

/// Dotted key paths.
pub mod path;

/// Process-wide registry of named functions.
pub mod registry;

/// Definitions applied over the data tree.
pub mod schema;

/// Annotated YAML templates and dumps.
pub mod template;

/// Validation engine and error reports.
pub mod validate;

/// The raw data model.
pub mod value;

pub use config::{global, Config, ConfigBuilder, SharedConfig};
pub use error::{Error, Result};
pub use options::Options;
pub use patch::PatchOrder;
pub use validate::ErrorReport;
pub use value::Value;
