//! Constants used throughout sectree

/// Spelling of an explicitly absent value, both on input and when serialising.
pub const ABSENT_TOKEN: &str = "\\";

/// Reserved section key declaring the prerequisite patch chain of a section.
pub const PATCH_DIRECTIVE: &str = "sectree.patch";

/// Separator of the string patch syntax, `a<-b<-c`.
pub const PATCH_SEPARATOR: &str = "<-";

/// Leading marker that distinguishes a schema field from a schema directive.
pub const FIELD_MARKER: char = '.';

/// File extensions recognised by the loader
pub mod extensions {
    pub const YAML: &[&str] = &["yaml", "yml"];
    pub const JSON: &[&str] = &["json"];
}

/// Keys understood inside a definitions document
pub mod schema_keys {
    pub const DTYPE: &str = "dtype";
    pub const DEFAULT: &str = "default";
    pub const REQUIRED: &str = "required";
    pub const STRICT: &str = "strict";
    pub const CHECKS: &str = "checks";
    pub const TAGS: &str = "tags";
    pub const SUBTYPES: &str = "subtypes";
    pub const CHILDREN: &str = "children";
    pub const ITEMS: &str = "items";
    pub const MATCH: &str = "match";
    pub const CASE: &str = "case";
    pub const KEY: &str = "key";
    pub const VALUE: &str = "value";
    pub const SDESC: &str = "sdesc";
    /// Matches every dtype or every key inside a `match` case.
    pub const WILDCARD: &str = "*";
}

/// Interpolation markers, the first character inside `${...}`
pub mod magic {
    pub const PATTERN: &str = r"\$\{([^}]*)\}";
    pub const PATH: char = '.';
    pub const ENV: char = '$';
    pub const CALL: char = '?';
    pub const REPLACE: char = '!';
}

/// Sentinel misuse circuit breaker
pub mod absent {
    /// Misuse events tolerated inside one window before aborting.
    pub const MISUSE_LIMIT: u32 = 1000;
    pub const MISUSE_WINDOW_MS: u64 = 1000;
}

/// Validation messages
pub mod validation {
    pub const REQUIRED: &str = "This key is required to be manually set in the config";
    pub const TYPE_KEY: &str = "type";
    pub const REQUIRED_KEY: &str = "required";
}

/// Exit codes
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
}

/// Verbosity levels
pub mod verbosity {
    pub const OFF: u8 = 0;
    pub const INFO: u8 = 1;
    pub const DEBUG: u8 = 2;
    pub const TRACE: u8 = 3;
}
