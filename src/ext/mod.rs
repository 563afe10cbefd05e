//! Extension traits for standard library types.
//!
//! Each trait lives in a file named after the type it extends and is
//! re-exported here.

pub mod path;

pub use path::PathExt;
