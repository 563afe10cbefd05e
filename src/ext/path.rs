use std::path::Path;

use crate::error::{Error, Result};

/// Extension trait for Path with the conversions and checks the loader needs
pub trait PathExt {
    /// Converts a path to a string slice, returning an error if the path contains invalid Unicode characters.
    ///
    /// # Returns
    /// * `Ok(&str)` - A string slice representing the path
    /// * `Err(Error)` - If the path contains invalid Unicode characters
    ///
    /// # Examples
    /// ```
    /// use sectree::ext::PathExt;
    /// use std::path::Path;
    ///
    /// let path = Path::new("config.yaml");
    /// assert_eq!(path.to_str_checked().unwrap(), "config.yaml");
    /// ```
    fn to_str_checked(&self) -> Result<&str>;

    /// Whether the file extension is one of `extensions`, ignoring case.
    ///
    /// # Examples
    /// ```
    /// use sectree::ext::PathExt;
    /// use std::path::Path;
    ///
    /// assert!(Path::new("defs.YML").has_extension(&["yaml", "yml"]));
    /// assert!(!Path::new("defs").has_extension(&["yaml", "yml"]));
    /// ```
    fn has_extension(&self, extensions: &[&str]) -> bool;
}

impl PathExt for Path {
    fn to_str_checked(&self) -> Result<&str> {
        self.to_str().ok_or_else(|| {
            Error::Other(anyhow::anyhow!(
                "Path '{}' contains invalid Unicode characters",
                self.display()
            ))
        })
    }

    fn has_extension(&self, extensions: &[&str]) -> bool {
        self.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|known| known.eq_ignore_ascii_case(ext)))
    }
}
