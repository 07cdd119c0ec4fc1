//! Validation of category names and filenames.
//!
//! Both end up inside a URL key, so neither may contain the key separator.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static CATEGORY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_\-]+$").expect("valid category regex"));

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static FILENAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_\-\s\.]+$").expect("valid filename regex"));

/// A category or file name that cannot be used in a URL key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error(
        "invalid category name '{0}'\n  Suggestion: Use only letters, digits, '_' and '-'"
    )]
    Category(String),

    #[error(
        "invalid filename '{0}'\n  Suggestion: Use only letters, digits, spaces, '_', '-' and '.'"
    )]
    Filename(String),
}

/// Checks that `name` is usable as a category.
///
/// # Errors
///
/// Returns [`NameError::Category`] for empty names or disallowed characters.
pub fn validate_category_name(name: &str) -> Result<(), NameError> {
    if CATEGORY_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(NameError::Category(name.to_string()))
    }
}

/// Checks that `name` is usable as a filename.
///
/// Names made only of dots are refused so `.` and `..` never reach the file layer.
///
/// # Errors
///
/// Returns [`NameError::Filename`] for empty names, dot-only names or
/// disallowed characters.
pub fn validate_filename(name: &str) -> Result<(), NameError> {
    if FILENAME_PATTERN.is_match(name) && !name.chars().all(|c| c == '.') {
        Ok(())
    } else {
        Err(NameError::Filename(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_name_accepts_simple_names() {
        assert!(validate_category_name("release-notes_2").is_ok());
    }

    #[test]
    fn test_category_name_rejects_separator_and_empty() {
        assert!(validate_category_name("a/b").is_err());
        assert!(validate_category_name("").is_err());
        assert!(validate_category_name("with space").is_err());
    }

    #[test]
    fn test_filename_accepts_dots_and_spaces() {
        assert!(validate_filename("My Manual v1.2.pdf").is_ok());
    }

    #[test]
    fn test_filename_rejects_traversal_and_separator() {
        assert!(validate_filename("..").is_err());
        assert!(validate_filename(".").is_err());
        assert!(validate_filename("dir/file.txt").is_err());
        assert!(validate_filename("").is_err());
    }

    #[test]
    fn test_name_error_message_has_suggestion() {
        let msg = NameError::Category("a/b".to_string()).to_string();
        assert!(msg.contains("a/b"));
        assert!(msg.contains("Suggestion"));
    }
}
