//! Assertion helpers for scenarios
//!
//! Each helper returns `Error::Assertion` naming the checked quantity, the expectation and
//! the observed value, so a failed scenario reads as one line in the report.

use std::fmt::Display;

use crate::{Error, Result};

pub fn ensure(what: &str, condition: bool) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(Error::assertion(what, true, false))
    }
}

pub fn ensure_not(what: &str, condition: bool) -> Result<()> {
    if condition {
        Err(Error::assertion(what, false, true))
    } else {
        Ok(())
    }
}

pub fn ensure_eq<T: PartialEq + Display>(what: &str, expected: T, observed: T) -> Result<()> {
    if expected == observed {
        Ok(())
    } else {
        Err(Error::assertion(what, expected, observed))
    }
}

/// `observed > bound`
pub fn ensure_gt<T: PartialOrd + Display>(what: &str, observed: T, bound: T) -> Result<()> {
    if observed > bound {
        Ok(())
    } else {
        Err(Error::assertion(what, format!("more than {}", bound), observed))
    }
}

/// `observed >= bound`
pub fn ensure_ge<T: PartialOrd + Display>(what: &str, observed: T, bound: T) -> Result<()> {
    if observed >= bound {
        Ok(())
    } else {
        Err(Error::assertion(what, format!("at least {}", bound), observed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_eq_reports_both_sides() {
        let err = ensure_eq("search_input_value", "css", "html").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Assertion failed: search_input_value: expected css, observed html"
        );
        assert!(ensure_eq("search_result_items_length", 10, 10).is_ok());
    }

    #[test]
    fn test_ordering_helpers() {
        assert!(ensure_gt("documents_found", 120, 100).is_ok());
        assert!(ensure_gt("documents_found", 100, 100).is_err());
        assert!(ensure_ge("documents_found", 100, 100).is_ok());

        let err = ensure_ge("documents_found", 90, 100).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Assertion failed: documents_found: expected at least 100, observed 90"
        );
    }

    #[test]
    fn test_boolean_helpers() {
        assert!(ensure("is_main_column_present", true).is_ok());
        assert!(matches!(
            ensure_not("is_signin_displayed", true),
            Err(Error::Assertion { .. })
        ));
    }
}
