//! Scenario suites

pub mod search;

use crate::runner::Scenario;

/// Every scenario this crate ships
pub fn all() -> Vec<Scenario> {
    search::scenarios()
}
