//! kuma-pages: page objects and search UI scenarios for Kuma (MDN)
//!
//! Scenarios drive a browser session through page objects and assert on the values they
//! return. Sessions come from a Chrome DevTools Protocol binding in production and from an
//! in-memory document in tests.

pub mod error;
pub mod config;

pub mod cdp;
pub mod driver;
pub mod wait;
pub mod pages;
pub mod status;
pub mod urls;
pub mod markers;
pub mod check;
pub mod runner;
pub mod suite;

// Re-exports
pub use error::{Error, Result};
pub use config::Config;

/// kuma-pages library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
