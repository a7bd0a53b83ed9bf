//! Utility functions shared by the construction and the binary
//!
//! ## Modules
//!
//! - [`encoding`] - Fixed-width little-endian integers of the output files
//! - [`progress`] - Pass progress bars (no-op without the `progress` feature)

pub mod encoding;
pub mod progress;

pub use encoding::*;
