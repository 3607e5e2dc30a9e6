//! Formatting helpers shared by the binaries.

pub mod format;

pub use format::{format_elapsed, format_megabytes, format_percent};
