//! Common Utilities
//!
//! CLI parsing, terminal colors and config parsing shared by
//! the binary and the bundler.
//!

pub mod args;
pub mod colors;
pub mod toml;
