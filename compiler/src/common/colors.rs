//! Terminal Colors
//!
//! ANSI escape codes for the binary's own messages.
//!

// ------------------------------------------------------------- Public Consts

/// Errors and fatal conditions.
///
pub const RED: &str = "\x1b[0;31m";

/// Usage hints and non-fatal notices.
///
pub const YELLOW: &str = "\x1b[0;33m";

/// Resets the terminal color.
///
pub const NC: &str = "\x1b[0m";
