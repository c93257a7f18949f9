//! TOML Parsing
//!
//! Lightweight parsing for yate.toml. Understands comments,
//! section headers and boolean values, which is all the build
//! settings need.
//!

// ------------------------------------------------------------- Public Functions

/// Finds a boolean `key` inside `[section]`. Keys with the same
/// name in other sections are ignored.
///
pub fn parse_section_bool(content: &str, section: &str, key: &str) -> Option<bool> {
    let header = format!("[{}]", section);
    let mut in_section = false;

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if trimmed.starts_with('[') {
            in_section = trimmed == header;
            continue;
        }

        if in_section && let Some(value) = parse_bool(trimmed, key) {
            return Some(value);
        }
    }

    None
}

// ------------------------------------------------------------- Private Functions

/// Reads `key = true|false`, ignoring any trailing comment.
///
fn parse_bool(line: &str, key: &str) -> Option<bool> {
    let line = line.split('#').next()?.trim();
    let (line_key, value) = line.split_once('=')?;

    if line_key.trim() != key {
        return None;
    }

    match value.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

// ------------------------------------------------------------- Unit Tests
