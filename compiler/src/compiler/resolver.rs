//! Token and Path Resolver
//!
//! Splits literal text and attribute values into literal and
//! `{{ path }}` segments, and resolves each reference into its
//! hierarchical binding path.
//!

use super::CompileError;
use super::patterns::{PATH, TOKEN};
use std::fmt;

// ------------------------------------------------------------- Public Types

/// A dotted reference split into its segments. Array elements
/// are addressed structurally by directives, never by index.
///
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingPath {
    segments: Vec<String>,
}

/// One piece of a scanned string.
///
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Token(BindingPath),
}

// ------------------------------------------------------------- Public Implementations

impl BindingPath {
    /// Parses `user.name.first` into its segments. Whitespace
    /// around the whole path is ignored.
    ///
    pub fn parse(raw: &str) -> Result<Self, CompileError> {
        let path = raw.trim();
        if !PATH.is_match(path) {
            return Err(CompileError::InvalidPath(path.to_string()));
        }

        Ok(Self {
            segments: path.split('.').map(str::to_string).collect(),
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The leading segment, which partitions the identifier
    /// namespace of a template.
    ///
    pub fn key(&self) -> &str {
        &self.segments[0]
    }

    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }
}

impl fmt::Display for BindingPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted())
    }
}

// ------------------------------------------------------------- Public Functions

/// Strips newlines, carriage returns and tabs, then trims the
/// surrounding whitespace. Applied to every text and attribute
/// value before scanning.
///
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '\n' | '\r' | '\t'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Splits a normalized string into literal and token segments.
/// Empty literals between adjacent tokens are dropped.
///
pub fn scan(text: &str) -> Result<Vec<Segment>, CompileError> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in TOKEN.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if whole.start() > last {
            segments.push(Segment::Literal(text[last..whole.start()].to_string()));
        }
        segments.push(Segment::Token(BindingPath::parse(&caps[1])?));
        last = whole.end();
    }

    if last < text.len() {
        segments.push(Segment::Literal(text[last..].to_string()));
    }

    Ok(segments)
}

/// Returns the text with every token removed. This is the
/// literal a node is pre-filled with before any update.
///
pub fn strip_tokens(text: &str) -> String {
    TOKEN.replace_all(text, "").into_owned()
}

pub fn has_tokens(segments: &[Segment]) -> bool {
    segments.iter().any(|s| matches!(s, Segment::Token(_)))
}

/// Resolves a directive attribute value. Both `items` and
/// `{{items}}` name the same path.
///
pub fn directive_path(value: &str) -> Result<BindingPath, CompileError> {
    let value = normalize(value);
    let inner = value
        .strip_prefix("{{")
        .and_then(|rest| rest.strip_suffix("}}"))
        .unwrap_or(&value);
    BindingPath::parse(inner)
}

// ------------------------------------------------------------- Unit Tests
