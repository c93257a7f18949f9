//! Markup Tree
//!
//! The parsed form of a template file. The tree compiler only
//! needs three node kinds (document, element, text), so the
//! parser drops comments and declarations before they reach
//! this representation.
//!

pub mod lexer;
pub mod parser;

use thiserror::Error;

pub use lexer::LexerError;
pub use parser::ParserError;

// ------------------------------------------------------------- Public Types

/// A node of the markup tree. The document node wraps the
/// single root element that templates are compiled from.
///
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Whole parsed file. Holds exactly one root element after
    /// a successful parse.
    ///
    Document { children: Vec<Node> },
    Element(Element),
    /// Text content with entities already decoded.
    ///
    Text(String),
}

/// An element with its attributes in source order.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

/// A single `name="value"` pair. Bare attributes carry an
/// empty value.
///
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Either stage of parsing can fail. Kept as one type so
/// callers propagate a single error from `parse`.
///
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarkupError {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error(transparent)]
    Parser(#[from] ParserError),
}

// ------------------------------------------------------------- Public Implementations

impl Element {
    /// Creates an element with no attributes or children.
    ///
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Returns the value of the named attribute, if present.
    ///
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Removes the named attribute and returns its value. Used
    /// by the compiler to consume directive attributes so the
    /// nested template sees a directive-free element.
    ///
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(index).value)
    }
}

// ------------------------------------------------------------- Public Functions

/// Parses template source into a document node. Lexing and
/// tree building both fail fast on malformed markup.
///
pub fn parse(source: &str) -> Result<Node, MarkupError> {
    let tokens = lexer::tokenize(source)?;
    Ok(parser::parse(tokens)?)
}

// ------------------------------------------------------------- Unit Tests

#[cfg(test)]
mod tests {
    use super::*;

    // ----------------------------------------- parse tests

    #[test]
    fn test_parse_document() {
        let doc = parse("<p class=\"x\">hi</p>").unwrap();
        let Node::Document { children } = doc else {
            panic!("expected document");
        };
        assert_eq!(children.len(), 1);
        let Node::Element(el) = &children[0] else {
            panic!("expected element");
        };
        assert_eq!(el.tag, "p");
        assert_eq!(el.attribute("class"), Some("x"));
        assert_eq!(el.children, vec![Node::Text("hi".to_string())]);
    }

    #[test]
    fn test_parse_propagates_lexer_error() {
        let err = parse("<div").unwrap_err();
        assert!(matches!(err, MarkupError::Lexer(_)));
    }

    #[test]
    fn test_parse_propagates_parser_error() {
        let err = parse("<div>").unwrap_err();
        assert!(matches!(err, MarkupError::Parser(_)));
    }

    // ----------------------------------------- remove_attribute tests

    #[test]
    fn test_remove_attribute() {
        let mut el = Element::new("li");
        el.attributes.push(Attribute {
            name: "for".to_string(),
            value: "items".to_string(),
        });
        el.attributes.push(Attribute {
            name: "class".to_string(),
            value: "row".to_string(),
        });

        assert_eq!(el.remove_attribute("for"), Some("items".to_string()));
        assert_eq!(el.remove_attribute("for"), None);
        assert_eq!(el.attributes.len(), 1);
        assert_eq!(el.attribute("class"), Some("row"));
    }
}
