//! Markup Parser
//!
//! Builds the markup tree from the lexer's token stream. Open
//! elements are tracked on an explicit stack so deeply nested
//! templates never hit the recursion limit.
//!

use super::lexer::Token;
use super::{Element, Node};
use thiserror::Error;

// ------------------------------------------------------------- Public Types

/// Errors that can occur while building the tree. Each variant
/// describes a structural problem that prevents compilation.
///
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParserError {
    /// Closing tag with no element open.
    ///
    #[error("Unexpected closing tag </{0}>")]
    UnexpectedElementEnd(String),
    /// Closing tag that does not match the innermost open element.
    ///
    #[error("Expected </{expected}> but found </{found}>")]
    MismatchedElementEnd { expected: String, found: String },
    /// Element opened but never closed before end of input.
    ///
    #[error("Unclosed element <{0}>")]
    UnclosedElement(String),
    #[error("Document has no root element")]
    EmptyDocument,
    /// A second element or non-blank text beside the root element.
    ///
    #[error("Document has more than one root node")]
    MultipleRoots,
}

// ------------------------------------------------------------- Public Functions

/// Parses a token stream into a document node holding exactly
/// one root element.
///
pub fn parse(tokens: Vec<Token>) -> Result<Node, ParserError> {
    let mut roots: Vec<Node> = Vec::new();
    let mut open: Vec<Element> = Vec::new();

    for token in tokens {
        match token {
            Token::Text(text) => match open.last_mut() {
                Some(parent) => parent.children.push(Node::Text(text)),
                None if text.trim().is_empty() => {}
                None => roots.push(Node::Text(text)),
            },

            Token::Element {
                tag,
                attributes,
                self_closing,
            } => {
                let element = Element {
                    tag,
                    attributes,
                    children: Vec::new(),
                };

                if self_closing {
                    attach(&mut open, &mut roots, element);
                } else {
                    open.push(element);
                }
            }

            Token::ElementEnd(tag) => {
                let Some(element) = open.pop() else {
                    return Err(ParserError::UnexpectedElementEnd(tag));
                };

                if element.tag != tag {
                    return Err(ParserError::MismatchedElementEnd {
                        expected: element.tag,
                        found: tag,
                    });
                }

                attach(&mut open, &mut roots, element);
            }
        }
    }

    if let Some(element) = open.pop() {
        return Err(ParserError::UnclosedElement(element.tag));
    }

    match roots.len() {
        0 => Err(ParserError::EmptyDocument),
        1 if matches!(roots[0], Node::Element(_)) => Ok(Node::Document { children: roots }),
        1 => Err(ParserError::EmptyDocument),
        _ => Err(ParserError::MultipleRoots),
    }
}

// ------------------------------------------------------------- Private Functions

/// Appends a finished element to the innermost open element, or
/// to the document roots when nothing is open.
///
fn attach(open: &mut [Element], roots: &mut Vec<Node>, element: Element) {
    match open.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None => roots.push(Node::Element(element)),
    }
}

// ------------------------------------------------------------- Unit Tests
