//! Markup Lexer
//!
//! Converts template source text into a flat stream of tag and
//! text tokens. Comments, processing instructions and doctype
//! declarations are skipped here so the parser only ever sees
//! the node kinds the tree compiler understands.
//!

use super::Attribute;
use thiserror::Error;

// ------------------------------------------------------------- Public Types

/// Represents a token produced by the lexer.
///
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Text between tags, entities decoded.
    ///
    Text(String),
    /// An opening tag. Self-closing tags never get a matching
    /// ElementEnd token.
    ///
    Element {
        tag: String,
        attributes: Vec<Attribute>,
        self_closing: bool,
    },
    ElementEnd(String),
}

/// Errors that can occur during lexical analysis. Positions are
/// byte offsets into the template source.
///
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexerError {
    /// A tag was opened with `<` but never closed with `>`.
    ///
    #[error("Unterminated tag at position {0}")]
    UnterminatedTag(usize),
    /// A `<!--` comment without its closing `-->`.
    ///
    #[error("Unterminated comment at position {0}")]
    UnterminatedComment(usize),
    /// A closing tag with nothing between `</` and `>`.
    ///
    #[error("Missing tag name at position {0}")]
    MissingTagName(usize),
    /// An attribute value opened with a quote but never closed.
    ///
    #[error("Unterminated attribute value at position {0}")]
    UnterminatedAttribute(usize),
}

// ------------------------------------------------------------- Private Types

/// Internal lexer state tracking the remaining input, current
/// position for error reporting, and accumulated tokens.
///
struct Lexer<'a> {
    input: &'a str,
    position: usize,
    tokens: Vec<Token>,
}

// ------------------------------------------------------------- Private Implementations

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            position: 0,
            tokens: Vec::new(),
        }
    }

    /// Main tokenization loop. Dispatches on the markup construct
    /// at the current position until input is exhausted.
    ///
    fn tokenize(&mut self) -> Result<Vec<Token>, LexerError> {
        while !self.input.is_empty() {
            if self.input.starts_with("<!--") {
                self.skip_comment()?;
            } else if self.input.starts_with("<?") || self.input.starts_with("<!") {
                self.skip_declaration()?;
            } else if self.input.starts_with("</") {
                self.parse_element_end()?;
            } else if self.input.starts_with('<') && self.is_element_start() {
                self.parse_element()?;
            } else {
                self.consume_text();
            }
        }

        Ok(std::mem::take(&mut self.tokens))
    }

    /// Advances the lexer position by n bytes. Updates both the
    /// input slice and position counter to keep them in sync
    /// for accurate error reporting.
    ///
    fn advance(&mut self, n: usize) {
        self.input = &self.input[n..];
        self.position += n;
    }

    /// Checks that `<` is followed by a letter, so stray less-than
    /// signs in text are not mistaken for tags.
    ///
    fn is_element_start(&self) -> bool {
        self.input
            .chars()
            .nth(1)
            .map(|c| c.is_ascii_alphabetic())
            .unwrap_or(false)
    }

    fn skip_comment(&mut self) -> Result<(), LexerError> {
        let start_pos = self.position;
        match self.input[4..].find("-->") {
            Some(end) => {
                self.advance(4 + end + 3);
                Ok(())
            }
            None => Err(LexerError::UnterminatedComment(start_pos)),
        }
    }

    /// Skips `<?xml ...?>` and `<!DOCTYPE ...>` declarations. Both
    /// end at the first `>`.
    ///
    fn skip_declaration(&mut self) -> Result<(), LexerError> {
        let start_pos = self.position;
        match self.input.find('>') {
            Some(end) => {
                self.advance(end + 1);
                Ok(())
            }
            None => Err(LexerError::UnterminatedTag(start_pos)),
        }
    }

    /// Parses a closing tag `</tag>`. Matching against the open
    /// element is left to the parser.
    ///
    fn parse_element_end(&mut self) -> Result<(), LexerError> {
        let start_pos = self.position;

        let Some(end) = self.input.find('>') else {
            return Err(LexerError::UnterminatedTag(start_pos));
        };

        let tag = self.input[2..end].trim().to_string();
        if tag.is_empty() {
            return Err(LexerError::MissingTagName(start_pos));
        }

        self.advance(end + 1);
        self.tokens.push(Token::ElementEnd(tag));
        Ok(())
    }

    /// Parses an opening tag with its attributes. Attribute values
    /// may contain `>` when quoted, so the tag end is found by
    /// walking attributes rather than searching for `>`.
    ///
    fn parse_element(&mut self) -> Result<(), LexerError> {
        let start_pos = self.position;
        self.advance(1); // Skip "<"

        let (tag, tag_len) = take_name(self.input);
        self.advance(tag_len);

        let mut attributes = Vec::new();

        loop {
            let trimmed = skip_whitespace(self.input);
            self.advance(self.input.len() - trimmed.len());

            if self.input.is_empty() {
                return Err(LexerError::UnterminatedTag(start_pos));
            }

            if self.input.starts_with("/>") {
                self.advance(2);
                self.tokens.push(Token::Element {
                    tag,
                    attributes,
                    self_closing: true,
                });
                return Ok(());
            }

            if self.input.starts_with('>') {
                self.advance(1);
                self.tokens.push(Token::Element {
                    tag,
                    attributes,
                    self_closing: false,
                });
                return Ok(());
            }

            match self.parse_attribute()? {
                Some(attr) => attributes.push(attr),
                None => {
                    // Skip stray character like a lone "/"
                    let stray = self.input.chars().next().map_or(1, char::len_utf8);
                    self.advance(stray);
                }
            }
        }
    }

    /// Parses one `name="value"`, `name='value'`, `name=value` or
    /// bare `name` attribute. Returns None when no name could be
    /// read at the current position.
    ///
    fn parse_attribute(&mut self) -> Result<Option<Attribute>, LexerError> {
        let (name, name_len) = take_name(self.input);
        if name.is_empty() {
            return Ok(None);
        }
        self.advance(name_len);

        let rest = skip_whitespace(self.input);
        let Some(after_eq) = rest.strip_prefix('=') else {
            return Ok(Some(Attribute {
                name,
                value: String::new(),
            }));
        };
        self.advance(self.input.len() - after_eq.len());

        let value_start = skip_whitespace(self.input);
        self.advance(self.input.len() - value_start.len());
        let value_pos = self.position;

        let value = match self.input.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let Some(end) = self.input[1..].find(quote) else {
                    return Err(LexerError::UnterminatedAttribute(value_pos));
                };
                let raw = self.input[1..1 + end].to_string();
                self.advance(end + 2);
                raw
            }
            _ => {
                let end = self
                    .input
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(self.input.len());
                let raw = self.input[..end].trim_end_matches('/').to_string();
                self.advance(raw.len());
                raw
            }
        };

        Ok(Some(Attribute {
            name,
            value: decode_entities(&value),
        }))
    }

    /// Consumes text up to the next `<` that starts markup. A `<`
    /// that cannot start a tag is kept as text.
    ///
    fn consume_text(&mut self) {
        let skip = if self.input.starts_with('<') { 1 } else { 0 };
        let end = self.input[skip..]
            .find('<')
            .map(|i| i + skip)
            .unwrap_or(self.input.len());

        let text = decode_entities(&self.input[..end]);
        self.advance(end);

        if let Some(Token::Text(prev)) = self.tokens.last_mut() {
            prev.push_str(&text);
        } else {
            self.tokens.push(Token::Text(text));
        }
    }
}

// ------------------------------------------------------------- Public Functions

/// Tokenizes markup source into a list of tokens. This is the
/// main entry point for lexing.
///
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexerError> {
    let mut lexer = Lexer::new(input);
    lexer.tokenize()
}

// ------------------------------------------------------------- Private Functions

/// Extracts a tag or attribute name. Stops at whitespace and
/// the characters that end a name inside a tag.
///
fn take_name(input: &str) -> (String, usize) {
    let end = input
        .find(|c: char| c.is_whitespace() || matches!(c, '>' | '/' | '='))
        .unwrap_or(input.len());
    (input[..end].to_string(), end)
}

/// Trims the same whitespace `take_name` stops at, so a name
/// boundary is always followed by progress.
///
fn skip_whitespace(input: &str) -> &str {
    input.trim_start()
}

/// Decodes the five predefined XML entities. Unknown entities
/// are left untouched.
///
fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    input
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

// ------------------------------------------------------------- Unit Tests
