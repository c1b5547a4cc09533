//! Template document parsing.
//!
//! A document is a list of declarations `name = template ;`. Templates mix
//! literal text, bracketed alternatives `[a/b/c]` and parameter
//! references `<name>`:
//!
//! ```text
//! document    := declaration+
//! declaration := IDENT "=" element* ";"
//! element     := LITERAL_RUN | "[" element* ("/" element*)* "]" | "<" IDENT ">"
//! ```
//!
//! The characters `[ ] { } < > / ; =` are structural and cannot appear in
//! literal text. Literal runs keep their whitespace; identifiers are
//! trimmed.

use thiserror::Error;

use crate::core::generator::{Generator, MAX_DEPTH};
use crate::core::symbol::Interner;
use crate::core::value::ValueType;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("syntax error at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    /// Text of the offending token; empty at end of input.
    pub token: String,
}

/// A named generator tree parsed from a document.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: String,
    pub generator: Generator,
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    Less,
    Greater,
    Slash,
    Semicolon,
    Assign,
    Text(String),
}

impl TokenKind {
    fn lexeme(&self) -> String {
        match self {
            Self::OpenBracket => "[".to_string(),
            Self::CloseBracket => "]".to_string(),
            Self::OpenBrace => "{".to_string(),
            Self::CloseBrace => "}".to_string(),
            Self::Less => "<".to_string(),
            Self::Greater => ">".to_string(),
            Self::Slash => "/".to_string(),
            Self::Semicolon => ";".to_string(),
            Self::Assign => "=".to_string(),
            Self::Text(text) => text.trim().to_string(),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::OpenBracket => "'['".to_string(),
            Self::CloseBracket => "']'".to_string(),
            Self::OpenBrace => "'{'".to_string(),
            Self::CloseBrace => "'}'".to_string(),
            Self::Less => "'<'".to_string(),
            Self::Greater => "'>'".to_string(),
            Self::Slash => "'/'".to_string(),
            Self::Semicolon => "';'".to_string(),
            Self::Assign => "'='".to_string(),
            Self::Text(text) => format!("text '{}'", text.trim()),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    line: usize,
    column: usize,
}

fn tokenize(input: &str) -> (Vec<Token>, (usize, usize)) {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut text_start = (1, 1);
    let (mut line, mut column) = (1, 1);

    for c in input.chars() {
        let structural = match c {
            '[' => Some(TokenKind::OpenBracket),
            ']' => Some(TokenKind::CloseBracket),
            '{' => Some(TokenKind::OpenBrace),
            '}' => Some(TokenKind::CloseBrace),
            '<' => Some(TokenKind::Less),
            '>' => Some(TokenKind::Greater),
            '/' => Some(TokenKind::Slash),
            ';' => Some(TokenKind::Semicolon),
            '=' => Some(TokenKind::Assign),
            _ => None,
        };

        match structural {
            Some(kind) => {
                if !text.is_empty() {
                    tokens.push(Token {
                        kind: TokenKind::Text(std::mem::take(&mut text)),
                        line: text_start.0,
                        column: text_start.1,
                    });
                }
                tokens.push(Token { kind, line, column });
            }
            None => {
                if text.is_empty() {
                    text_start = (line, column);
                }
                text.push(c);
            }
        }

        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }

    if !text.is_empty() {
        tokens.push(Token {
            kind: TokenKind::Text(text),
            line: text_start.0,
            column: text_start.1,
        });
    }

    (tokens, (line, column))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end: (usize, usize),
    /// Brackets currently open.
    depth: usize,
    interner: Interner,
}

impl Parser {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn error_here(&self, message: String) -> ParseError {
        let (line, column) = match self.tokens.get(self.pos) {
            Some(token) => (token.line, token.column),
            None => self.end,
        };
        ParseError {
            message,
            line,
            column,
            token: self.peek().map(TokenKind::lexeme).unwrap_or_default(),
        }
    }

    fn found(&self) -> String {
        match self.peek() {
            Some(kind) => kind.describe(),
            None => "end of input".to_string(),
        }
    }

    fn expect(&mut self, expected: TokenKind) -> Result<(), ParseError> {
        if self.peek() == Some(&expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error_here(format!(
                "expected {} but found {}",
                expected.describe(),
                self.found()
            )))
        }
    }

    /// Reads a text token as a trimmed, non-empty identifier.
    fn identifier(&mut self, role: &str) -> Result<String, ParseError> {
        match self.peek() {
            Some(TokenKind::Text(text)) => {
                let name = text.trim().to_string();
                if name.is_empty() {
                    return Err(self.error_here(format!("empty {} identifier", role)));
                }
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error_here(format!(
                "expected {} identifier but found {}",
                role,
                self.found()
            ))),
        }
    }

    /// True when only whitespace text remains.
    fn at_trailing_whitespace(&self) -> bool {
        self.tokens[self.pos..]
            .iter()
            .all(|t| matches!(&t.kind, TokenKind::Text(text) if text.trim().is_empty()))
    }

    fn document(&mut self) -> Result<Vec<Declaration>, ParseError> {
        let mut declarations = Vec::new();
        while !self.at_trailing_whitespace() {
            declarations.push(self.declaration()?);
        }
        if declarations.is_empty() {
            return Err(self.error_here("expected at least one declaration".to_string()));
        }
        Ok(declarations)
    }

    fn declaration(&mut self) -> Result<Declaration, ParseError> {
        let name = self.identifier("declaration")?;
        self.expect(TokenKind::Assign)?;
        let generator = self.sequence()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Declaration { name, generator })
    }

    /// Parses elements until a token that cannot start one.
    fn sequence(&mut self) -> Result<Generator, ParseError> {
        let mut parts = Vec::new();
        loop {
            match self.peek() {
                Some(TokenKind::Text(text)) => {
                    parts.push(Generator::text(text));
                    self.pos += 1;
                }
                Some(TokenKind::OpenBracket) => parts.push(self.alternatives()?),
                Some(TokenKind::Less) => parts.push(self.reference()?),
                _ => break,
            }
        }

        Ok(match parts.len() {
            0 => Generator::text(""),
            // Every element already yields a string.
            1 => parts.remove(0),
            _ => Generator::concatenate(parts),
        })
    }

    fn alternatives(&mut self) -> Result<Generator, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error_here(format!(
                "brackets nested deeper than {} levels",
                MAX_DEPTH
            )));
        }
        self.expect(TokenKind::OpenBracket)?;
        self.depth += 1;
        let result = self.alternative_list();
        self.depth -= 1;
        result
    }

    fn alternative_list(&mut self) -> Result<Generator, ParseError> {
        let mut options = vec![self.sequence()?];
        while self.peek() == Some(&TokenKind::Slash) {
            self.pos += 1;
            options.push(self.sequence()?);
        }
        self.expect(TokenKind::CloseBracket)?;
        Ok(Generator::select(ValueType::String, options))
    }

    fn reference(&mut self) -> Result<Generator, ParseError> {
        self.expect(TokenKind::Less)?;
        let name = self.identifier("parameter")?;
        self.expect(TokenKind::Greater)?;
        let id = self.interner.intern(&name);
        // An unresolved reference prints its own name.
        Ok(Generator::parameter(id, name, ValueType::String))
    }
}

/// Parses a template document into its declarations, in document order.
pub fn parse_document(input: &str) -> Result<Vec<Declaration>, ParseError> {
    let (tokens, end) = tokenize(input);
    let mut parser = Parser {
        tokens,
        pos: 0,
        end,
        depth: 0,
        interner: Interner::new(),
    };
    parser.document()
}
