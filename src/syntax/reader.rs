//! Recursive-descent reader: tokens → node tree with exact spans.
//!
//! Reading is fail-soft: malformed statements are recorded as errors and
//! skipped so one bad line does not discard the rest of the file.

use smol_str::SmolStr;

use super::keywords;
use super::lexer::{Token, TokenKind, tokenize};
use super::node::{Node, Separator};
use crate::base::Span;

/// A structural error found while reading a file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("unexpected token '{found}' at {line}:{column}")]
    UnexpectedToken {
        found: String,
        line: usize,
        column: usize,
    },

    #[error("missing value after '{key} {separator}' at {line}:{column}")]
    MissingValue {
        key: String,
        separator: &'static str,
        line: usize,
        column: usize,
    },

    #[error("unterminated block '{key}' opened at {line}:{column}")]
    UnterminatedBlock {
        key: String,
        line: usize,
        column: usize,
    },
}

/// Result of reading one file.
#[derive(Debug, Default)]
pub struct ReadResult {
    pub roots: Vec<Node>,
    pub errors: Vec<ReadError>,
}

impl ReadResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Read a whole source text into a node tree.
pub fn read_source(source: &str) -> ReadResult {
    let tokens: Vec<Token<'_>> = tokenize(source)
        .into_iter()
        .filter(|t| !t.kind.is_trivia())
        .collect();
    let mut reader = Reader {
        tokens,
        pos: 0,
        errors: Vec::new(),
    };
    let roots = reader.read_statements(None);
    ReadResult {
        roots,
        errors: reader.errors,
    }
}

struct Reader<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    errors: Vec<ReadError>,
}

impl<'a> Reader<'a> {
    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token<'a>> {
        self.tokens.get(self.pos + ahead)
    }

    fn bump(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Read statements until EOF, or until the `}` closing the enclosing
    /// block when `enclosing` names one.
    fn read_statements(&mut self, enclosing: Option<&Token<'a>>) -> Vec<Node> {
        let mut nodes = Vec::new();
        loop {
            let Some(token) = self.peek() else {
                if let Some(open) = enclosing {
                    self.errors.push(ReadError::UnterminatedBlock {
                        key: open.text.to_string(),
                        line: open.line,
                        column: open.column,
                    });
                }
                return nodes;
            };
            match token.kind {
                TokenKind::RBrace if enclosing.is_some() => return nodes,
                TokenKind::Ident | TokenKind::Number | TokenKind::String => {
                    if let Some(node) = self.read_statement() {
                        nodes.push(node);
                    }
                }
                _ => {
                    let token = self.bump().unwrap();
                    self.errors.push(ReadError::UnexpectedToken {
                        found: token.text.to_string(),
                        line: token.line,
                        column: token.column,
                    });
                }
            }
        }
    }

    fn read_statement(&mut self) -> Option<Node> {
        let head = self.bump()?;

        // Override header: `MARKER target = ...` reads as one two-word key.
        // Guard on the first character before the set lookup; ordinary
        // lowercase keys never reach `is_marker`.
        let key: SmolStr = if head.kind == TokenKind::Ident
            && keywords::may_be_marker(head.text)
            && keywords::is_marker(head.text)
            && self.peek().is_some_and(|t| t.kind == TokenKind::Ident)
            && self.peek_at(1).is_some_and(|t| is_separator(t.kind))
        {
            let target = self.bump()?;
            SmolStr::from(format!("{} {}", head.text, target.text))
        } else {
            SmolStr::from(head.text)
        };

        let Some(sep_token) = self.peek() else {
            return Some(Node::key_only(key, token_span(&head, head.offset + head.text.len())));
        };
        let separator = match sep_token.kind {
            TokenKind::Equals => Separator::Equals,
            TokenKind::Less => Separator::Less,
            TokenKind::Greater => Separator::Greater,
            _ => {
                return Some(Node::key_only(
                    key,
                    token_span(&head, head.offset + head.text.len()),
                ));
            }
        };
        self.bump();

        match self.peek() {
            Some(t) if t.kind == TokenKind::LBrace => {
                let open = self.bump().unwrap();
                let children = self.read_statements(Some(&open));
                let end = match self.peek() {
                    Some(t) if t.kind == TokenKind::RBrace => {
                        let close = self.bump().unwrap();
                        close.offset + close.text.len()
                    }
                    // Unterminated: ReadError already recorded, close at the
                    // last consumed token so the span stays in bounds.
                    _ => self
                        .tokens
                        .get(self.pos.saturating_sub(1))
                        .map(|t| t.offset + t.text.len())
                        .unwrap_or(open.offset + 1),
                };
                Some(Node::block(key, token_span(&head, end), children))
            }
            Some(t) if t.kind.is_value() => {
                let value = self.bump().unwrap();
                let value_span = token_span(&value, value.offset + value.text.len());
                Some(Node::content(
                    key,
                    token_span(&head, value.offset + value.text.len()),
                    separator,
                    value.text,
                    value_span,
                ))
            }
            other => {
                let (line, column) = other
                    .map(|t| (t.line, t.column))
                    .unwrap_or((head.line, head.column));
                self.errors.push(ReadError::MissingValue {
                    key: key.to_string(),
                    separator: separator.as_str(),
                    line,
                    column,
                });
                None
            }
        }
    }
}

fn is_separator(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Equals | TokenKind::Less | TokenKind::Greater)
}

fn token_span(start: &Token<'_>, end_offset: usize) -> Span {
    Span::new(start.offset, end_offset - start.offset, start.line, start.column)
}
