//! The closed node union the whole engine consumes.
//!
//! The source language has exactly three statement shapes: a keyed nested
//! group (`key = { ... }`), a keyed single value (`key = value`, also `<`
//! and `>` separators), and a bare identifier. Every node records its exact
//! span so the original text can be sliced back out.

use smol_str::SmolStr;

use crate::base::Span;

/// Separator between a key and its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Equals,
    Less,
    Greater,
}

impl Separator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Separator::Equals => "=",
            Separator::Less => "<",
            Separator::Greater => ">",
        }
    }
}

/// One statement in a script file.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Header text: the key, including any override marker prefix
    /// (`TRY_INJECT sword`).
    pub key: SmolStr,
    /// Exact span of the whole statement in the origin file.
    pub span: Span,
    pub kind: NodeKind,
}

/// The three statement shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// `key = { ... }`
    Block { children: Vec<Node> },
    /// `key = value` / `key < value` / `key > value`
    Content {
        separator: Separator,
        value: SmolStr,
        value_span: Span,
    },
    /// Bare identifier, e.g. a list element inside a block.
    KeyOnly,
}

impl Node {
    pub fn block(key: impl Into<SmolStr>, span: Span, children: Vec<Node>) -> Self {
        Self {
            key: key.into(),
            span,
            kind: NodeKind::Block { children },
        }
    }

    pub fn content(
        key: impl Into<SmolStr>,
        span: Span,
        separator: Separator,
        value: impl Into<SmolStr>,
        value_span: Span,
    ) -> Self {
        Self {
            key: key.into(),
            span,
            kind: NodeKind::Content {
                separator,
                value: value.into(),
                value_span,
            },
        }
    }

    pub fn key_only(key: impl Into<SmolStr>, span: Span) -> Self {
        Self {
            key: key.into(),
            span,
            kind: NodeKind::KeyOnly,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self.kind, NodeKind::Block { .. })
    }

    /// Children of a block node; empty for the other shapes.
    pub fn children(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Block { children } => children,
            _ => &[],
        }
    }

    /// Raw value text of a content node.
    pub fn value(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Content { value, .. } => Some(value.as_str()),
            _ => None,
        }
    }

    /// Value with surrounding quotes stripped, for string-typed fields.
    pub fn unquoted_value(&self) -> Option<&str> {
        self.value().map(|v| v.trim_matches('"'))
    }
}
