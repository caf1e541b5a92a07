//! Syntax — the script node tree and the front end that builds it.
//!
//! The rest of the engine consumes the node tree through the closed
//! [`NodeKind`] union and never looks at raw text except through spans, so
//! the reader here is replaceable by any front end that produces the same
//! shape.

mod lexer;
mod loader;
mod node;
mod reader;

pub mod keywords;

pub use lexer::{Lexer, Token, TokenKind, tokenize};
pub use loader::{ParsedFile, collect_script_paths, load_and_read, load_directory};
pub use node::{Node, NodeKind, Separator};
pub use reader::{ReadError, ReadResult, read_source};
