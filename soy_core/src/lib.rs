//! `soy_core` is the analysis core for Soy (Closure Templates) files. It
//! provides the scanner, a word-fragmenting lexer on top of it, the doc
//! comment accumulator, and a declarative path engine for querying element
//! trees.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Soy source
//!   → SoyScanner (modal scanner, one Symbol per advance)
//!   → WordScanningLexer (splits dotted names and $refs into words)
//!   → tree builder (host supplied, or SyntaxTree in tests)
//!   → ElementPath programs (inspections over the tree)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: configuration loading from `soy.toml`.
//! - [`inspections`]: the path programs behind the Soy inspections and a
//!   runner for them.
//!
//! ## Key Types
//!
//! - [`TokenKind`] and [`Symbol`]: the terminals and the tokens carrying
//!   them.
//! - [`SoyScanner`]: the pull-based scanner with resumable
//!   [`ScannerPosition`]s.
//! - [`DocCommentBuffer`]: the structured form of a template's `/** */`
//!   comment.
//! - [`ElementPath`]: a reusable query built from [`Predicate`]s,
//!   [`Scope`]s and stack steps.
//!
//! ## Quick Start
//!
//! ```rust
//! use soy_core::TokenKind;
//! use soy_core::tokenize;
//!
//! let tokens = tokenize("{namespace example}");
//! let kinds: Vec<TokenKind> = tokens.iter().map(|token| token.kind).collect();
//!
//! assert_eq!(kinds.first(), Some(&TokenKind::TagLbrace));
//! assert!(kinds.contains(&TokenKind::NamespaceIdentifier));
//! ```

pub use collection::*;
pub use config::*;
pub use doc_comment::*;
pub use error::*;
pub use inspections::*;
pub use path::*;
pub use position::*;
pub use predicate::*;
pub use scanner::*;
pub use tokens::*;
pub use tree::*;
pub use word_lexer::*;

mod collection;
pub mod config;
mod doc_comment;
#[allow(unused_assignments)]
mod error;
pub mod inspections;
mod path;
mod position;
mod predicate;
mod scanner;
mod tokens;
mod tree;
mod word_lexer;

#[cfg(test)]
mod __fixtures;
