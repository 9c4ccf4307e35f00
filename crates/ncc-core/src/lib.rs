//! ncc-core - the guard/effect expression language
//!
//! This crate provides:
//! - **Lexer**: logos-based tokenizer for expression strings
//! - **Parser**: Pratt parser producing a span-annotated AST
//! - **Diagnostics**: ariadne-based rendering of located errors
//!
//! Expressions are short, single-line strings embedded in a registry
//! spec (invariants, event guards, assignment right-hand sides). Every
//! AST node carries a byte span into its source string so errors can be
//! rendered against the exact declaration that produced them.
//!
//! # Quick Start
//!
//! ```rust
//! use ncc_core::parse_expr;
//!
//! let expr = parse_expr("if n < 3 then n + 1 else 0").unwrap();
//! assert_eq!(expr.span.start, 0);
//! ```

pub mod ast;
pub mod diagnostic;
pub mod span;
pub mod syntax;

pub use ast::{BinOp, Builtin, Expr};
pub use diagnostic::Diagnostic;
pub use span::{Span, Spanned};
pub use syntax::parse_expr;

use thiserror::Error;

/// An error produced while lexing or parsing an expression string.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Malformed expression source
    #[error("syntax error: {message}")]
    Syntax { message: String, span: Span },
}

impl Error {
    /// The source span this error points at.
    pub fn span(&self) -> Span {
        match self {
            Error::Syntax { span, .. } => *span,
        }
    }
}
