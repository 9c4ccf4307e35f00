//! Error types for the verification engine
//!
//! Errors are layered the way the pipeline is: `ParseError` from the
//! spec loader, `CompileError` from expression compilation, `EvalError`
//! from expression evaluation, and `BuildError` wrapping evaluation
//! failures with the state that triggered them during table building.
//! WFC and CC failures are not errors; they are verdicts carried in the
//! result structs.

use ncc_core::Span;
use thiserror::Error;

/// Spec-file loading error
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("spec parse: {0}")]
    Json(#[from] serde_json::Error),

    #[error("registry must have a name")]
    MissingName,

    #[error("unknown type `{ty}` for variable `{var}`")]
    UnknownType { var: String, ty: String },

    #[error("enum variable `{var}` has no values")]
    EnumWithoutValues { var: String },

    #[error("enum variable `{var}` repeats value `{value}`")]
    DuplicateEnumValue { var: String, value: String },

    #[error("int variable `{var}` needs range: [lo, hi]")]
    IntWithoutRange { var: String },

    #[error("int variable `{var}` has empty range [{lo}, {hi}]")]
    EmptyIntRange { var: String, lo: i64, hi: i64 },

    #[error("{decl}: expression must be a string, number, or bool")]
    InvalidExprValue { decl: String },
}

/// Expression compilation error
///
/// `Parse` and `Type` carry the expression source text so the CLI can
/// render an ariadne diagnostic against it without reloading anything.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("state space too large: {total} states (limit {limit})")]
    StateSpaceTooLarge { total: u64, limit: u64 },

    #[error("variable `{var}` has an empty domain")]
    EmptyDomain { var: String },

    #[error("enum literal `{literal}` conflicts with a variable name")]
    LiteralShadowsVariable { literal: String },

    #[error("enum literal `{literal}` appears in multiple enums")]
    DuplicateLiteral { literal: String },

    #[error("repair at position {position} targets `{found}`, expected invariant `{expected}`")]
    RepairOutOfOrder {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("repair at position {position} targets unknown invariant `{found}`")]
    RepairForUnknownInvariant { position: usize, found: String },

    #[error("{decl}: unknown variable `{var}`")]
    UnknownVariable { decl: String, var: String },

    #[error("{decl}: {error}")]
    Parse {
        decl: String,
        expr: String,
        #[source]
        error: ncc_core::Error,
    },

    #[error("{decl}: {message}")]
    Type {
        decl: String,
        expr: String,
        message: String,
        span: Span,
    },
}

impl CompileError {
    /// The declaration, expression source, and diagnostic for errors
    /// that point into an expression string.
    pub fn expr_diagnostic(&self) -> Option<(&str, &str, ncc_core::Diagnostic)> {
        match self {
            CompileError::Parse { decl, expr, error } => {
                Some((decl, expr, error.to_diagnostic()))
            }
            CompileError::Type {
                decl,
                expr,
                message,
                span,
            } => Some((decl, expr, ncc_core::diagnostic::type_diagnostic(message, *span))),
            _ => None,
        }
    }
}

/// Expression evaluation error
///
/// Everything here is a spec error in the sense of the verification
/// contract: the expression is well-formed but its evaluation at some
/// state violates a runtime constraint.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    #[error("type error: expected {expected}, got {got}")]
    Type {
        expected: &'static str,
        got: &'static str,
        span: Option<Span>,
    },

    #[error("division by zero")]
    DivisionByZero { span: Option<Span> },

    #[error("modulo by zero")]
    ModuloByZero { span: Option<Span> },

    #[error("integer overflow in arithmetic")]
    Overflow { span: Option<Span> },

    #[error("undefined identifier `{name}`")]
    UndefinedIdent { name: String, span: Option<Span> },

    #[error("assignment to `{var}` requires {expected}, got {got}")]
    AssignType {
        var: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("assignment to enum `{var}`: value {value} out of range [0, {size})")]
    EnumOutOfRange { var: String, value: i64, size: usize },

    #[error("assignment to `{var}` computed {value}, allowed range [{lo}, {hi}]")]
    IntOutOfRange {
        var: String,
        value: i64,
        lo: i64,
        hi: i64,
    },
}

impl EvalError {
    /// The expression span this error points at, when it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            EvalError::Type { span, .. } => *span,
            EvalError::DivisionByZero { span } => *span,
            EvalError::ModuloByZero { span } => *span,
            EvalError::Overflow { span } => *span,
            EvalError::UndefinedIdent { span, .. } => *span,
            EvalError::AssignType { .. }
            | EvalError::EnumOutOfRange { .. }
            | EvalError::IntOutOfRange { .. } => None,
        }
    }
}

pub type EvalResult<T> = Result<T, EvalError>;

/// Fatal error during table building, with the offending state attached
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("validity check at state {state}: {error}")]
    Validity {
        state: String,
        #[source]
        error: EvalError,
    },

    #[error("normal form at state {state}: {error}")]
    NormalForm {
        state: String,
        #[source]
        error: EvalError,
    },

    #[error("no repair defined for invariant `{invariant}` (violated at state {state})")]
    MissingRepair { invariant: String, state: String },

    #[error("event `{event}` guard at state {state}: {error}")]
    Guard {
        event: String,
        state: String,
        #[source]
        error: EvalError,
    },

    #[error("event `{event}` at state {state}: {error}")]
    Effect {
        event: String,
        state: String,
        #[source]
        error: EvalError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    // Error message format stability: downstream output parses these.

    #[test]
    fn test_eval_error_messages() {
        let err = EvalError::DivisionByZero { span: None };
        assert_eq!(err.to_string(), "division by zero");

        let err = EvalError::IntOutOfRange {
            var: "n".to_string(),
            value: 4,
            lo: 0,
            hi: 3,
        };
        assert_eq!(
            err.to_string(),
            "assignment to `n` computed 4, allowed range [0, 3]"
        );

        let err = EvalError::Type {
            expected: "bool",
            got: "int",
            span: None,
        };
        assert_eq!(err.to_string(), "type error: expected bool, got int");
    }

    #[test]
    fn test_compile_error_messages() {
        let err = CompileError::StateSpaceTooLarge {
            total: 2_000_000,
            limit: 1_048_576,
        };
        assert_eq!(
            err.to_string(),
            "state space too large: 2000000 states (limit 1048576)"
        );

        let err = CompileError::DuplicateLiteral {
            literal: "draft".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "enum literal `draft` appears in multiple enums"
        );
    }

    #[test]
    fn test_build_error_wraps_state() {
        let err = BuildError::Guard {
            event: "inc".to_string(),
            state: "{n=0}".to_string(),
            error: EvalError::DivisionByZero { span: None },
        };
        assert_eq!(
            err.to_string(),
            "event `inc` guard at state {n=0}: division by zero"
        );
    }

    #[test]
    fn test_compile_error_diagnostic_extraction() {
        let parse_err = ncc_core::parse_expr("a +").unwrap_err();
        let err = CompileError::Parse {
            decl: r#"invariant "safe""#.to_string(),
            expr: "a +".to_string(),
            error: parse_err,
        };
        let (decl, expr, _) = err.expr_diagnostic().unwrap();
        assert_eq!(decl, r#"invariant "safe""#);
        assert_eq!(expr, "a +");

        let err = CompileError::StateSpaceTooLarge { total: 2, limit: 1 };
        assert!(err.expr_diagnostic().is_none());
    }
}
