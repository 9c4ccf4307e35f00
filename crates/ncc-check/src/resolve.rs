//! Identifier resolution and static type inference
//!
//! Identifiers resolve in order: state variable first, then global enum
//! literal. Every literal must be unique across all declared enums and
//! must not shadow a variable name; both collisions are compile errors.
//!
//! Type inference runs over every compiled expression. `bool`, `int`,
//! and each enum variable are disjoint types: enums admit only `==` and
//! `!=` against the same enum, never ordering or arithmetic.

use crate::error::CompileError;
use crate::schema::{Schema, VarKind};
use ncc_core::{BinOp, Expr, Span, Spanned};
use rustc_hash::FxHashMap;

/// A resolved enum literal: the variable owning it and its encoding
#[derive(Debug, Clone, Copy)]
pub struct EnumLiteral {
    /// Index of the owning enum variable
    pub var: usize,
    /// Position in the owner's value list
    pub encoded: i64,
}

/// Global lookup table from enum literal to its resolution
#[derive(Debug, Clone, Default)]
pub struct EnumLiterals {
    map: FxHashMap<String, EnumLiteral>,
}

impl EnumLiterals {
    /// Build the table, rejecting literals that shadow a variable name
    /// or appear in more than one enum.
    pub fn build(schema: &Schema) -> Result<EnumLiterals, CompileError> {
        let mut map = FxHashMap::default();
        for (var_idx, var) in schema.vars().iter().enumerate() {
            let VarKind::Enum { values } = &var.kind else {
                continue;
            };
            for (i, literal) in values.iter().enumerate() {
                if schema.var_index(literal).is_some() {
                    return Err(CompileError::LiteralShadowsVariable {
                        literal: literal.clone(),
                    });
                }
                let resolved = EnumLiteral {
                    var: var_idx,
                    encoded: i as i64,
                };
                if map.insert(literal.clone(), resolved).is_some() {
                    return Err(CompileError::DuplicateLiteral {
                        literal: literal.clone(),
                    });
                }
            }
        }
        Ok(EnumLiterals { map })
    }

    pub fn get(&self, name: &str) -> Option<EnumLiteral> {
        self.map.get(name).copied()
    }
}

/// The static type of an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprType {
    Bool,
    Int,
    /// The enum type of the variable at this index
    Enum(usize),
}

impl ExprType {
    /// Render for error messages, naming the enum variable
    pub fn render(self, schema: &Schema) -> String {
        match self {
            ExprType::Bool => "bool".to_string(),
            ExprType::Int => "int".to_string(),
            ExprType::Enum(idx) => format!("enum {}", schema.vars()[idx].name),
        }
    }
}

/// A located type error, wrapped with its declaration by the compiler
#[derive(Debug, Clone)]
pub struct TypeError {
    pub message: String,
    pub span: Span,
}

impl TypeError {
    fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// Infer the type of an expression against the schema.
pub fn infer_type(
    expr: &Spanned<Expr>,
    schema: &Schema,
    literals: &EnumLiterals,
) -> Result<ExprType, TypeError> {
    match &expr.node {
        Expr::Int(_) => Ok(ExprType::Int),
        Expr::Bool(_) => Ok(ExprType::Bool),

        Expr::Ident(name) => {
            if let Some(idx) = schema.var_index(name) {
                return Ok(match &schema.vars()[idx].kind {
                    VarKind::Bool => ExprType::Bool,
                    VarKind::Enum { .. } => ExprType::Enum(idx),
                    VarKind::Int { .. } => ExprType::Int,
                });
            }
            if let Some(literal) = literals.get(name) {
                return Ok(ExprType::Enum(literal.var));
            }
            Err(TypeError::new(
                format!("unknown identifier `{name}`"),
                expr.span,
            ))
        }

        Expr::Not(operand) => {
            expect_type(operand, ExprType::Bool, "`not`", schema, literals)?;
            Ok(ExprType::Bool)
        }

        Expr::Binary { op, lhs, rhs } => {
            let lt = infer_type(lhs, schema, literals)?;
            let rt = infer_type(rhs, schema, literals)?;
            match op {
                BinOp::And | BinOp::Or => {
                    if lt != ExprType::Bool || rt != ExprType::Bool {
                        return Err(TypeError::new(
                            format!(
                                "`{op}` requires bool operands, found {} and {}",
                                lt.render(schema),
                                rt.render(schema)
                            ),
                            expr.span,
                        ));
                    }
                    Ok(ExprType::Bool)
                }
                BinOp::Eq | BinOp::Ne => {
                    if lt != rt {
                        return Err(TypeError::new(
                            format!(
                                "cannot compare {} with {}",
                                lt.render(schema),
                                rt.render(schema)
                            ),
                            expr.span,
                        ));
                    }
                    Ok(ExprType::Bool)
                }
                BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                    for ty in [lt, rt] {
                        if let ExprType::Enum(_) = ty {
                            return Err(TypeError::new(
                                format!(
                                    "ordering is not defined for {}",
                                    ty.render(schema)
                                ),
                                expr.span,
                            ));
                        }
                    }
                    if lt != ExprType::Int || rt != ExprType::Int {
                        return Err(TypeError::new(
                            format!(
                                "`{op}` requires int operands, found {} and {}",
                                lt.render(schema),
                                rt.render(schema)
                            ),
                            expr.span,
                        ));
                    }
                    Ok(ExprType::Bool)
                }
                BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => {
                    if lt != ExprType::Int || rt != ExprType::Int {
                        return Err(TypeError::new(
                            format!(
                                "`{op}` requires int operands, found {} and {}",
                                lt.render(schema),
                                rt.render(schema)
                            ),
                            expr.span,
                        ));
                    }
                    Ok(ExprType::Int)
                }
            }
        }

        Expr::If { cond, then, els } => {
            expect_type(cond, ExprType::Bool, "`if` condition", schema, literals)?;
            let tt = infer_type(then, schema, literals)?;
            let et = infer_type(els, schema, literals)?;
            if tt != et {
                return Err(TypeError::new(
                    format!(
                        "`if` branches have mismatched types: {} and {}",
                        tt.render(schema),
                        et.render(schema)
                    ),
                    expr.span,
                ));
            }
            Ok(tt)
        }

        Expr::Call { builtin, args } => {
            for arg in args {
                let ty = infer_type(arg, schema, literals)?;
                if ty != ExprType::Int {
                    return Err(TypeError::new(
                        format!(
                            "{} requires int arguments, found {}",
                            builtin.name(),
                            ty.render(schema)
                        ),
                        arg.span,
                    ));
                }
            }
            Ok(ExprType::Int)
        }
    }
}

fn expect_type(
    expr: &Spanned<Expr>,
    expected: ExprType,
    context: &str,
    schema: &Schema,
    literals: &EnumLiterals,
) -> Result<(), TypeError> {
    let ty = infer_type(expr, schema, literals)?;
    if ty != expected {
        return Err(TypeError::new(
            format!(
                "{context} requires {}, found {}",
                expected.render(schema),
                ty.render(schema)
            ),
            expr.span,
        ));
    }
    Ok(())
}

/// Check an assignment's right-hand side against its target variable.
///
/// Bool targets take bool expressions, int targets take int
/// expressions. Enum targets take either their own enum type or a bare
/// int, whose value is range-checked against `[0, |values|)` when the
/// assignment is applied.
pub fn check_assignment(
    target: usize,
    rhs: &Spanned<Expr>,
    schema: &Schema,
    literals: &EnumLiterals,
) -> Result<(), TypeError> {
    let ty = infer_type(rhs, schema, literals)?;
    let var = &schema.vars()[target];
    let ok = match &var.kind {
        VarKind::Bool => ty == ExprType::Bool,
        VarKind::Int { .. } => ty == ExprType::Int,
        VarKind::Enum { .. } => matches!(ty, ExprType::Int) || ty == ExprType::Enum(target),
    };
    if !ok {
        let expected = match &var.kind {
            VarKind::Bool => "bool".to_string(),
            VarKind::Int { .. } => "int".to_string(),
            VarKind::Enum { .. } => format!("enum {}", var.name),
        };
        return Err(TypeError::new(
            format!(
                "assignment to `{}` expects {expected}, found {}",
                var.name,
                ty.render(schema)
            ),
            rhs.span,
        ));
    }
    Ok(())
}
