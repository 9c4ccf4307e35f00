//! Expression evaluator
//!
//! Evaluation is pure: given a well-typed AST and a state it produces
//! one `Value` with no side effects. Both operands of `and`/`or` are
//! always evaluated; the language has no observable short-circuit
//! semantics.
//!
//! Failing conditions (division or modulo by zero, operand mismatch,
//! overflow) are spec errors surfaced as `EvalError` and abort table
//! building with the offending state attached by the caller.

use crate::error::{EvalError, EvalResult};
use crate::resolve::EnumLiterals;
use crate::schema::{Schema, VarKind};
use crate::value::Value;
use ncc_core::{BinOp, Builtin, Expr, Spanned};

/// Evaluation environment: a schema, one concrete state, and the
/// global enum-literal table
pub struct Env<'a> {
    pub schema: &'a Schema,
    pub state: &'a [i64],
    pub literals: &'a EnumLiterals,
}

impl<'a> Env<'a> {
    pub fn new(schema: &'a Schema, state: &'a [i64], literals: &'a EnumLiterals) -> Self {
        Self {
            schema,
            state,
            literals,
        }
    }
}

/// Evaluate an expression in the given environment.
pub fn eval(expr: &Spanned<Expr>, env: &Env<'_>) -> EvalResult<Value> {
    let span = Some(expr.span);
    match &expr.node {
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Bool(b) => Ok(Value::Bool(*b)),

        Expr::Ident(name) => {
            if let Some(idx) = env.schema.var_index(name) {
                let raw = env.state[idx];
                return Ok(match env.schema.vars()[idx].kind {
                    VarKind::Bool => Value::Bool(raw == 1),
                    VarKind::Enum { .. } | VarKind::Int { .. } => Value::Int(raw),
                });
            }
            if let Some(literal) = env.literals.get(name) {
                return Ok(Value::Int(literal.encoded));
            }
            Err(EvalError::UndefinedIdent {
                name: name.clone(),
                span,
            })
        }

        Expr::Not(operand) => {
            let value = eval_bool(operand, env)?;
            Ok(Value::Bool(!value))
        }

        Expr::Binary { op, lhs, rhs } => {
            let left = eval(lhs, env)?;
            let right = eval(rhs, env)?;
            match op {
                BinOp::And | BinOp::Or => {
                    let (Some(l), Some(r)) = (left.as_bool(), right.as_bool()) else {
                        return Err(mismatch("bool", &left, &right, expr));
                    };
                    let result = if *op == BinOp::And { l && r } else { l || r };
                    Ok(Value::Bool(result))
                }
                BinOp::Eq | BinOp::Ne => {
                    let eq = match (left, right) {
                        (Value::Bool(l), Value::Bool(r)) => l == r,
                        (Value::Int(l), Value::Int(r)) => l == r,
                        _ => return Err(mismatch(left.type_name(), &left, &right, expr)),
                    };
                    Ok(Value::Bool(if *op == BinOp::Eq { eq } else { !eq }))
                }
                BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                    let (Some(l), Some(r)) = (left.as_int(), right.as_int()) else {
                        return Err(mismatch("int", &left, &right, expr));
                    };
                    let result = match op {
                        BinOp::Lt => l < r,
                        BinOp::Le => l <= r,
                        BinOp::Gt => l > r,
                        _ => l >= r,
                    };
                    Ok(Value::Bool(result))
                }
                BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => {
                    let (Some(l), Some(r)) = (left.as_int(), right.as_int()) else {
                        return Err(mismatch("int", &left, &right, expr));
                    };
                    let result = match op {
                        BinOp::Add => l.checked_add(r),
                        BinOp::Sub => l.checked_sub(r),
                        BinOp::Mul => l.checked_mul(r),
                        BinOp::Div => {
                            if r == 0 {
                                return Err(EvalError::DivisionByZero { span });
                            }
                            l.checked_div(r)
                        }
                        _ => {
                            if r == 0 {
                                return Err(EvalError::ModuloByZero { span });
                            }
                            l.checked_rem(r)
                        }
                    };
                    result
                        .map(Value::Int)
                        .ok_or(EvalError::Overflow { span })
                }
            }
        }

        Expr::If { cond, then, els } => {
            if eval_bool(cond, env)? {
                eval(then, env)
            } else {
                eval(els, env)
            }
        }

        Expr::Call { builtin, args } => {
            let mut ints = [0i64; 3];
            for (slot, arg) in ints.iter_mut().zip(args) {
                let value = eval(arg, env)?;
                *slot = value.as_int().ok_or(EvalError::Type {
                    expected: "int",
                    got: value.type_name(),
                    span: Some(arg.span),
                })?;
            }
            let result = match builtin {
                Builtin::Min => ints[0].min(ints[1]),
                Builtin::Max => ints[0].max(ints[1]),
                Builtin::Clamp => {
                    // clamp(lo, x, hi): lower bound first, then upper;
                    // hi wins if the bounds cross
                    let mut v = ints[1];
                    if v < ints[0] {
                        v = ints[0];
                    }
                    if v > ints[2] {
                        v = ints[2];
                    }
                    v
                }
            };
            Ok(Value::Int(result))
        }
    }
}

/// Evaluate an expression that must produce a bool.
pub fn eval_bool(expr: &Spanned<Expr>, env: &Env<'_>) -> EvalResult<bool> {
    let value = eval(expr, env)?;
    value.as_bool().ok_or(EvalError::Type {
        expected: "bool",
        got: value.type_name(),
        span: Some(expr.span),
    })
}

fn mismatch(expected: &'static str, left: &Value, right: &Value, expr: &Spanned<Expr>) -> EvalError {
    // Blame whichever operand is not of the expected type
    let got = if left.type_name() != expected {
        left.type_name()
    } else {
        right.type_name()
    };
    EvalError::Type {
        expected,
        got,
        span: Some(expr.span),
    }
}
