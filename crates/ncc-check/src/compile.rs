//! Registry compiler
//!
//! Turns a parsed registry into a `CompiledRegistry`: schema with
//! enforced state-space ceiling, global enum-literal table, parsed and
//! type-checked ASTs for every invariant, repair, guard, and effect,
//! and per-event read/write sets for the independence analysis.
//!
//! Repairs are positionally bound to invariants: the repair at list
//! position `i` must name invariant `i`. A shorter repair list is
//! accepted; a trailing uncovered invariant only becomes an error if it
//! is violated during normalization.
//!
//! The read-set extraction is deliberately textual and conservative:
//! any identifier-bounded occurrence of a variable name in the guard or
//! an effect right-hand side counts as a read. Over-approximating reads
//! shrinks the set of pairs CC1 checks, which is the safe direction.

use crate::error::CompileError;
use crate::registry::Registry;
use crate::resolve::{self, EnumLiterals, ExprType};
use crate::schema::Schema;
use indexmap::IndexMap;
use ncc_core::{parse_expr, Expr, Spanned};
use rustc_hash::FxHashSet;
use tracing::debug;

/// Tunable verification limits
#[derive(Debug, Clone, Copy)]
pub struct CheckOptions {
    /// Ceiling on the enumerable state count
    pub max_states: u64,
    /// Cap on repair iterations per state before normalization is
    /// declared divergent
    pub max_repair_iter: u32,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            max_states: crate::schema::DEFAULT_MAX_STATES,
            max_repair_iter: 1000,
        }
    }
}

/// A block of simultaneous assignments: target variable index paired
/// with its compiled right-hand side, in declared order
pub type Assignments = Vec<(usize, Spanned<Expr>)>;

/// A registry with every expression compiled and resolved
#[derive(Debug)]
pub struct CompiledRegistry {
    pub registry: Registry,
    pub schema: Schema,
    pub literals: EnumLiterals,

    /// Parsed invariant predicates, in declared order
    pub invariant_exprs: Vec<Spanned<Expr>>,
    /// Parsed repair blocks, positionally bound to invariants
    pub repair_exprs: Vec<Assignments>,
    /// Parsed event guards; `None` means always enabled
    pub event_guards: Vec<Option<Spanned<Expr>>>,
    /// Parsed event effect blocks
    pub event_exprs: Vec<Assignments>,
    /// Per-event variable indices written (assignment targets)
    pub event_writes: Vec<FxHashSet<usize>>,
    /// Per-event variable indices read (textual scan of guard + RHSs)
    pub event_reads: Vec<FxHashSet<usize>>,
}

/// Compile a registry against the given limits.
pub fn compile(registry: Registry, options: &CheckOptions) -> Result<CompiledRegistry, CompileError> {
    let schema = Schema::new(registry.vars.clone(), options.max_states)?;
    let literals = EnumLiterals::build(&schema)?;
    debug!(
        variables = schema.vars().len(),
        states = schema.total(),
        "schema built"
    );

    let mut invariant_exprs = Vec::with_capacity(registry.invariants.len());
    for inv in &registry.invariants {
        let decl = format!("invariant \"{}\"", inv.name);
        let expr = parse_checked(&decl, &inv.expr, &schema, &literals, Some(ExprType::Bool))?;
        invariant_exprs.push(expr);
    }

    let mut repair_exprs = Vec::with_capacity(registry.compensation.len());
    for (position, repair) in registry.compensation.iter().enumerate() {
        match registry.invariants.get(position) {
            Some(inv) if inv.name == repair.invariant => {}
            Some(inv) => {
                return Err(CompileError::RepairOutOfOrder {
                    position,
                    expected: inv.name.clone(),
                    found: repair.invariant.clone(),
                })
            }
            None => {
                return Err(CompileError::RepairForUnknownInvariant {
                    position,
                    found: repair.invariant.clone(),
                })
            }
        }
        let decl_prefix = format!("repair for \"{}\"", repair.invariant);
        let block = compile_assignments(&decl_prefix, &repair.assignments, &schema, &literals)?;
        repair_exprs.push(block);
    }

    let mut event_guards = Vec::with_capacity(registry.events.len());
    let mut event_exprs = Vec::with_capacity(registry.events.len());
    let mut event_writes = Vec::with_capacity(registry.events.len());
    let mut event_reads = Vec::with_capacity(registry.events.len());

    for event in &registry.events {
        let guard = match &event.guard {
            Some(src) => {
                let decl = format!("event \"{}\" guard", event.name);
                Some(parse_checked(&decl, src, &schema, &literals, Some(ExprType::Bool))?)
            }
            None => None,
        };
        event_guards.push(guard);

        let decl_prefix = format!("event \"{}\"", event.name);
        let block = compile_assignments(&decl_prefix, &event.assignments, &schema, &literals)?;

        let writes: FxHashSet<usize> = block.iter().map(|(idx, _)| *idx).collect();

        let mut reads = FxHashSet::default();
        for (idx, var) in schema.vars().iter().enumerate() {
            let in_guard = event
                .guard
                .as_deref()
                .is_some_and(|g| contains_ident(g, &var.name));
            let in_effect = event
                .assignments
                .values()
                .any(|src| contains_ident(src, &var.name));
            if in_guard || in_effect {
                reads.insert(idx);
            }
        }

        event_exprs.push(block);
        event_writes.push(writes);
        event_reads.push(reads);
    }

    debug!(
        invariants = invariant_exprs.len(),
        repairs = repair_exprs.len(),
        events = event_exprs.len(),
        "registry compiled"
    );

    Ok(CompiledRegistry {
        registry,
        schema,
        literals,
        invariant_exprs,
        repair_exprs,
        event_guards,
        event_exprs,
        event_writes,
        event_reads,
    })
}

/// Parse one declaration expression, run type inference, and optionally
/// require a root type.
fn parse_checked(
    decl: &str,
    src: &str,
    schema: &Schema,
    literals: &EnumLiterals,
    required: Option<ExprType>,
) -> Result<Spanned<Expr>, CompileError> {
    let expr = parse_expr(src).map_err(|error| CompileError::Parse {
        decl: decl.to_string(),
        expr: src.to_string(),
        error,
    })?;
    let ty = resolve::infer_type(&expr, schema, literals).map_err(|e| CompileError::Type {
        decl: decl.to_string(),
        expr: src.to_string(),
        message: e.message,
        span: e.span,
    })?;
    if let Some(required) = required {
        if ty != required {
            return Err(CompileError::Type {
                decl: decl.to_string(),
                expr: src.to_string(),
                message: format!(
                    "expected {}, found {}",
                    required.render(schema),
                    ty.render(schema)
                ),
                span: expr.span,
            });
        }
    }
    Ok(expr)
}

fn compile_assignments(
    decl_prefix: &str,
    assignments: &IndexMap<String, String>,
    schema: &Schema,
    literals: &EnumLiterals,
) -> Result<Assignments, CompileError> {
    let mut block = Vec::with_capacity(assignments.len());
    for (var, src) in assignments {
        let decl = format!("{decl_prefix}, variable \"{var}\"");
        let Some(target) = schema.var_index(var) else {
            return Err(CompileError::UnknownVariable {
                decl: decl_prefix.to_string(),
                var: var.clone(),
            });
        };
        let expr = parse_checked(&decl, src, schema, literals, None)?;
        resolve::check_assignment(target, &expr, schema, literals).map_err(|e| {
            CompileError::Type {
                decl,
                expr: src.clone(),
                message: e.message,
                span: e.span,
            }
        })?;
        block.push((target, expr));
    }
    Ok(block)
}

/// Identifier-bounded substring search: does `source` contain `ident`
/// as a whole identifier token?
fn contains_ident(source: &str, ident: &str) -> bool {
    let bytes = source.as_bytes();
    let mut from = 0;
    while let Some(pos) = source[from..].find(ident) {
        let start = from + pos;
        let end = start + ident.len();
        let before_ok = start == 0 || !is_ident_char(bytes[start - 1]);
        let after_ok = end >= bytes.len() || !is_ident_char(bytes[end]);
        if before_ok && after_ok {
            return true;
        }
        from = start + 1;
    }
    false
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
