//! Table builder: `Valid`, `NF`, and `Step` over the full state space
//!
//! Build order matters: `Valid` first, then `NF` (whose loop consults
//! `Valid`), then `Step` (whose cells are a single `NF` lookup after
//! applying the event's effect). Nothing mutates after the build.
//!
//! Normalization applies the single lowest-index violated invariant's
//! repair, then rescans from the top. The iteration cap is a
//! termination guard: exceeding it is a well-founded-compensation
//! failure reported with the originating state, not an internal error.

use crate::compile::{Assignments, CheckOptions, CompiledRegistry};
use crate::error::{BuildError, EvalError, EvalResult};
use crate::eval::{eval, eval_bool, Env};
use crate::report::render_state;
use crate::schema::{State, StateId, VarKind};
use crate::value::Value;
use tracing::debug;

/// Outcome of the `NF` build phase
#[derive(Debug)]
pub enum NfBuild {
    Complete(Vec<StateId>),
    /// Normalization exceeded the iteration cap starting from `state`
    Diverged { state: StateId },
}

/// Result of normalizing a single state
pub struct Normalized {
    /// The normal form, or `None` if the iteration cap was exhausted
    pub nf: Option<StateId>,
    /// Repair steps applied before reaching the normal form (or the cap)
    pub depth: u32,
}

/// Why normalization of one state stopped abnormally
pub(crate) enum NormalizeError {
    Eval(EvalError),
    MissingRepair { invariant: String },
}

impl NormalizeError {
    pub(crate) fn into_build_error(self, state: String) -> BuildError {
        match self {
            NormalizeError::Eval(error) => BuildError::NormalForm { state, error },
            NormalizeError::MissingRepair { invariant } => {
                BuildError::MissingRepair { invariant, state }
            }
        }
    }
}

/// Compute `Valid[s]` for every state: the conjunction of all
/// invariants.
pub fn build_valid(cr: &CompiledRegistry) -> Result<Vec<bool>, BuildError> {
    let total = cr.schema.total() as usize;
    let mut valid = Vec::with_capacity(total);
    for sid in cr.schema.state_ids() {
        let state = cr.schema.decode(sid);
        let v = eval_valid(cr, &state).map_err(|error| BuildError::Validity {
            state: render_state(&cr.schema, &state),
            error,
        })?;
        valid.push(v);
    }
    debug!(
        valid = valid.iter().filter(|&&v| v).count(),
        total, "validity table built"
    );
    Ok(valid)
}

/// Compute `NF[s]` for every state, stopping early if any state's
/// normalization exceeds the iteration cap.
pub fn build_nf(
    cr: &CompiledRegistry,
    valid: &[bool],
    options: &CheckOptions,
) -> Result<NfBuild, BuildError> {
    let mut nf = Vec::with_capacity(valid.len());
    for sid in cr.schema.state_ids() {
        let normalized = normalize(cr, valid, sid, options.max_repair_iter)
            .map_err(|e| e.into_build_error(render_state(&cr.schema, &cr.schema.decode(sid))))?;
        match normalized.nf {
            Some(target) => nf.push(target),
            None => {
                debug!(state = sid.0, "normalization exceeded iteration cap");
                return Ok(NfBuild::Diverged { state: sid });
            }
        }
    }
    debug!("normal-form table built");
    Ok(NfBuild::Complete(nf))
}

/// Compute `Step[e][s]` for every event and state. `None` encodes a
/// false guard; otherwise the cell is `NF[encode(apply(e, s))]`.
pub fn build_step(
    cr: &CompiledRegistry,
    nf: &[StateId],
) -> Result<Vec<Vec<Option<StateId>>>, BuildError> {
    let total = cr.schema.total() as usize;
    let mut step = Vec::with_capacity(cr.registry.events.len());
    for (ei, event) in cr.registry.events.iter().enumerate() {
        let mut row = Vec::with_capacity(total);
        for sid in cr.schema.state_ids() {
            let state = cr.schema.decode(sid);
            let enabled = match &cr.event_guards[ei] {
                Some(guard) => {
                    let env = Env::new(&cr.schema, &state, &cr.literals);
                    eval_bool(guard, &env).map_err(|error| BuildError::Guard {
                        event: event.name.clone(),
                        state: render_state(&cr.schema, &state),
                        error,
                    })?
                }
                None => true,
            };
            if !enabled {
                row.push(None);
                continue;
            }
            let post =
                apply_assignments(cr, &cr.event_exprs[ei], &state).map_err(|error| {
                    BuildError::Effect {
                        event: event.name.clone(),
                        state: render_state(&cr.schema, &state),
                        error,
                    }
                })?;
            let post_id = cr.schema.encode(&post);
            row.push(Some(nf[post_id.as_usize()]));
        }
        step.push(row);
    }
    debug!(events = step.len(), "step table built");
    Ok(step)
}

/// Evaluate the conjunction of all invariants at one state.
pub(crate) fn eval_valid(cr: &CompiledRegistry, state: &[i64]) -> EvalResult<bool> {
    let env = Env::new(&cr.schema, state, &cr.literals);
    for expr in &cr.invariant_exprs {
        if !eval_bool(expr, &env)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Normalize one state by iterated first-match compensation.
///
/// Each iteration applies the repair of the lowest-index violated
/// invariant, then restarts the scan. If `Valid` claims the state is
/// invalid but no individual invariant evaluates false, the state is
/// returned as its own normal form.
pub(crate) fn normalize(
    cr: &CompiledRegistry,
    valid: &[bool],
    sid: StateId,
    cap: u32,
) -> Result<Normalized, NormalizeError> {
    let mut current = sid;
    for depth in 0..cap {
        if valid[current.as_usize()] {
            return Ok(Normalized {
                nf: Some(current),
                depth,
            });
        }
        let state = cr.schema.decode(current);
        let env = Env::new(&cr.schema, &state, &cr.literals);

        let mut repaired = false;
        for (i, inv_expr) in cr.invariant_exprs.iter().enumerate() {
            let holds = eval_bool(inv_expr, &env).map_err(NormalizeError::Eval)?;
            if holds {
                continue;
            }
            let Some(block) = cr.repair_exprs.get(i) else {
                return Err(NormalizeError::MissingRepair {
                    invariant: cr.registry.invariants[i].name.clone(),
                });
            };
            let post = apply_assignments(cr, block, &state).map_err(NormalizeError::Eval)?;
            current = cr.schema.encode(&post);
            repaired = true;
            break;
        }
        if !repaired {
            // Valid said false but no invariant failed on rescan
            return Ok(Normalized {
                nf: Some(current),
                depth,
            });
        }
    }
    Ok(Normalized { nf: None, depth: cap })
}

/// Apply a block of simultaneous assignments: every right-hand side is
/// evaluated against the pre-state, then the results are committed at
/// once.
pub(crate) fn apply_assignments(
    cr: &CompiledRegistry,
    block: &Assignments,
    state: &[i64],
) -> EvalResult<State> {
    let env = Env::new(&cr.schema, state, &cr.literals);
    let mut post = state.to_vec();

    for (target, expr) in block {
        let value = eval(expr, &env)?;
        let var = &cr.schema.vars()[*target];
        let encoded = match &var.kind {
            VarKind::Bool => match value {
                Value::Bool(b) => b as i64,
                Value::Int(_) => {
                    return Err(EvalError::AssignType {
                        var: var.name.clone(),
                        expected: "bool",
                        got: "int",
                    })
                }
            },
            VarKind::Enum { values } => match value {
                Value::Int(i) if i >= 0 && (i as usize) < values.len() => i,
                Value::Int(i) => {
                    return Err(EvalError::EnumOutOfRange {
                        var: var.name.clone(),
                        value: i,
                        size: values.len(),
                    })
                }
                Value::Bool(_) => {
                    return Err(EvalError::AssignType {
                        var: var.name.clone(),
                        expected: "enum value",
                        got: "bool",
                    })
                }
            },
            VarKind::Int { min, max } => match value {
                Value::Int(i) if i >= *min && i <= *max => i,
                Value::Int(i) => {
                    return Err(EvalError::IntOutOfRange {
                        var: var.name.clone(),
                        value: i,
                        lo: *min,
                        hi: *max,
                    })
                }
                Value::Bool(_) => {
                    return Err(EvalError::AssignType {
                        var: var.name.clone(),
                        expected: "int",
                        got: "bool",
                    })
                }
            },
        };
        post[*target] = encoded;
    }
    Ok(post)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::registry;

    fn compiled(json: &str) -> CompiledRegistry {
        compile(registry::parse(json).unwrap(), &CheckOptions::default()).unwrap()
    }

    const COUNTER: &str = r#"{"registry": {"name": "counter",
        "states": {"n": {"type": "int", "range": [0, 3]}},
        "invariants": {"capped": {"expr": "n <= 2"}},
        "compensation": [{"invariant": "capped", "repair": {"n": "2"}}],
        "events": {
            "inc": {"guard": "n < 3", "effect": {"n": "n + 1"}},
            "dec": {"guard": "n > 0", "effect": {"n": "n - 1"}}
        }}}"#;

    #[test]
    fn test_valid_table() {
        let cr = compiled(COUNTER);
        let valid = build_valid(&cr).unwrap();
        assert_eq!(valid, vec![true, true, true, false]);
    }

    #[test]
    fn test_nf_table_first_match() {
        let cr = compiled(COUNTER);
        let valid = build_valid(&cr).unwrap();
        let NfBuild::Complete(nf) = build_nf(&cr, &valid, &CheckOptions::default()).unwrap()
        else {
            panic!("expected complete NF table");
        };
        // n=3 violates `capped` and repairs to n=2; valid states are fixed
        assert_eq!(nf, vec![StateId(0), StateId(1), StateId(2), StateId(2)]);
    }

    #[test]
    fn test_step_guard_gating() {
        let cr = compiled(COUNTER);
        let valid = build_valid(&cr).unwrap();
        let NfBuild::Complete(nf) = build_nf(&cr, &valid, &CheckOptions::default()).unwrap()
        else {
            panic!("expected complete NF table");
        };
        let step = build_step(&cr, &nf).unwrap();
        // inc: enabled below 3; result is normalized (n=2 -> n=3 -> repair -> n=2)
        assert_eq!(
            step[0],
            vec![Some(StateId(1)), Some(StateId(2)), Some(StateId(2)), None]
        );
        // dec: enabled above 0
        assert_eq!(
            step[1],
            vec![None, Some(StateId(0)), Some(StateId(1)), Some(StateId(2))]
        );
    }

    #[test]
    fn test_simultaneous_assignment_reads_pre_state() {
        let cr = compiled(
            r#"{"registry": {"name": "swap",
                "states": {
                    "x": {"type": "int", "range": [0, 3]},
                    "y": {"type": "int", "range": [0, 3]}
                },
                "events": {"swap": {"effect": {"x": "y", "y": "x"}}}}}"#,
        );
        let state = vec![1, 2];
        let post = apply_assignments(&cr, &cr.event_exprs[0], &state).unwrap();
        assert_eq!(post, vec![2, 1]);
    }

    #[test]
    fn test_out_of_range_assignment_rejected() {
        let cr = compiled(
            r#"{"registry": {"name": "x",
                "states": {"n": {"type": "int", "range": [0, 3]}},
                "events": {
                    "over": {"effect": {"n": "n + 4"}},
                    "under": {"effect": {"n": "n - 1"}}
                }}}"#,
        );
        // hi + 1 is rejected
        let err = apply_assignments(&cr, &cr.event_exprs[0], &[0]).unwrap_err();
        assert!(matches!(
            err,
            EvalError::IntOutOfRange {
                value: 4,
                lo: 0,
                hi: 3,
                ..
            }
        ));
        // lo - 1 is rejected just the same
        let err = apply_assignments(&cr, &cr.event_exprs[1], &[0]).unwrap_err();
        assert!(matches!(err, EvalError::IntOutOfRange { value: -1, .. }));
    }

    #[test]
    fn test_enum_out_of_range_assignment_rejected() {
        let cr = compiled(
            r#"{"registry": {"name": "x",
                "states": {
                    "light": {"type": "enum", "values": ["red", "green"]},
                    "n": {"type": "int", "range": [0, 3]}
                },
                "events": {"set": {"effect": {"light": "n"}}}}}"#,
        );
        let err = apply_assignments(&cr, &cr.event_exprs[0], &[0, 2]).unwrap_err();
        assert!(matches!(
            err,
            EvalError::EnumOutOfRange { value: 2, size: 2, .. }
        ));
        // In-range int is accepted as an enum encoding
        let post = apply_assignments(&cr, &cr.event_exprs[0], &[0, 1]).unwrap();
        assert_eq!(post, vec![1, 1]);
    }

    #[test]
    fn test_missing_repair_is_spec_error() {
        let cr = compiled(
            r#"{"registry": {"name": "x",
                "states": {"a": {"type": "bool"}},
                "invariants": {"always_a": {"expr": "a"}}}}"#,
        );
        let valid = build_valid(&cr).unwrap();
        let err = build_nf(&cr, &valid, &CheckOptions::default()).unwrap_err();
        assert!(matches!(err, BuildError::MissingRepair { .. }));
        assert!(err.to_string().contains("always_a"));
    }

    #[test]
    fn test_divergent_repair_hits_cap() {
        // Repair leaves the state unchanged, so normalization never
        // reaches a valid state.
        let cr = compiled(
            r#"{"registry": {"name": "x",
                "states": {"a": {"type": "bool"}},
                "invariants": {"always_a": {"expr": "a"}},
                "compensation": [{"invariant": "always_a", "repair": {"a": "a"}}]}}"#,
        );
        let valid = build_valid(&cr).unwrap();
        let NfBuild::Diverged { state } =
            build_nf(&cr, &valid, &CheckOptions::default()).unwrap()
        else {
            panic!("expected divergence");
        };
        assert_eq!(state, StateId(0));
    }

    #[test]
    fn test_zero_invariants_nf_is_identity() {
        let cr = compiled(
            r#"{"registry": {"name": "x",
                "states": {"a": {"type": "bool"}, "b": {"type": "bool"}}}}"#,
        );
        let valid = build_valid(&cr).unwrap();
        assert!(valid.iter().all(|&v| v));
        let NfBuild::Complete(nf) = build_nf(&cr, &valid, &CheckOptions::default()).unwrap()
        else {
            panic!("expected complete NF table");
        };
        let identity: Vec<StateId> = cr.schema.state_ids().collect();
        assert_eq!(nf, identity);
    }
}
