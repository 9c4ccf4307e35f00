//! Well-Founded Compensation checker
//!
//! WFC holds iff iterated repair from every state terminates on a valid
//! state and valid states are fixpoints of repair. The maximum repair
//! depth is measured by rerunning the normalization loop per state and
//! counting iterations; the first violation, scanned in state-ID order,
//! becomes the counterexample.

use crate::compile::{CheckOptions, CompiledRegistry};
use crate::error::BuildError;
use crate::report::render_state;
use crate::schema::StateId;
use crate::tables;
use tracing::debug;

/// WFC verdict
#[derive(Debug, Clone)]
pub struct WfcResult {
    pub pass: bool,
    /// Longest repair sequence observed from any state to its NF
    pub max_depth: u32,
    pub failure: Option<WfcFailure>,
}

/// A WFC counterexample
#[derive(Debug, Clone)]
pub struct WfcFailure {
    pub state: StateId,
    /// The state's normal form, absent when normalization diverged
    pub nf: Option<StateId>,
    pub kind: WfcFailureKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WfcFailureKind {
    /// `NF[s]` is not a valid state
    NotValid,
    /// `s` is valid but `NF[s] != s`
    ValidButMoves,
    /// Normalization exceeded the iteration cap
    Diverged,
}

/// The WFC verdict for a registry whose normalization diverged at
/// `state` before the tables could be completed.
pub fn diverged(state: StateId) -> WfcResult {
    WfcResult {
        pass: false,
        max_depth: 0,
        failure: Some(WfcFailure {
            state,
            nf: None,
            kind: WfcFailureKind::Diverged,
        }),
    }
}

/// Check WFC against completed tables.
pub fn check(
    cr: &CompiledRegistry,
    valid: &[bool],
    nf: &[StateId],
    options: &CheckOptions,
) -> Result<WfcResult, BuildError> {
    for sid in cr.schema.state_ids() {
        let target = nf[sid.as_usize()];
        if !valid[target.as_usize()] {
            debug!(state = sid.0, "normal form lands outside the valid set");
            return Ok(fail(sid, target, WfcFailureKind::NotValid));
        }
        if valid[sid.as_usize()] && target != sid {
            debug!(state = sid.0, "valid state is not a repair fixpoint");
            return Ok(fail(sid, target, WfcFailureKind::ValidButMoves));
        }
    }

    // Rerun the normalization loop to measure depth.
    let mut max_depth = 0;
    for sid in cr.schema.state_ids() {
        let normalized = tables::normalize(cr, valid, sid, options.max_repair_iter)
            .map_err(|e| e.into_build_error(render_state(&cr.schema, &cr.schema.decode(sid))))?;
        max_depth = max_depth.max(normalized.depth);
    }

    Ok(WfcResult {
        pass: true,
        max_depth,
        failure: None,
    })
}

fn fail(state: StateId, nf: StateId, kind: WfcFailureKind) -> WfcResult {
    WfcResult {
        pass: false,
        max_depth: 0,
        failure: Some(WfcFailure {
            state,
            nf: Some(nf),
            kind,
        }),
    }
}
