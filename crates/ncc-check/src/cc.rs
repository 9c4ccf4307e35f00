//! Compensation Commutativity checker (CC1 and CC2)
//!
//! CC1: independent event pairs commute modulo normalization. Two
//! events are independent iff neither writes a variable the other reads
//! or writes; dependent pairs are skipped and tallied separately
//! because the theory does not require them to commute. A state is
//! skipped when any of the four step lookups is gated out by a guard.
//!
//! CC2: stepping an event from a state and from that state's normal
//! form agree, whenever both are enabled.
//!
//! Both checks abort at the first counterexample. Events iterate in
//! declared order and states in ID order, so the first counterexample
//! is stable across runs.

use crate::compile::CompiledRegistry;
use crate::schema::StateId;
use rustc_hash::FxHashSet;
use tracing::debug;

/// CC verdict with bookkeeping for the report
#[derive(Debug, Clone)]
pub struct CcResult {
    pub cc1_pass: bool,
    pub cc2_pass: bool,
    /// Independent pairs examined by CC1
    pub pairs_checked: usize,
    /// Pairs skipped because they share read/write footprints
    pub dependent_skipped: usize,
    pub cc1_failure: Option<Cc1Failure>,
    pub cc2_failure: Option<Cc2Failure>,
}

impl CcResult {
    pub fn pass(&self) -> bool {
        self.cc1_pass && self.cc2_pass
    }
}

/// A CC1 counterexample: the two orders land on different normal forms
#[derive(Debug, Clone)]
pub struct Cc1Failure {
    /// Indices of the two events, in declared order
    pub events: (usize, usize),
    pub state: StateId,
    /// Normal form reached by applying `events.0` then `events.1`
    pub nf_first_second: StateId,
    /// Normal form reached by applying `events.1` then `events.0`
    pub nf_second_first: StateId,
}

/// A CC2 counterexample: stepping disagrees with normalize-then-step
#[derive(Debug, Clone)]
pub struct Cc2Failure {
    pub event: usize,
    pub state: StateId,
    pub nf_state: StateId,
    /// `Step[e][s]`
    pub step_direct: StateId,
    /// `Step[e][NF[s]]`
    pub step_via_nf: StateId,
}

/// Whether two distinct events are independent: no write of one
/// intersects the reads or writes of the other.
pub fn independent(
    writes: &[FxHashSet<usize>],
    reads: &[FxHashSet<usize>],
    e1: usize,
    e2: usize,
) -> bool {
    for &w in &writes[e1] {
        if writes[e2].contains(&w) || reads[e2].contains(&w) {
            return false;
        }
    }
    for &w in &writes[e2] {
        if writes[e1].contains(&w) || reads[e1].contains(&w) {
            return false;
        }
    }
    true
}

/// Run CC1 and CC2 against completed tables.
pub fn check(cr: &CompiledRegistry, nf: &[StateId], step: &[Vec<Option<StateId>>]) -> CcResult {
    let num_events = cr.registry.events.len();

    let mut result = CcResult {
        cc1_pass: true,
        cc2_pass: true,
        pairs_checked: 0,
        dependent_skipped: 0,
        cc1_failure: None,
        cc2_failure: None,
    };

    // CC1 over independent unordered pairs.
    'cc1: for e1 in 0..num_events {
        for e2 in e1 + 1..num_events {
            if !independent(&cr.event_writes, &cr.event_reads, e1, e2) {
                result.dependent_skipped += 1;
                continue;
            }
            result.pairs_checked += 1;
            for sid in cr.schema.state_ids() {
                let (Some(s1), Some(s2)) =
                    (step[e1][sid.as_usize()], step[e2][sid.as_usize()])
                else {
                    continue;
                };
                // Guards gate out intermediate configurations.
                let (Some(r12), Some(r21)) = (step[e2][s1.as_usize()], step[e1][s2.as_usize()])
                else {
                    continue;
                };
                if r12 != r21 {
                    debug!(e1, e2, state = sid.0, "CC1 counterexample");
                    result.cc1_pass = false;
                    result.cc1_failure = Some(Cc1Failure {
                        events: (e1, e2),
                        state: sid,
                        nf_first_second: r12,
                        nf_second_first: r21,
                    });
                    break 'cc1;
                }
            }
        }
    }

    // CC2 over every event and state.
    'cc2: for event in 0..num_events {
        for sid in cr.schema.state_ids() {
            let Some(direct) = step[event][sid.as_usize()] else {
                continue;
            };
            let nf_state = nf[sid.as_usize()];
            let Some(via_nf) = step[event][nf_state.as_usize()] else {
                continue;
            };
            if direct != via_nf {
                debug!(event, state = sid.0, "CC2 counterexample");
                result.cc2_pass = false;
                result.cc2_failure = Some(Cc2Failure {
                    event,
                    state: sid,
                    nf_state,
                    step_direct: direct,
                    step_via_nf: via_nf,
                });
                break 'cc2;
            }
        }
    }

    result
}
