//! Verification driver: tables, then WFC, then CC
//!
//! The pipeline is a synchronous batch. If normalization diverges while
//! the tables are being built, the run still produces a verdict: WFC
//! fails with the originating state and the CC checks are reported as
//! skipped, since there are no normal-form tables to compare against.

use crate::cc::{self, CcResult};
use crate::compile::{CheckOptions, CompiledRegistry};
use crate::error::BuildError;
use crate::schema::StateId;
use crate::tables::{self, NfBuild};
use crate::wfc::{self, WfcResult};
use tracing::debug;

/// The complete verification outcome for one registry
#[derive(Debug)]
pub struct Verification {
    pub valid: Vec<bool>,
    /// Absent when normalization diverged
    pub nf: Option<Vec<StateId>>,
    /// Absent when normalization diverged
    pub step: Option<Vec<Vec<Option<StateId>>>>,
    pub wfc: WfcResult,
    /// Absent when normalization diverged
    pub cc: Option<CcResult>,
}

impl Verification {
    /// Overall verdict: convergence is guaranteed iff WFC, CC1, and
    /// CC2 all pass.
    pub fn converged(&self) -> bool {
        self.wfc.pass && self.cc.as_ref().is_some_and(|cc| cc.pass())
    }

    /// Count of valid and invalid states
    pub fn stats(&self) -> (u32, u32) {
        let valid = self.valid.iter().filter(|&&v| v).count() as u32;
        (valid, self.valid.len() as u32 - valid)
    }
}

/// Build all tables and run both checkers.
pub fn verify(cr: &CompiledRegistry, options: &CheckOptions) -> Result<Verification, BuildError> {
    let valid = tables::build_valid(cr)?;

    let nf = match tables::build_nf(cr, &valid, options)? {
        NfBuild::Complete(nf) => nf,
        NfBuild::Diverged { state } => {
            debug!(state = state.0, "verification aborted: repair diverged");
            return Ok(Verification {
                valid,
                nf: None,
                step: None,
                wfc: wfc::diverged(state),
                cc: None,
            });
        }
    };

    let step = tables::build_step(cr, &nf)?;
    let wfc = wfc::check(cr, &valid, &nf, options)?;
    let cc = cc::check(cr, &nf, &step);
    debug!(
        wfc = wfc.pass,
        cc1 = cc.cc1_pass,
        cc2 = cc.cc2_pass,
        "verification complete"
    );

    Ok(Verification {
        valid,
        nf: Some(nf),
        step: Some(step),
        wfc,
        cc: Some(cc),
    })
}
