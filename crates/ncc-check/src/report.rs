//! Report rendering: states, counterexamples, and the final verdict
//!
//! The human format has fixed sections in a fixed order so that two
//! runs over the same spec produce byte-identical output (modulo the
//! elapsed time on the last line). The JSON format carries the same
//! verdicts in a structured form for automation.

use crate::compile::{CheckOptions, CompiledRegistry};
use crate::schema::{Schema, StateId, VarKind};
use crate::verify::Verification;
use crate::wfc::WfcFailureKind;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt::Write as _;
use std::time::Duration;

/// Version of the JSON output format
pub const OUTPUT_VERSION: &str = "1.0";

/// Render a state as `{name=value, ...}` in schema-declared order.
pub fn render_state(schema: &Schema, state: &[i64]) -> String {
    let mut parts = Vec::with_capacity(state.len());
    for (var, &value) in schema.vars().iter().zip(state) {
        let rendered = match &var.kind {
            VarKind::Bool => format!("{}={}", var.name, value == 1),
            VarKind::Enum { values } => match values.get(value as usize) {
                Some(literal) => format!("{}={}", var.name, literal),
                None => format!("{}=?{}", var.name, value),
            },
            VarKind::Int { .. } => format!("{}={}", var.name, value),
        };
        parts.push(rendered);
    }
    format!("{{{}}}", parts.join(", "))
}

/// A finished verification run, ready to render
pub struct Report<'a> {
    pub cr: &'a CompiledRegistry,
    pub verification: &'a Verification,
    /// Path of the spec file, echoed in the header
    pub source: &'a str,
    pub options: CheckOptions,
    pub elapsed: Duration,
}

impl<'a> Report<'a> {
    fn state(&self, id: StateId) -> String {
        render_state(&self.cr.schema, &self.cr.schema.decode(id))
    }

    fn event_name(&self, index: usize) -> &str {
        &self.cr.registry.events[index].name
    }

    fn wfc_failure_message(&self) -> String {
        let failure = self
            .verification
            .wfc
            .failure
            .as_ref()
            .expect("WFC failed without a counterexample");
        match failure.kind {
            WfcFailureKind::NotValid => format!(
                "state {} → NF {} which is not valid",
                self.state(failure.state),
                self.state(failure.nf.expect("NotValid carries an NF")),
            ),
            WfcFailureKind::ValidButMoves => format!(
                "valid state {} has NF {} (not a fixpoint)",
                self.state(failure.state),
                self.state(failure.nf.expect("ValidButMoves carries an NF")),
            ),
            WfcFailureKind::Diverged => format!(
                "compensation did not terminate within {} steps from state {}",
                self.options.max_repair_iter,
                self.state(failure.state),
            ),
        }
    }

    /// Render the fixed-section human report.
    pub fn render_human(&self) -> String {
        let mut out = String::new();
        let v = self.verification;
        let reg = &self.cr.registry;

        writeln!(out, "ncc — Normalization Confluence Verifier").unwrap();
        writeln!(out, "════════════════════════════════════════════").unwrap();
        writeln!(out).unwrap();
        writeln!(out, "Registry:    {}", reg.name).unwrap();
        writeln!(out, "Source:      {}", self.source).unwrap();
        writeln!(out).unwrap();

        let var_parts: Vec<String> =
            self.cr.schema.vars().iter().map(|v| v.summary()).collect();
        let (valid_count, invalid_count) = v.stats();
        writeln!(out, "State Space").unwrap();
        writeln!(out, "  Variables: {}", var_parts.join(" × ")).unwrap();
        writeln!(out, "  Total:     {} states", self.cr.schema.total()).unwrap();
        writeln!(out, "  Valid:     {valid_count}").unwrap();
        writeln!(out, "  Invalid:   {invalid_count}").unwrap();
        writeln!(out).unwrap();

        let event_names: Vec<&str> = reg.events.iter().map(|e| e.name.as_str()).collect();
        writeln!(
            out,
            "Events:      {}  [{}]",
            event_names.len(),
            event_names.join(", ")
        )
        .unwrap();
        let inv_names: Vec<&str> = reg.invariants.iter().map(|i| i.name.as_str()).collect();
        writeln!(
            out,
            "Invariants:  {}  [{}]",
            inv_names.len(),
            inv_names.join(", ")
        )
        .unwrap();
        writeln!(out).unwrap();

        writeln!(out, "WFC (Well-Founded Compensation)").unwrap();
        if v.wfc.pass {
            writeln!(out, "  Result:    PASS").unwrap();
            writeln!(out, "  Max depth: {}", v.wfc.max_depth).unwrap();
        } else {
            writeln!(out, "  Result:    FAIL").unwrap();
            writeln!(out, "  Failure:   {}", self.wfc_failure_message()).unwrap();
        }
        writeln!(out).unwrap();

        writeln!(out, "CC (Compensation Commutativity)").unwrap();
        match &v.cc {
            None => {
                writeln!(out, "  CC1:       SKIPPED (normalization diverged)").unwrap();
                writeln!(out, "  CC2:       SKIPPED (normalization diverged)").unwrap();
            }
            Some(cc) => {
                if cc.cc1_pass {
                    writeln!(
                        out,
                        "  CC1:       PASS  ({} independent pairs checked, {} dependent skipped)",
                        cc.pairs_checked, cc.dependent_skipped
                    )
                    .unwrap();
                } else {
                    let failure = cc.cc1_failure.as_ref().expect("CC1 failed without a counterexample");
                    let (e1, e2) = failure.events;
                    writeln!(out, "  CC1:       FAIL").unwrap();
                    writeln!(
                        out,
                        "    Events:  ({}, {})",
                        self.event_name(e1),
                        self.event_name(e2)
                    )
                    .unwrap();
                    writeln!(out, "    State:   {}", self.state(failure.state)).unwrap();
                    writeln!(
                        out,
                        "    Order 1: {} → {} → {}",
                        self.event_name(e1),
                        self.event_name(e2),
                        self.state(failure.nf_first_second)
                    )
                    .unwrap();
                    writeln!(
                        out,
                        "    Order 2: {} → {} → {}",
                        self.event_name(e2),
                        self.event_name(e1),
                        self.state(failure.nf_second_first)
                    )
                    .unwrap();
                }
                if cc.cc2_pass {
                    writeln!(out, "  CC2:       PASS").unwrap();
                } else {
                    let failure = cc.cc2_failure.as_ref().expect("CC2 failed without a counterexample");
                    writeln!(out, "  CC2:       FAIL").unwrap();
                    writeln!(out, "    Event:   {}", self.event_name(failure.event)).unwrap();
                    writeln!(out, "    State:   {}", self.state(failure.state)).unwrap();
                    writeln!(out, "    NF(s):   {}", self.state(failure.nf_state)).unwrap();
                    writeln!(out, "    Step(e,s):     → {}", self.state(failure.step_direct))
                        .unwrap();
                    writeln!(
                        out,
                        "    Step(e,NF(s)): → {}",
                        self.state(failure.step_via_nf)
                    )
                    .unwrap();
                }
            }
        }
        writeln!(out).unwrap();

        writeln!(out, "════════════════════════════════════════════").unwrap();
        if v.converged() {
            writeln!(out, "Unique Normal Form:  YES").unwrap();
            writeln!(out, "Convergence:         GUARANTEED").unwrap();
        } else {
            writeln!(out, "Convergence:         NOT GUARANTEED").unwrap();
            if !v.wfc.pass {
                writeln!(out, "  ✗ WFC failed").unwrap();
            }
            if let Some(cc) = &v.cc {
                if !cc.cc1_pass {
                    writeln!(out, "  ✗ CC1 failed").unwrap();
                }
                if !cc.cc2_pass {
                    writeln!(out, "  ✗ CC2 failed").unwrap();
                }
            }
        }
        let rounded = Duration::from_micros(self.elapsed.as_micros() as u64);
        writeln!(out, "Checked in:          {rounded:?}").unwrap();

        out
    }

    /// Build the machine-readable report.
    pub fn to_json(&self) -> JsonReport {
        let v = self.verification;
        let (valid_count, invalid_count) = v.stats();

        let wfc = JsonWfc {
            pass: v.wfc.pass,
            max_depth: v.wfc.pass.then_some(v.wfc.max_depth),
            failure: v.wfc.failure.as_ref().map(|f| JsonWfcFailure {
                kind: match f.kind {
                    WfcFailureKind::NotValid => "nf_not_valid",
                    WfcFailureKind::ValidButMoves => "valid_state_moves",
                    WfcFailureKind::Diverged => "repair_diverged",
                }
                .to_string(),
                state: self.state(f.state),
                nf: f.nf.map(|id| self.state(id)),
                message: self.wfc_failure_message(),
            }),
        };

        let cc = v.cc.as_ref().map(|cc| JsonCc {
            cc1_pass: cc.cc1_pass,
            cc2_pass: cc.cc2_pass,
            pairs_checked: cc.pairs_checked,
            dependent_skipped: cc.dependent_skipped,
            cc1_failure: cc.cc1_failure.as_ref().map(|f| JsonCc1Failure {
                events: (
                    self.event_name(f.events.0).to_string(),
                    self.event_name(f.events.1).to_string(),
                ),
                state: self.state(f.state),
                nf_first_second: self.state(f.nf_first_second),
                nf_second_first: self.state(f.nf_second_first),
            }),
            cc2_failure: cc.cc2_failure.as_ref().map(|f| JsonCc2Failure {
                event: self.event_name(f.event).to_string(),
                state: self.state(f.state),
                nf_state: self.state(f.nf_state),
                step_direct: self.state(f.step_direct),
                step_via_nf: self.state(f.step_via_nf),
            }),
        });

        JsonReport {
            version: OUTPUT_VERSION.to_string(),
            tool: "ncc".to_string(),
            registry: self.cr.registry.name.clone(),
            source: self.source.to_string(),
            state_space: JsonStateSpace {
                variables: self.cr.schema.vars().iter().map(|v| v.summary()).collect(),
                total: self.cr.schema.total(),
                valid: valid_count,
                invalid: invalid_count,
            },
            events: self
                .cr
                .registry
                .events
                .iter()
                .map(|e| e.name.clone())
                .collect(),
            invariants: self
                .cr
                .registry
                .invariants
                .iter()
                .map(|i| i.name.clone())
                .collect(),
            initial: self.cr.registry.initial.clone(),
            wfc,
            cc,
            converged: v.converged(),
            elapsed_ms: self.elapsed.as_secs_f64() * 1000.0,
        }
    }
}

/// Complete JSON output for a verification run
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    pub version: String,
    pub tool: String,
    pub registry: String,
    pub source: String,
    pub state_space: JsonStateSpace,
    pub events: Vec<String>,
    pub invariants: Vec<String>,
    /// Declared initial valuation, echoed verbatim
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub initial: IndexMap<String, JsonValue>,
    pub wfc: JsonWfc,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<JsonCc>,
    pub converged: bool,
    pub elapsed_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonStateSpace {
    pub variables: Vec<String>,
    pub total: u32,
    pub valid: u32,
    pub invalid: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonWfc {
    pub pass: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<JsonWfcFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonWfcFailure {
    pub kind: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nf: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonCc {
    pub cc1_pass: bool,
    pub cc2_pass: bool,
    pub pairs_checked: usize,
    pub dependent_skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc1_failure: Option<JsonCc1Failure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc2_failure: Option<JsonCc2Failure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonCc1Failure {
    pub events: (String, String),
    pub state: String,
    pub nf_first_second: String,
    pub nf_second_first: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonCc2Failure {
    pub event: String,
    pub state: String,
    pub nf_state: String,
    pub step_direct: String,
    pub step_via_nf: String,
}
