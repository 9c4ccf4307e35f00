//! ncc-check - normalization-confluence verification engine
//!
//! This crate provides:
//! - **Registry model**: the parsed spec (variables, invariants,
//!   compensation, events) and its JSON loader
//! - **Schema & codec**: mixed-radix bijection between states and
//!   integer state IDs
//! - **Compiler**: expression parsing, identifier resolution, static
//!   type inference, and per-event read/write sets
//! - **Table builder**: `Valid`, `NF`, and `Step` over the full state
//!   space
//! - **Checkers**: Well-Founded Compensation (WFC) and Compensation
//!   Commutativity (CC1/CC2)
//! - **Report**: human-readable and JSON renderings of the verdict
//!
//! # Quick Start
//!
//! ```rust
//! use ncc_check::{compile, registry, verify, CheckOptions};
//!
//! let spec = r#"{"registry": {
//!     "name": "demo",
//!     "states": {"on": {"type": "bool"}},
//!     "events": {"toggle": {"effect": {"on": "not on"}}}
//! }}"#;
//!
//! let options = CheckOptions::default();
//! let compiled = compile(registry::parse(spec).unwrap(), &options).unwrap();
//! let verification = verify(&compiled, &options).unwrap();
//! assert!(verification.converged());
//! ```

pub mod cc;
pub mod compile;
pub mod error;
pub mod eval;
pub mod registry;
pub mod report;
pub mod resolve;
pub mod schema;
pub mod tables;
pub mod value;
pub mod verify;
pub mod wfc;

// Re-exports
pub use cc::{Cc1Failure, Cc2Failure, CcResult};
pub use compile::{compile, CheckOptions, CompiledRegistry};
pub use error::{BuildError, CompileError, EvalError, EvalResult, ParseError};
pub use registry::{load_file, Event, Invariant, Registry, Repair};
pub use report::{render_state, JsonReport, Report};
pub use schema::{Schema, State, StateId, VarDef, VarKind, DEFAULT_MAX_STATES};
pub use value::Value;
pub use verify::{verify, Verification};
pub use wfc::{WfcFailure, WfcFailureKind, WfcResult};
