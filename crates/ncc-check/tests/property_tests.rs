//! Property-based tests for the codec, evaluator, and independence
//! analysis
//!
//! These verify algebraic laws and structural properties across
//! randomized inputs using proptest.

use ncc_check::cc::independent;
use ncc_check::eval::{eval, Env};
use ncc_check::resolve::EnumLiterals;
use ncc_check::schema::{Schema, StateId, VarDef, VarKind, DEFAULT_MAX_STATES};
use ncc_check::value::Value;
use ncc_core::parse_expr;
use proptest::prelude::*;
use rustc_hash::FxHashSet;

// ============================================================================
// Helper functions
// ============================================================================

/// Evaluate a closed expression (no variables) and return the result
fn eval_str(src: &str) -> Value {
    let schema = Schema::new(Vec::new(), DEFAULT_MAX_STATES).unwrap();
    let literals = EnumLiterals::build(&schema).unwrap();
    let state: Vec<i64> = Vec::new();
    let env = Env::new(&schema, &state, &literals);
    eval(&parse_expr(src).unwrap(), &env).unwrap()
}

fn bool_str(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// Strategy for a single variable domain, tagged so enum literals are
/// globally unique across the schema
fn arb_kind(tag: usize) -> BoxedStrategy<VarKind> {
    prop_oneof![
        Just(VarKind::Bool),
        (1usize..=4).prop_map(move |k| VarKind::Enum {
            values: (0..k).map(|j| format!("e{tag}_{j}")).collect(),
        }),
        (-3i64..=3i64, 0i64..=3i64).prop_map(|(lo, d)| VarKind::Int {
            min: lo,
            max: lo + d,
        }),
    ]
    .boxed()
}

/// Strategy for a small schema of 1 to 3 variables
fn arb_schema() -> impl Strategy<Value = Schema> {
    (1usize..=3)
        .prop_flat_map(|n| {
            (0..n)
                .map(|i| {
                    arb_kind(i).prop_map(move |kind| VarDef {
                        name: format!("x{i}"),
                        kind,
                    })
                })
                .collect::<Vec<_>>()
        })
        .prop_map(|vars| Schema::new(vars, DEFAULT_MAX_STATES).unwrap())
}

/// Strategy for a subset of the variable indices 0..6
fn arb_var_set() -> impl Strategy<Value = FxHashSet<usize>> {
    prop::collection::hash_set(0usize..6, 0..4).prop_map(|s| s.into_iter().collect())
}

// ============================================================================
// Codec round-trip properties
// ============================================================================

proptest! {
    #[test]
    fn prop_codec_roundtrip_ids(schema in arb_schema()) {
        // Every ID decodes to a state that re-encodes to itself.
        for id in schema.state_ids() {
            prop_assert_eq!(schema.encode(&schema.decode(id)), id);
        }
    }

    #[test]
    fn prop_codec_roundtrip_states(schema in arb_schema(), seed in any::<u32>()) {
        // A state vector built value-by-value survives encode/decode.
        let mut state = Vec::with_capacity(schema.vars().len());
        let mut r = seed as u64;
        for var in schema.vars() {
            r = r.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let pick = (r >> 33) % var.size();
            let value = match &var.kind {
                VarKind::Int { min, .. } => min + pick as i64,
                _ => pick as i64,
            };
            state.push(value);
        }
        prop_assert_eq!(schema.decode(schema.encode(&state)), state);
    }

    #[test]
    fn prop_codec_ids_are_dense(schema in arb_schema()) {
        // decode is injective over [0, total): distinct IDs give
        // distinct states.
        let total = schema.total();
        let mut seen = FxHashSet::default();
        for id in schema.state_ids() {
            seen.insert(schema.decode(id));
        }
        prop_assert_eq!(seen.len() as u32, total);
        // And the ID space has no gaps.
        prop_assert!(StateId(total - 1).as_usize() == total as usize - 1);
    }
}

// ============================================================================
// Independence properties
// ============================================================================

proptest! {
    #[test]
    fn prop_independence_symmetric(
        w1 in arb_var_set(),
        r1 in arb_var_set(),
        w2 in arb_var_set(),
        r2 in arb_var_set(),
    ) {
        let writes = vec![w1, w2];
        let reads = vec![r1, r2];
        prop_assert_eq!(
            independent(&writes, &reads, 0, 1),
            independent(&writes, &reads, 1, 0)
        );
    }

    #[test]
    fn prop_shared_write_is_dependent(
        w1 in arb_var_set(),
        r1 in arb_var_set(),
        r2 in arb_var_set(),
    ) {
        // Any shared write variable makes the pair dependent.
        if let Some(&shared) = w1.iter().next() {
            let mut w2 = FxHashSet::default();
            w2.insert(shared);
            let writes = vec![w1, w2];
            let reads = vec![r1, r2];
            prop_assert!(!independent(&writes, &reads, 0, 1));
        }
    }
}

// ============================================================================
// Boolean operator laws
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_and_commutative(a: bool, b: bool) {
        let lhs = eval_str(&format!("{} and {}", bool_str(a), bool_str(b)));
        let rhs = eval_str(&format!("{} and {}", bool_str(b), bool_str(a)));
        prop_assert_eq!(lhs, rhs);
    }

    #[test]
    fn prop_or_identity(a: bool) {
        let result = eval_str(&format!("{} or false", bool_str(a)));
        prop_assert_eq!(result, Value::Bool(a));
    }

    #[test]
    fn prop_not_involution(a: bool) {
        let result = eval_str(&format!("not not {}", bool_str(a)));
        prop_assert_eq!(result, Value::Bool(a));
    }

    #[test]
    fn prop_de_morgan(a: bool, b: bool) {
        let lhs = eval_str(&format!("not ({} and {})", bool_str(a), bool_str(b)));
        let rhs = eval_str(&format!(
            "not {} or not {}",
            bool_str(a),
            bool_str(b)
        ));
        prop_assert_eq!(lhs, rhs);
    }
}

// ============================================================================
// Integer operator laws
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_add_commutative(a in -1000i32..1000, b in -1000i32..1000) {
        let lhs = eval_str(&format!("{a} + {b}"));
        let rhs = eval_str(&format!("{b} + {a}"));
        prop_assert_eq!(lhs, rhs);
    }

    #[test]
    fn prop_div_rem_reconstruct(a in -1000i32..1000, b in 1i32..100) {
        // (a / b) * b + a % b == a, with truncating division
        let result = eval_str(&format!("(({a}) / {b}) * {b} + ({a}) % {b}"));
        prop_assert_eq!(result, Value::Int(a as i64));
    }

    #[test]
    fn prop_min_max_ordering(a in -1000i32..1000, b in -1000i32..1000) {
        let min = eval_str(&format!("min({a}, {b})"));
        let max = eval_str(&format!("max({a}, {b})"));
        prop_assert_eq!(min, Value::Int(a.min(b) as i64));
        prop_assert_eq!(max, Value::Int(b.max(a) as i64));
    }

    #[test]
    fn prop_clamp_within_bounds(lo in -100i32..100, x in -1000i32..1000, d in 0i32..200) {
        let hi = lo + d;
        let result = eval_str(&format!("clamp({lo}, {x}, {hi})"));
        let v = result.as_int().expect("clamp returns int");
        prop_assert!(v >= lo as i64 && v <= hi as i64);
        if x >= lo && x <= hi {
            prop_assert_eq!(v, x as i64);
        }
    }

    #[test]
    fn prop_comparison_negation(a in -1000i32..1000, b in -1000i32..1000) {
        let lt = eval_str(&format!("{a} < {b}"));
        let ge = eval_str(&format!("not ({a} >= {b})"));
        prop_assert_eq!(lt, ge);
    }

    #[test]
    fn prop_if_selects_branch(c: bool, a in -100i32..100, b in -100i32..100) {
        let result = eval_str(&format!("if {} then {a} else {b}", bool_str(c)));
        prop_assert_eq!(result, Value::Int(if c { a } else { b } as i64));
    }
}
