//! Registry model and spec-file loader
//!
//! A registry spec is a JSON document with a single top-level
//! `registry` object. Ordered mappings (`states`, `invariants`,
//! `events`) deserialize into `IndexMap` so declaration order survives
//! loading; that order is semantically significant for repair priority,
//! counterexample determinism, and state rendering.
//!
//! Effect and repair right-hand sides may be written as JSON strings,
//! numbers, or booleans; scalars are coerced to their expression source
//! form (`3` becomes `"3"`, `true` becomes `"true"`).

use crate::error::ParseError;
use crate::schema::{VarDef, VarKind};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::path::Path;

/// A named boolean predicate over state
#[derive(Debug, Clone)]
pub struct Invariant {
    pub name: String,
    pub expr: String,
}

/// A compensation step bound to one invariant
#[derive(Debug, Clone)]
pub struct Repair {
    /// Name of the invariant this repair compensates
    pub invariant: String,
    /// Simultaneous assignments, var name -> expression source
    pub assignments: IndexMap<String, String>,
}

/// A guarded transition
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    /// Boolean enablement condition; `None` means always enabled
    pub guard: Option<String>,
    /// Simultaneous assignments, var name -> expression source
    pub assignments: IndexMap<String, String>,
}

/// The complete parsed spec for a single registry
#[derive(Debug, Clone)]
pub struct Registry {
    pub name: String,
    pub vars: Vec<VarDef>,
    /// Declared initial valuation; stored and echoed in reports, not
    /// otherwise consulted by the verifier
    pub initial: IndexMap<String, JsonValue>,
    pub invariants: Vec<Invariant>,
    pub compensation: Vec<Repair>,
    pub events: Vec<Event>,
}

// Raw structures mirroring the JSON document.

#[derive(Deserialize)]
struct RawFile {
    registry: RawRegistry,
}

#[derive(Deserialize)]
struct RawRegistry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    states: IndexMap<String, RawVar>,
    #[serde(default)]
    initial: IndexMap<String, JsonValue>,
    #[serde(default)]
    invariants: IndexMap<String, RawInvariant>,
    #[serde(default)]
    compensation: Vec<RawRepair>,
    #[serde(default)]
    events: IndexMap<String, RawEvent>,
}

#[derive(Deserialize)]
struct RawVar {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    values: Vec<String>,
    #[serde(default)]
    range: Option<[i64; 2]>,
}

#[derive(Deserialize)]
struct RawInvariant {
    expr: String,
}

#[derive(Deserialize)]
struct RawRepair {
    invariant: String,
    repair: IndexMap<String, JsonValue>,
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(default)]
    guard: Option<String>,
    #[serde(default)]
    effect: IndexMap<String, JsonValue>,
}

/// Load and parse a registry spec file.
pub fn load_file(path: impl AsRef<Path>) -> Result<Registry, ParseError> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse(&data)
}

/// Parse registry spec JSON.
pub fn parse(data: &str) -> Result<Registry, ParseError> {
    let raw: RawFile = serde_json::from_str(data)?;
    let r = raw.registry;

    if r.name.is_empty() {
        return Err(ParseError::MissingName);
    }

    let mut vars = Vec::with_capacity(r.states.len());
    for (name, rv) in r.states {
        vars.push(parse_var_def(name, rv)?);
    }

    let invariants = r
        .invariants
        .into_iter()
        .map(|(name, ri)| Invariant {
            name,
            expr: ri.expr,
        })
        .collect();

    let mut compensation = Vec::with_capacity(r.compensation.len());
    for rc in r.compensation {
        let mut assignments = IndexMap::new();
        for (var, value) in rc.repair {
            let decl = format!("repair for \"{}\", variable \"{}\"", rc.invariant, var);
            assignments.insert(var, scalar_to_expr(&value, &decl)?);
        }
        compensation.push(Repair {
            invariant: rc.invariant,
            assignments,
        });
    }

    let mut events = Vec::with_capacity(r.events.len());
    for (name, re) in r.events {
        let mut assignments = IndexMap::new();
        for (var, value) in re.effect {
            let decl = format!("event \"{}\", variable \"{}\"", name, var);
            assignments.insert(var, scalar_to_expr(&value, &decl)?);
        }
        events.push(Event {
            name,
            guard: re.guard,
            assignments,
        });
    }

    Ok(Registry {
        name: r.name,
        vars,
        initial: r.initial,
        invariants,
        compensation,
        events,
    })
}

fn parse_var_def(name: String, rv: RawVar) -> Result<VarDef, ParseError> {
    let kind = match rv.ty.as_str() {
        "bool" => VarKind::Bool,
        "enum" => {
            if rv.values.is_empty() {
                return Err(ParseError::EnumWithoutValues { var: name });
            }
            for (i, value) in rv.values.iter().enumerate() {
                if rv.values[..i].contains(value) {
                    return Err(ParseError::DuplicateEnumValue {
                        var: name,
                        value: value.clone(),
                    });
                }
            }
            VarKind::Enum { values: rv.values }
        }
        "int" => {
            let Some([lo, hi]) = rv.range else {
                return Err(ParseError::IntWithoutRange { var: name });
            };
            if hi < lo {
                return Err(ParseError::EmptyIntRange { var: name, lo, hi });
            }
            VarKind::Int { min: lo, max: hi }
        }
        other => {
            return Err(ParseError::UnknownType {
                var: name,
                ty: other.to_string(),
            })
        }
    };
    Ok(VarDef { name, kind })
}

/// Coerce a JSON scalar into expression source text.
fn scalar_to_expr(value: &JsonValue, decl: &str) -> Result<String, ParseError> {
    match value {
        JsonValue::String(s) => Ok(s.clone()),
        JsonValue::Bool(b) => Ok(b.to_string()),
        JsonValue::Number(n) => Ok(n.to_string()),
        _ => Err(ParseError::InvalidExprValue {
            decl: decl.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERMISSIONS: &str = r#"{
        "registry": {
            "name": "permissions",
            "states": {
                "can_read": {"type": "bool"},
                "can_write": {"type": "bool"}
            },
            "initial": {"can_read": false, "can_write": false},
            "invariants": {
                "write_requires_read": {"expr": "not can_write or can_read"}
            },
            "compensation": [
                {"invariant": "write_requires_read", "repair": {"can_write": false}}
            ],
            "events": {
                "grant_read": {"effect": {"can_read": true}},
                "revoke_read": {"effect": {"can_read": false}},
                "grant_write": {"effect": {"can_write": true}},
                "revoke_write": {"effect": {"can_write": false}}
            }
        }
    }"#;

    #[test]
    fn test_parse_preserves_declared_order() {
        let reg = parse(PERMISSIONS).unwrap();
        assert_eq!(reg.name, "permissions");
        assert_eq!(reg.vars[0].name, "can_read");
        assert_eq!(reg.vars[1].name, "can_write");
        let names: Vec<&str> = reg.events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["grant_read", "revoke_read", "grant_write", "revoke_write"]
        );
        assert_eq!(reg.invariants[0].name, "write_requires_read");
    }

    #[test]
    fn test_scalar_coercion() {
        let reg = parse(PERMISSIONS).unwrap();
        // JSON `false` coerces to the expression string "false"
        assert_eq!(reg.compensation[0].assignments["can_write"], "false");
        assert_eq!(reg.events[0].assignments["can_read"], "true");
    }

    #[test]
    fn test_missing_name_rejected() {
        let err = parse(r#"{"registry": {"states": {}}}"#).unwrap_err();
        assert!(matches!(err, ParseError::MissingName));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let spec = r#"{"registry": {"name": "x", "states": {"v": {"type": "float"}}}}"#;
        let err = parse(spec).unwrap_err();
        assert!(matches!(err, ParseError::UnknownType { .. }));
    }

    #[test]
    fn test_enum_without_values_rejected() {
        let spec = r#"{"registry": {"name": "x", "states": {"v": {"type": "enum"}}}}"#;
        assert!(matches!(
            parse(spec).unwrap_err(),
            ParseError::EnumWithoutValues { .. }
        ));
    }

    #[test]
    fn test_duplicate_enum_value_rejected() {
        let spec = r#"{"registry": {"name": "x",
            "states": {"v": {"type": "enum", "values": ["a", "b", "a"]}}}}"#;
        assert!(matches!(
            parse(spec).unwrap_err(),
            ParseError::DuplicateEnumValue { .. }
        ));
    }

    #[test]
    fn test_int_range_validation() {
        let spec = r#"{"registry": {"name": "x", "states": {"v": {"type": "int"}}}}"#;
        assert!(matches!(
            parse(spec).unwrap_err(),
            ParseError::IntWithoutRange { .. }
        ));

        let spec = r#"{"registry": {"name": "x",
            "states": {"v": {"type": "int", "range": [5, 2]}}}}"#;
        assert!(matches!(
            parse(spec).unwrap_err(),
            ParseError::EmptyIntRange { lo: 5, hi: 2, .. }
        ));
    }

    #[test]
    fn test_numeric_effect_coerced() {
        let spec = r#"{"registry": {"name": "x",
            "states": {"n": {"type": "int", "range": [0, 3]}},
            "events": {"reset": {"effect": {"n": 0}}}}}"#;
        let reg = parse(spec).unwrap();
        assert_eq!(reg.events[0].assignments["n"], "0");
    }
}
