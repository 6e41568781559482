//! Validator compiler — turns a contract spec into a reusable check
//!
//! Compilation walks the contract once and composes closures, so the hot path
//! (every guarded call) never re-inspects the contract tree. Function contracts
//! only check that the value is callable here; the binder wraps matched
//! callables so that their own calls are checked when they happen.

use std::fmt;
use std::sync::Arc;

use crate::spec::{ContractSpec, Refinement};
use crate::value::Value;

type CheckFn = dyn Fn(&Value) -> bool + Send + Sync;

/// A compiled, pure `value -> bool` check
#[derive(Clone)]
pub struct Validator(Arc<CheckFn>);

impl Validator {
    fn from_fn<F>(check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Validator(Arc::new(check))
    }

    /// Compile a spec into a validator
    pub fn compile(spec: &ContractSpec) -> Self {
        match spec {
            ContractSpec::Type(t) => {
                let t = *t;
                Self::from_fn(move |v| t.matches(v))
            }
            ContractSpec::Refined(r) => {
                let r = *r;
                Self::from_fn(move |v| refine(r, v))
            }
            ContractSpec::Exactly(expected) => {
                let expected = expected.clone();
                Self::from_fn(move |v| *v == expected)
            }
            ContractSpec::OneOf(values) => {
                let values = values.clone();
                Self::from_fn(move |v| values.contains(v))
            }
            ContractSpec::Predicate(p) => {
                let p = p.clone();
                Self::from_fn(move |v| p.test(v))
            }
            ContractSpec::Custom(c) => {
                let c = Arc::clone(c);
                Self::from_fn(move |v| c.validate(v))
            }
            ContractSpec::Tuple(specs) => {
                let items: Vec<Validator> = specs.iter().map(Self::compile).collect();
                Self::from_fn(move |v| match v {
                    Value::Array(actual) => {
                        actual.len() == items.len()
                            && items.iter().zip(actual).all(|(check, item)| check.check(item))
                    }
                    _ => false,
                })
            }
            ContractSpec::Mapping(pairs) => {
                let fields = compile_fields(pairs.iter());
                Self::from_fn(move |v| match v {
                    Value::Object(actual) => fields_hold(&fields, actual),
                    _ => false,
                })
            }
            ContractSpec::Keywords(pairs) => {
                let fields = compile_fields(pairs.iter());
                Self::from_fn(move |v| match v {
                    Value::Object(actual) => {
                        actual
                            .keys()
                            .all(|k| fields.iter().any(|(name, _)| name == k))
                            && fields_hold(&fields, actual)
                    }
                    _ => false,
                })
            }
            ContractSpec::ListOf(inner) => {
                let inner = Self::compile(inner);
                Self::from_fn(move |v| match v {
                    Value::Array(items) => items.iter().all(|item| inner.check(item)),
                    _ => false,
                })
            }
            ContractSpec::MapOf(key, value) => {
                let key = Self::compile(key);
                let value = Self::compile(value);
                Self::from_fn(move |v| match v {
                    Value::Object(map) => map
                        .iter()
                        .all(|(k, item)| key.check(&Value::String(k.clone())) && value.check(item)),
                    _ => false,
                })
            }
            // Each matched position is checked on its own against the inner contract
            ContractSpec::Variadic(inner) => Self::compile(inner),
            ContractSpec::Function(_) => Self::from_fn(|v| matches!(v, Value::Function(_))),
            ContractSpec::AnyOf(specs) => {
                let options: Vec<Validator> = specs.iter().map(Self::compile).collect();
                Self::from_fn(move |v| options.iter().any(|check| check.check(v)))
            }
            ContractSpec::AllOf(specs) => {
                let parts: Vec<Validator> = specs.iter().map(Self::compile).collect();
                Self::from_fn(move |v| parts.iter().all(|check| check.check(v)))
            }
            ContractSpec::Not(inner) => {
                let inner = Self::compile(inner);
                Self::from_fn(move |v| !inner.check(v))
            }
            ContractSpec::Maybe(inner) => {
                let inner = Self::compile(inner);
                Self::from_fn(move |v| v.is_null() || inner.check(v))
            }
            ContractSpec::Never => Self::from_fn(|_| false),
        }
    }

    /// Run the check
    pub fn check(&self, value: &Value) -> bool {
        (self.0)(value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validator")
    }
}

fn refine(r: Refinement, value: &Value) -> bool {
    match r {
        Refinement::Pos => value.as_f64().is_some_and(|n| n > 0.0),
        Refinement::Neg => value.as_f64().is_some_and(|n| n < 0.0),
        Refinement::Nat => value.as_i64().is_some_and(|n| n >= 0),
    }
}

fn compile_fields<'a>(
    pairs: impl Iterator<Item = (&'a String, &'a ContractSpec)>,
) -> Vec<(String, Validator)> {
    pairs
        .map(|(k, spec)| (k.clone(), Validator::compile(spec)))
        .collect()
}

/// Every declared key validates; an absent key is checked as null
fn fields_hold(
    fields: &[(String, Validator)],
    actual: &std::collections::BTreeMap<String, Value>,
) -> bool {
    fields
        .iter()
        .all(|(key, check)| check.check(actual.get(key).unwrap_or(&Value::Null)))
}

// ── Tests ─────────────────────────────────────────────────
