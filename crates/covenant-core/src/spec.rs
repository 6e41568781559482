//! Contract specifications — the closed set of things a value can be checked against
//!
//! A [`ContractSpec`] is immutable once built. Records compile each spec
//! into a [`Validator`](crate::validator::Validator) exactly once; the contract
//! itself is kept for diagnostics and for [`ContractSpec::describe`].
//!
//! Two escape hatches exist for checks the closed set cannot express:
//! [`Predicate`] (a named function value) and [`Validate`] (a type that
//! knows how to validate and describe itself).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::value::{write_key, ScalarType, Value};

/// Self-validation capability for custom contract types
pub trait Validate: Send + Sync {
    fn validate(&self, value: &Value) -> bool;

    /// How the contract reads in diagnostics and in `describe()`
    fn describe(&self) -> String;
}

/// A named boolean test over a value
#[derive(Clone)]
pub struct Predicate {
    name: Arc<str>,
    test: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
}

impl Predicate {
    pub fn new<F>(name: impl Into<String>, test: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Predicate {
            name: Arc::from(name.into()),
            test: Arc::new(test),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn test(&self, value: &Value) -> bool {
        (self.test)(value)
    }
}

/// Numeric refinements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refinement {
    /// Strictly positive number
    Pos,
    /// Strictly negative number
    Neg,
    /// Integer ≥ 0
    Nat,
}

impl Refinement {
    pub fn name(self) -> &'static str {
        match self {
            Refinement::Pos => "Pos",
            Refinement::Neg => "Neg",
            Refinement::Nat => "Nat",
        }
    }
}

/// Argument and return contracts of a function-typed value
#[derive(Clone)]
pub struct FunctionSpec {
    pub args: Vec<ContractSpec>,
    pub returns: ContractSpec,
}

/// A contract a single value must satisfy
#[derive(Clone)]
pub enum ContractSpec {
    /// is-instance-of
    Type(ScalarType),
    /// Numeric refinement
    Refined(Refinement),
    /// Strict equality
    Exactly(Value),
    /// Equal to one of the listed values
    OneOf(Vec<Value>),
    /// Named function value
    Predicate(Predicate),
    /// Self-validating contract object
    Custom(Arc<dyn Validate>),
    /// Fixed-length array, checked pairwise
    Tuple(Vec<ContractSpec>),
    /// Mapping with required keys; extra keys are ignored
    Mapping(BTreeMap<String, ContractSpec>),
    /// Like `Mapping` but unknown keys are rejected
    Keywords(BTreeMap<String, ContractSpec>),
    /// Array whose every element satisfies the inner contract
    ListOf(Box<ContractSpec>),
    /// Mapping whose every key and value satisfy the given contracts
    MapOf(Box<ContractSpec>, Box<ContractSpec>),
    /// Zero or more argument positions, each checked against the inner contract
    Variadic(Box<ContractSpec>),
    /// Callable whose own calls are contract-checked
    Function(Arc<FunctionSpec>),
    AnyOf(Vec<ContractSpec>),
    AllOf(Vec<ContractSpec>),
    Not(Box<ContractSpec>),
    /// Null or the inner contract
    Maybe(Box<ContractSpec>),
    /// Rejects every value
    Never,
}

impl ContractSpec {
    // ── Constructors ──────────────────────────────────────

    pub fn predicate<F>(name: impl Into<String>, test: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        ContractSpec::Predicate(Predicate::new(name, test))
    }

    pub fn custom(contract: impl Validate + 'static) -> Self {
        ContractSpec::Custom(Arc::new(contract))
    }

    pub fn exactly(value: impl Into<Value>) -> Self {
        ContractSpec::Exactly(value.into())
    }

    pub fn tuple(specs: impl IntoIterator<Item = ContractSpec>) -> Self {
        ContractSpec::Tuple(specs.into_iter().collect())
    }

    pub fn mapping<K: Into<String>>(pairs: impl IntoIterator<Item = (K, ContractSpec)>) -> Self {
        ContractSpec::Mapping(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn keywords<K: Into<String>>(pairs: impl IntoIterator<Item = (K, ContractSpec)>) -> Self {
        ContractSpec::Keywords(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn list_of(inner: impl Into<ContractSpec>) -> Self {
        ContractSpec::ListOf(Box::new(inner.into()))
    }

    pub fn map_of(key: impl Into<ContractSpec>, value: impl Into<ContractSpec>) -> Self {
        ContractSpec::MapOf(Box::new(key.into()), Box::new(value.into()))
    }

    pub fn variadic(inner: impl Into<ContractSpec>) -> Self {
        ContractSpec::Variadic(Box::new(inner.into()))
    }

    pub fn function(
        args: impl IntoIterator<Item = ContractSpec>,
        returns: impl Into<ContractSpec>,
    ) -> Self {
        ContractSpec::Function(Arc::new(FunctionSpec {
            args: args.into_iter().collect(),
            returns: returns.into(),
        }))
    }

    pub fn maybe(inner: impl Into<ContractSpec>) -> Self {
        ContractSpec::Maybe(Box::new(inner.into()))
    }

    pub fn not(inner: impl Into<ContractSpec>) -> Self {
        ContractSpec::Not(Box::new(inner.into()))
    }

    pub fn any_of(specs: impl IntoIterator<Item = ContractSpec>) -> Self {
        ContractSpec::AnyOf(specs.into_iter().collect())
    }

    pub fn all_of(specs: impl IntoIterator<Item = ContractSpec>) -> Self {
        ContractSpec::AllOf(specs.into_iter().collect())
    }

    pub fn one_of(values: impl IntoIterator<Item = Value>) -> Self {
        ContractSpec::OneOf(values.into_iter().collect())
    }

    // ── Shape queries ─────────────────────────────────────

    pub fn is_variadic(&self) -> bool {
        matches!(self, ContractSpec::Variadic(_))
    }

    /// A callback contract: a function contract or the `Callable` type, or
    /// a `Maybe` of either (an optional callback)
    pub fn is_function(&self) -> bool {
        match self {
            ContractSpec::Function(_) | ContractSpec::Type(ScalarType::Callable) => true,
            ContractSpec::Maybe(inner) => inner.is_function(),
            _ => false,
        }
    }

    /// An options-style mapping contract
    pub fn is_options(&self) -> bool {
        matches!(self, ContractSpec::Mapping(_) | ContractSpec::Keywords(_))
    }

    /// The function contract a matched value must be wrapped with, looking
    /// through `Maybe` and `Variadic`
    pub fn function_spec(&self) -> Option<&Arc<FunctionSpec>> {
        match self {
            ContractSpec::Function(spec) => Some(spec),
            ContractSpec::Maybe(inner) | ContractSpec::Variadic(inner) => inner.function_spec(),
            _ => None,
        }
    }

    // ── Rendering ─────────────────────────────────────────

    /// Human-readable form, parseable back by the signature parser for
    /// everything except predicates and custom contracts
    pub fn describe(&self) -> String {
        self.to_string()
    }
}

impl From<ScalarType> for ContractSpec {
    fn from(t: ScalarType) -> Self {
        ContractSpec::Type(t)
    }
}

impl From<Refinement> for ContractSpec {
    fn from(r: Refinement) -> Self {
        ContractSpec::Refined(r)
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// `arg1, arg2 => ret`, or `=> ret` without arguments
pub(crate) fn write_signature(
    f: &mut fmt::Formatter<'_>,
    args: &[ContractSpec],
    returns: &ContractSpec,
) -> fmt::Result {
    write_list(f, args)?;
    if !args.is_empty() {
        write!(f, " ")?;
    }
    write!(f, "=> {}", returns)
}

fn write_pairs(f: &mut fmt::Formatter<'_>, pairs: &BTreeMap<String, ContractSpec>) -> fmt::Result {
    for (i, (key, spec)) in pairs.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write_key(f, key)?;
        write!(f, ": {}", spec)?;
    }
    Ok(())
}

impl fmt::Display for ContractSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractSpec::Type(t) => write!(f, "{}", t),
            ContractSpec::Refined(r) => f.write_str(r.name()),
            ContractSpec::Exactly(v @ (Value::Array(_) | Value::Object(_))) => {
                write!(f, "Eq[{}]", v)
            }
            ContractSpec::Exactly(v) => write!(f, "{}", v),
            ContractSpec::OneOf(values) => {
                write!(f, "Enum[")?;
                write_list(f, values)?;
                write!(f, "]")
            }
            ContractSpec::Predicate(p) => f.write_str(p.name()),
            ContractSpec::Custom(c) => f.write_str(&c.describe()),
            ContractSpec::Tuple(specs) => {
                write!(f, "[")?;
                write_list(f, specs)?;
                write!(f, "]")
            }
            ContractSpec::Mapping(pairs) => {
                write!(f, "{{")?;
                write_pairs(f, pairs)?;
                write!(f, "}}")
            }
            ContractSpec::Keywords(pairs) => {
                write!(f, "KeywordArgs[")?;
                write_pairs(f, pairs)?;
                write!(f, "]")
            }
            ContractSpec::ListOf(inner) => write!(f, "ArrayOf[{}]", inner),
            ContractSpec::MapOf(k, v) => write!(f, "HashOf[{} => {}]", k, v),
            ContractSpec::Variadic(inner) => write!(f, "Args[{}]", inner),
            ContractSpec::Function(spec) => {
                write!(f, "Func[")?;
                write_signature(f, &spec.args, &spec.returns)?;
                write!(f, "]")
            }
            ContractSpec::AnyOf(specs) => {
                write!(f, "Or[")?;
                write_list(f, specs)?;
                write!(f, "]")
            }
            ContractSpec::AllOf(specs) => {
                write!(f, "And[")?;
                write_list(f, specs)?;
                write!(f, "]")
            }
            ContractSpec::Not(inner) => write!(f, "Not[{}]", inner),
            ContractSpec::Maybe(inner) => write!(f, "Maybe[{}]", inner),
            ContractSpec::Never => f.write_str("None"),
        }
    }
}

impl fmt::Debug for ContractSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContractSpec({})", self)
    }
}

// ── Tests ─────────────────────────────────────────────────
