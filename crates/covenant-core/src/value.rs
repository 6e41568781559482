//! Runtime values — the arguments and results that flow through guarded calls
//!
//! [`Value`] is the dynamic representation every contract is checked against.
//! Function values carry a [`Callable`] so that higher-order contracts can
//! wrap them in a nested contract record before they are handed on.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::Result;

// ── Callable ──────────────────────────────────────────────

/// Signature shared by every guarded or guardable function:
/// positional arguments plus an optional trailing callback.
pub type CallFn = dyn Fn(&[Value], Option<&Callable>) -> Result<Value> + Send + Sync;

/// A named, cheaply clonable function value
#[derive(Clone)]
pub struct Callable {
    name: Arc<str>,
    func: Arc<CallFn>,
}

impl Callable {
    /// Wrap a closure as a callable value
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value], Option<&Callable>) -> Result<Value> + Send + Sync + 'static,
    {
        Callable {
            name: Arc::from(name.into()),
            func: Arc::new(func),
        }
    }

    /// Name used in diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke with positional arguments and an optional callback
    pub fn call(&self, args: &[Value], callback: Option<&Callable>) -> Result<Value> {
        (self.func)(args, callback)
    }

    /// Identity comparison: two callables are equal only if they share a body
    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Arc::as_ptr(&self.func).cast::<()>() == Arc::as_ptr(&other.func).cast::<()>()
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self.name)
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

// ── Value ─────────────────────────────────────────────────

/// A dynamically typed runtime value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null / absent
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value (i64)
    Integer(i64),
    /// Float value (f64)
    Float(f64),
    /// String value
    String(String),
    /// Ordered sequence
    Array(Vec<Value>),
    /// Keyed mapping (BTreeMap for deterministic iteration)
    Object(BTreeMap<String, Value>),
    /// Function value
    Function(Callable),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            // Debug keeps the fractional part so 1.0 never reads back as an integer
            Value::Float(v) => write!(f, "{:?}", v),
            Value::String(s) => write_quoted(f, s),
            Value::Array(arr) => {
                write!(f, "[")?;
                for (i, v) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Object(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_key(f, k)?;
                    write!(f, ": {}", v)?;
                }
                write!(f, "}}")
            }
            Value::Function(c) => write!(f, "#<Callable {}>", c.name()),
        }
    }
}

/// Write a string literal with `"` and `\` escaped
pub(crate) fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    write!(f, "\"")?;
    for ch in s.chars() {
        match ch {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "\"")
}

/// Write a mapping key bare when it is identifier-like, quoted otherwise
pub(crate) fn write_key(f: &mut fmt::Formatter<'_>, key: &str) -> fmt::Result {
    let mut chars = key.chars();
    let bare = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if bare {
        write!(f, "{}", key)
    } else {
        write_quoted(f, key)
    }
}

impl Value {
    /// Get the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Nil",
            Value::Boolean(_) => "Bool",
            Value::Integer(_) => "Integer",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Object(_) => "Hash",
            Value::Function(_) => "Callable",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view used by the numeric refinements
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Value::Function(c) => Some(c),
            _ => None,
        }
    }

    /// An empty keyed mapping, the default for an omitted options argument
    pub fn empty_object() -> Self {
        Value::Object(BTreeMap::new())
    }

    /// Convert from serde_json::Value (keys land in a BTreeMap)
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    Value::Null
                }
            }
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(arr) => {
                Value::Array(arr.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert to serde_json::Value. Functions have no JSON form and
    /// render as their display string.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::json!(*i),
            Value::Float(f) => serde_json::json!(*f),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(|v| v.to_json()).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Function(_) => serde_json::Value::String(self.to_string()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<Callable> for Value {
    fn from(c: Callable) -> Self {
        Value::Function(c)
    }
}

// ── Scalar types ──────────────────────────────────────────

/// The type tags a `Type` contract checks with is-instance-of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// Every value
    Any,
    Nil,
    Bool,
    Integer,
    Float,
    /// Integer or Float
    Num,
    String,
    Array,
    Hash,
    Callable,
}

impl ScalarType {
    pub const ALL: [ScalarType; 10] = [
        ScalarType::Any,
        ScalarType::Nil,
        ScalarType::Bool,
        ScalarType::Integer,
        ScalarType::Float,
        ScalarType::Num,
        ScalarType::String,
        ScalarType::Array,
        ScalarType::Hash,
        ScalarType::Callable,
    ];

    /// is-instance-of
    pub fn matches(self, value: &Value) -> bool {
        match self {
            ScalarType::Any => true,
            ScalarType::Nil => matches!(value, Value::Null),
            ScalarType::Bool => matches!(value, Value::Boolean(_)),
            ScalarType::Integer => matches!(value, Value::Integer(_)),
            ScalarType::Float => matches!(value, Value::Float(_)),
            ScalarType::Num => matches!(value, Value::Integer(_) | Value::Float(_)),
            ScalarType::String => matches!(value, Value::String(_)),
            ScalarType::Array => matches!(value, Value::Array(_)),
            ScalarType::Hash => matches!(value, Value::Object(_)),
            ScalarType::Callable => matches!(value, Value::Function(_)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScalarType::Any => "Any",
            ScalarType::Nil => "Nil",
            ScalarType::Bool => "Bool",
            ScalarType::Integer => "Integer",
            ScalarType::Float => "Float",
            ScalarType::Num => "Num",
            ScalarType::String => "String",
            ScalarType::Array => "Array",
            ScalarType::Hash => "Hash",
            ScalarType::Callable => "Callable",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Tests ─────────────────────────────────────────────────
