//! Bound call targets and the optional invariant capability
//!
//! A [`Target`] is the receiver of a bound call: the binder dispatches the
//! record's method name to it and, after the call, asks it for its
//! [`Invariants`]. Targets without invariants keep the default `None`.

use crate::value::{Callable, Value};
use crate::Result;

/// Receiver of a `call_with` invocation
pub trait Target {
    /// Owning type name used in diagnostics
    fn type_name(&self) -> &str;

    /// Run the named method with already-validated arguments
    fn dispatch(&mut self, method: &str, args: &[Value], callback: Option<&Callable>)
        -> Result<Value>;

    /// The invariant capability, when the target declares invariants
    fn invariants(&self) -> Option<&dyn Invariants> {
        None
    }
}

/// Object-level conditions re-checked after every guarded call
pub trait Invariants {
    /// Name of the first invariant that no longer holds
    fn failed_invariant(&self) -> Option<String>;
}

type Condition<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Named conditions over `T`, checked in declaration order
pub struct InvariantSet<T> {
    rules: Vec<(String, Condition<T>)>,
}

impl<T> InvariantSet<T> {
    pub fn new() -> Self {
        InvariantSet { rules: Vec::new() }
    }

    /// Add a named condition
    pub fn invariant<F>(mut self, name: impl Into<String>, condition: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.rules.push((name.into(), Box::new(condition)));
        self
    }

    /// Name of the first condition `target` fails
    pub fn first_failure(&self, target: &T) -> Option<&str> {
        self.rules
            .iter()
            .find(|(_, condition)| !condition(target))
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<T> Default for InvariantSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        count: i64,
        limit: i64,
    }

    fn rules() -> InvariantSet<Counter> {
        InvariantSet::new()
            .invariant("count_non_negative", |c: &Counter| c.count >= 0)
            .invariant("count_within_limit", |c: &Counter| c.count <= c.limit)
    }

    #[test]
    fn test_all_hold() {
        let counter = Counter { count: 3, limit: 5 };
        assert_eq!(rules().first_failure(&counter), None);
        assert_eq!(rules().len(), 2);
    }

    #[test]
    fn test_first_failure_in_declaration_order() {
        let counter = Counter {
            count: -1,
            limit: -2,
        };
        assert_eq!(rules().first_failure(&counter), Some("count_non_negative"));

        let counter = Counter { count: 9, limit: 5 };
        assert_eq!(rules().first_failure(&counter), Some("count_within_limit"));
    }

    #[test]
    fn test_empty_set() {
        let set: InvariantSet<Counter> = InvariantSet::default();
        assert!(set.is_empty());
        assert_eq!(set.first_failure(&Counter { count: 0, limit: 0 }), None);
    }
}
