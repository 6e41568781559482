//! Pattern-matching dispatch over several contract records
//!
//! Candidates are tried in registration order. A candidate whose arguments
//! do not fit raises [`Error::PatternMatch`], which moves dispatch on to the
//! next one. Any other outcome, success or error, ends dispatch.

use std::panic::Location;

use crate::invariant::Target;
use crate::record::ContractRecord;
use crate::value::{Callable, Value};
use crate::{Error, Result};

/// Ordered candidates sharing one method name
#[derive(Debug, Clone)]
pub struct OverloadSet {
    name: String,
    candidates: Vec<ContractRecord>,
}

impl OverloadSet {
    /// Build a set; every candidate is switched to pattern matching and
    /// renamed to `name`
    pub fn new(name: impl Into<String>, records: Vec<ContractRecord>) -> Result<Self> {
        let name = name.into();
        if records.is_empty() {
            return Err(Error::Construction(format!(
                "overload set '{}' needs at least one candidate",
                name
            )));
        }
        let mut set = OverloadSet {
            name,
            candidates: Vec::with_capacity(records.len()),
        };
        for record in records {
            set.push(record);
        }
        Ok(set)
    }

    /// Append a candidate after the existing ones
    pub fn push(&mut self, record: ContractRecord) {
        self.candidates
            .push(record.named(self.name.clone()).with_pattern_matching());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[ContractRecord] {
        &self.candidates
    }

    /// One signature per line, in dispatch order
    pub fn describe(&self) -> String {
        self.candidates
            .iter()
            .map(ContractRecord::describe)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Call the first candidate whose argument contracts fit
    #[track_caller]
    pub fn call(&self, args: Vec<Value>, callback: Option<Callable>) -> Result<Value> {
        let site = Location::caller();
        self.dispatch(|record| record.invoke(None, args.clone(), callback.clone(), site))
    }

    /// Like [`call`](Self::call) with a bound target
    #[track_caller]
    pub fn call_with(
        &self,
        target: &mut dyn Target,
        args: Vec<Value>,
        callback: Option<Callable>,
    ) -> Result<Value> {
        let site = Location::caller();
        self.dispatch(|record| {
            record.invoke(Some(&mut *target), args.clone(), callback.clone(), site)
        })
    }

    fn dispatch<F>(&self, mut attempt: F) -> Result<Value>
    where
        F: FnMut(&ContractRecord) -> Result<Value>,
    {
        let mut last = None;
        for (index, record) in self.candidates.iter().enumerate() {
            match attempt(record) {
                Err(Error::PatternMatch { report, message }) => {
                    tracing::trace!(
                        target: "covenant",
                        overload = %self.name,
                        candidate = index,
                        "candidate rejected"
                    );
                    last = Some((report, message));
                }
                outcome => return outcome,
            }
        }

        match last {
            Some((report, message)) => Err(Error::ArgumentViolation { report, message }),
            None => Err(Error::Construction(format!(
                "overload set '{}' has no candidates",
                self.name
            ))),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────
