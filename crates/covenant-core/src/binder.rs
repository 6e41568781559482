//! Call binder — normalizes actual arguments, validates them and runs the call
//!
//! # Pipeline
//!
//! 1. Fold a supplied callback into the argument list
//! 2. Synthesize a null callback when a trailing function contract is unmet
//! 3. Synthesize an empty options mapping when the options slot is not a mapping
//! 4. Forward pass up to the variadic marker (or over every position)
//! 5. Backward pass from the end when a variadic marker exists
//! 6. Wrap function-typed arguments in nested records
//! 7. Split the callback back out and invoke
//! 8. Check the return value, then the target's invariants
//!
//! Every mismatch goes through the failure reporter. An argument failure the
//! handler answers with [`Verdict::Abort`] ends the call with `Value::Null`
//! before the guarded callable runs.

use std::panic::Location;
use std::sync::Arc;

use crate::invariant::Target;
use crate::record::{ContractRecord, Shape, Signature};
use crate::report::{self, FailureLocation, FailureReport, Verdict};
use crate::spec::ContractSpec;
use crate::value::{Callable, Value};
use crate::Result;

// ── Call binding ──────────────────────────────────────────

/// Actual arguments of one invocation
#[derive(Debug)]
struct CallBinding {
    args: Vec<Value>,
    /// Caller's argument count before normalization, callback included
    count: usize,
    /// The last slot holds the callback, or the null placeholder for it
    folded: bool,
}

impl CallBinding {
    fn new(shape: Shape, declared: usize, mut args: Vec<Value>, callback: Option<Callable>) -> Self {
        let supplied = callback.is_some();
        if let Some(callback) = callback {
            args.push(Value::Function(callback));
        }
        let count = args.len();

        let mut folded = supplied;
        if shape.trailing_function
            && !supplied
            && (shape.variadic.is_some() || args.len() < declared)
        {
            tracing::trace!(target: "covenant", "callback omitted, substituting nil");
            args.push(Value::Null);
            folded = true;
        }

        if let Some(index) = shape.options {
            if index + 1 == declared {
                if !matches!(args.last(), Some(Value::Object(_))) {
                    tracing::trace!(target: "covenant", "options omitted, substituting {{}}");
                    args.push(Value::empty_object());
                }
            } else {
                let slot = args.len().checked_sub(2).and_then(|i| args.get(i));
                if !matches!(slot, Some(Value::Object(_))) {
                    tracing::trace!(target: "covenant", "options omitted before callback, substituting {{}}");
                    let at = args.len().saturating_sub(1);
                    args.insert(at, Value::empty_object());
                }
            }
        }

        CallBinding {
            args,
            count,
            folded,
        }
    }

    /// The actual at `index`; a missing position reads as null
    fn actual(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or(Value::Null)
    }

    fn take_callback(&mut self) -> Option<Callable> {
        if !self.folded {
            return None;
        }
        match self.args.pop() {
            Some(Value::Function(callback)) => Some(callback),
            _ => None,
        }
    }
}

// ── Reporting context ─────────────────────────────────────

struct Reporter<'a> {
    record: &'a ContractRecord,
    owner: Option<String>,
    site: &'static Location<'static>,
}

impl Reporter<'_> {
    fn report(
        &self,
        value: Value,
        contract: ContractSpec,
        location: FailureLocation,
    ) -> Result<Verdict> {
        let report = FailureReport {
            value,
            contract,
            owner: self.owner.clone(),
            target: self.record.method.clone(),
            signature: Arc::clone(&self.record.signature),
            location,
            pattern_match: self.record.pattern_match,
            call_site: self.site,
        };
        report::dispatch(&report, self.record.handler.as_ref())
    }
}

// ── Entry points ──────────────────────────────────────────

impl ContractRecord {
    /// Validate `args` (and `callback`), invoke the guarded callable and
    /// validate its result
    #[track_caller]
    pub fn call(&self, args: Vec<Value>, callback: Option<Callable>) -> Result<Value> {
        self.invoke(None, args, callback, Location::caller())
    }

    /// Like [`call`](Self::call) but dispatches the record's method name to
    /// `target` and re-checks the target's invariants afterwards
    #[track_caller]
    pub fn call_with(
        &self,
        target: &mut dyn Target,
        args: Vec<Value>,
        callback: Option<Callable>,
    ) -> Result<Value> {
        self.invoke(Some(target), args, callback, Location::caller())
    }

    pub(crate) fn invoke(
        &self,
        mut target: Option<&mut dyn Target>,
        args: Vec<Value>,
        callback: Option<Callable>,
        site: &'static Location<'static>,
    ) -> Result<Value> {
        let owner = self
            .owner
            .clone()
            .or_else(|| target.as_deref().map(|t| t.type_name().to_string()));
        let reporter = Reporter {
            record: self,
            owner,
            site,
        };

        let signature = Arc::clone(&self.signature);
        let mut binding =
            CallBinding::new(signature.shape(), signature.args().len(), args, callback);
        if self.check_arguments(&signature, &mut binding, &reporter)? == Verdict::Abort {
            return Ok(Value::Null);
        }

        let callback = binding.take_callback();
        let result = match target.as_deref_mut() {
            Some(target) => target.dispatch(&self.method, &binding.args, callback.as_ref())?,
            None => self.callable.call(&binding.args, callback.as_ref())?,
        };

        // The call already happened: whatever the handler decides, the result stands
        if !signature.return_validator().check(&result) {
            reporter.report(
                result.clone(),
                signature.returns().clone(),
                FailureLocation::Return,
            )?;
        }

        let failed = target
            .as_deref()
            .and_then(|t| t.invariants())
            .and_then(|invariants| invariants.failed_invariant());
        if let Some(name) = failed {
            reporter.report(
                Value::Boolean(false),
                ContractSpec::exactly(true),
                FailureLocation::Invariant { name },
            )?;
        }

        Ok(match signature.nested_return() {
            Some(nested) => self.wrap(nested, result, site),
            None => result,
        })
    }

    // ── Argument validation ───────────────────────────────

    fn check_arguments(
        &self,
        signature: &Signature,
        binding: &mut CallBinding,
        reporter: &Reporter<'_>,
    ) -> Result<Verdict> {
        let declared = signature.args().len();
        let len = binding.args.len();
        let count = binding.count;

        // Forward: strictly positional up to the variadic marker
        let forward = signature.shape().variadic.unwrap_or(len.max(declared));
        for index in 0..forward {
            let actual = binding.actual(index);
            if !signature.validator(index).is_some_and(|v| v.check(&actual)) {
                let contract = signature
                    .args()
                    .get(index)
                    .cloned()
                    .unwrap_or(ContractSpec::Never);
                let location = FailureLocation::Argument {
                    position: index + 1,
                    count,
                };
                if reporter.report(actual, contract, location)? == Verdict::Abort {
                    return Ok(Verdict::Abort);
                }
            }
            self.wrap_at(binding, index, signature.nested(index), reporter.site);
        }

        let Some(variadic) = signature.shape().variadic else {
            return Ok(Verdict::Continue);
        };

        // Backward: trailing contracts first, then the variadic inner contract
        let trailing = declared - 1 - variadic;
        let available = len.saturating_sub(variadic);
        for offset in 0..available {
            let index = len - 1 - offset;
            let contract_index = if offset < trailing {
                declared - 1 - offset
            } else {
                variadic
            };
            let actual = binding.actual(index);
            if !signature
                .validator(contract_index)
                .is_some_and(|v| v.check(&actual))
            {
                let contract = if contract_index == variadic {
                    signature.variadic_inner()
                } else {
                    signature.args().get(contract_index)
                };
                let contract = contract.cloned().unwrap_or(ContractSpec::Never);
                let location = FailureLocation::Argument {
                    position: index + 1,
                    count,
                };
                if reporter.report(actual, contract, location)? == Verdict::Abort {
                    return Ok(Verdict::Abort);
                }
            }
            self.wrap_at(binding, index, signature.nested(contract_index), reporter.site);
        }

        // Trailing contracts the caller supplied nothing for
        let unfilled = (variadic + 1)..(declared - available.min(trailing));
        for (offset, contract_index) in unfilled.enumerate() {
            if signature
                .validator(contract_index)
                .is_some_and(|v| v.check(&Value::Null))
            {
                continue;
            }
            let contract = signature.args()[contract_index].clone();
            let location = FailureLocation::Argument {
                position: len + offset + 1,
                count,
            };
            if reporter.report(Value::Null, contract, location)? == Verdict::Abort {
                return Ok(Verdict::Abort);
            }
        }

        Ok(Verdict::Continue)
    }

    /// Replace a function-typed argument by one whose calls are checked
    fn wrap_at(
        &self,
        binding: &mut CallBinding,
        index: usize,
        nested: Option<&Arc<Signature>>,
        site: &'static Location<'static>,
    ) {
        let Some(nested) = nested else {
            return;
        };
        if let Some(Value::Function(callable)) = binding.args.get(index) {
            let wrapped = self.wrap(nested, Value::Function(callable.clone()), site);
            binding.args[index] = wrapped;
        }
    }

    fn wrap(&self, nested: &Arc<Signature>, value: Value, site: &'static Location<'static>) -> Value {
        match value {
            Value::Function(callable) => {
                Value::Function(self.nested(nested, callable, site).into_callable())
            }
            other => other,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariant::{InvariantSet, Invariants};
    use crate::report::{handler_fn, LogHandler};
    use crate::value::ScalarType;
    use crate::Error;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn int() -> ContractSpec {
        ContractSpec::from(ScalarType::Integer)
    }

    fn string() -> ContractSpec {
        ContractSpec::from(ScalarType::String)
    }

    fn sum() -> Callable {
        Callable::new("sum", |args, _| {
            args.iter()
                .map(|v| {
                    v.as_i64()
                        .ok_or_else(|| Error::Execution(format!("not an integer: {}", v)))
                })
                .sum::<Result<i64>>()
                .map(Value::Integer)
        })
    }

    fn record(args: Vec<ContractSpec>, returns: ContractSpec, callable: Callable) -> ContractRecord {
        ContractRecord::new(callable, args, Some(returns)).unwrap()
    }

    fn argument_location(err: &Error) -> FailureLocation {
        match err {
            Error::ArgumentViolation { report, .. } => report.location.clone(),
            other => panic!("expected an argument violation, got {:?}", other),
        }
    }

    /// Counts how often its body ran
    fn counting(counter: &Arc<AtomicUsize>, result: Value) -> Callable {
        let counter = Arc::clone(counter);
        Callable::new("counting", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(result.clone())
        })
    }

    // ── Positional ────────────────────────────────────────

    #[test]
    fn test_positional_success() {
        let add = record(vec![int(), int()], int(), sum());
        assert_eq!(add.call(vec![2.into(), 3.into()], None).unwrap(), Value::Integer(5));
    }

    #[test]
    fn test_positional_violation_reports_position() {
        let add = record(vec![int(), int()], int(), sum());
        let err = add.call(vec!["a".into(), 3.into()], None).unwrap_err();
        assert_eq!(
            argument_location(&err),
            FailureLocation::Argument {
                position: 1,
                count: 2
            }
        );
        assert!(err.to_string().starts_with("Contract violation for argument 1 of 2:"));
        assert!(err.to_string().contains("Actual: \"a\""));
    }

    #[test]
    fn test_call_site_is_the_caller() {
        let add = record(vec![int(), int()], int(), sum());
        let err = add.call(vec![1.into(), "b".into()], None).unwrap_err();
        assert!(err.report().unwrap().call_site.file().ends_with("binder.rs"));
    }

    #[test]
    fn test_surplus_argument_fails_against_none() {
        let id = record(vec![int()], int(), sum());
        let err = id.call(vec![1.into(), 2.into()], None).unwrap_err();
        assert_eq!(
            argument_location(&err),
            FailureLocation::Argument {
                position: 2,
                count: 2
            }
        );
        assert!(err.to_string().contains("Expected: None,"));
    }

    #[test]
    fn test_missing_argument_checked_as_null() {
        let add = record(vec![int(), ContractSpec::maybe(int())], int(), sum());
        assert_eq!(add.call(vec![4.into()], None).unwrap(), Value::Integer(4));

        let strict = record(vec![int(), int()], int(), sum());
        let err = strict.call(vec![4.into()], None).unwrap_err();
        assert_eq!(
            argument_location(&err),
            FailureLocation::Argument {
                position: 2,
                count: 1
            }
        );
    }

    // ── Variadic ──────────────────────────────────────────

    #[test]
    fn test_variadic_sum() {
        let total = record(vec![ContractSpec::variadic(int())], int(), sum());
        let args = vec![1.into(), 2.into(), 3.into(), 4.into()];
        assert_eq!(total.call(args, None).unwrap(), Value::Integer(10));
        assert_eq!(total.call(vec![], None).unwrap(), Value::Integer(0));
    }

    #[test]
    fn test_variadic_violation_position() {
        let total = record(vec![ContractSpec::variadic(int())], int(), sum());
        let err = total.call(vec![1.into(), "x".into(), 3.into()], None).unwrap_err();
        assert_eq!(
            argument_location(&err),
            FailureLocation::Argument {
                position: 2,
                count: 3
            }
        );
        assert!(err.to_string().contains("Expected: Integer,"));
    }

    #[test]
    fn test_variadic_with_leading_and_trailing_contracts() {
        let joined = Callable::new("joined", |args, _| Ok(Value::Integer(args.len() as i64)));
        let r = record(
            vec![int(), ContractSpec::variadic(string()), int()],
            int(),
            joined,
        );

        let ok = vec![1.into(), "a".into(), "b".into(), 2.into()];
        assert_eq!(r.call(ok, None).unwrap(), Value::Integer(4));
        assert_eq!(r.call(vec![1.into(), 2.into()], None).unwrap(), Value::Integer(2));

        let bad_middle = vec![1.into(), "a".into(), 3.into(), 2.into()];
        let err = r.call(bad_middle, None).unwrap_err();
        assert_eq!(
            argument_location(&err),
            FailureLocation::Argument {
                position: 3,
                count: 4
            }
        );

        let bad_last = vec![1.into(), "a".into(), "b".into()];
        let err = r.call(bad_last, None).unwrap_err();
        assert_eq!(
            argument_location(&err),
            FailureLocation::Argument {
                position: 3,
                count: 3
            }
        );
    }

    #[test]
    fn test_variadic_unfilled_trailing_contract() {
        let r = record(vec![int(), ContractSpec::variadic(string()), int()], int(), sum());
        let err = r.call(vec![1.into()], None).unwrap_err();
        assert!(matches!(err, Error::ArgumentViolation { .. }));
    }

    // ── Options mapping ───────────────────────────────────

    #[test]
    fn test_omitted_options_synthesized_and_checked() {
        let greet = Callable::new("greet", |args, _| match args.first() {
            Some(Value::Object(map)) => Ok(map.get("name").cloned().unwrap_or(Value::Null)),
            _ => Ok(Value::Null),
        });
        let r = record(vec![ContractSpec::mapping([("name", string())])], string(), greet);

        let err = r.call(vec![], None).unwrap_err();
        assert!(matches!(err, Error::ArgumentViolation { .. }));
        assert!(err.to_string().contains("Actual: {}"));

        let mut options = BTreeMap::new();
        options.insert("name".to_string(), Value::from("ada"));
        assert_eq!(
            r.call(vec![Value::Object(options)], None).unwrap(),
            Value::from("ada")
        );
    }

    #[test]
    fn test_options_inserted_before_callback() {
        let seen = Callable::new("seen", |args, callback| {
            Ok(Value::Array(vec![
                Value::Integer(args.len() as i64),
                args.get(1).cloned().unwrap_or(Value::Null),
                Value::Boolean(callback.is_some()),
            ]))
        });
        let options = ContractSpec::mapping([("verbose", ContractSpec::maybe(ScalarType::Bool))]);
        let callback = ContractSpec::maybe(ContractSpec::function([int()], int()));
        let r = record(vec![int(), options, callback], ContractSpec::from(ScalarType::Any), seen);

        let result = r.call(vec![1.into()], None).unwrap();
        assert_eq!(
            result,
            Value::Array(vec![
                Value::Integer(2),
                Value::empty_object(),
                Value::Boolean(false)
            ])
        );

        let block = Callable::new("block", |args, _| Ok(args[0].clone()));
        let result = r.call(vec![1.into()], Some(block)).unwrap();
        assert_eq!(
            result,
            Value::Array(vec![
                Value::Integer(2),
                Value::empty_object(),
                Value::Boolean(true)
            ])
        );
    }

    // ── Function contracts ────────────────────────────────

    #[test]
    fn test_trailing_callable_type_is_a_callback() {
        let callback = ContractSpec::maybe(ScalarType::Callable);
        let r = record(vec![ContractSpec::variadic(int()), callback], int(), sum());
        let args = vec![1.into(), 2.into(), 3.into()];
        assert_eq!(r.call(args, None).unwrap(), Value::Integer(6));

        let block = Callable::new("block", |_, _| Ok(Value::Null));
        assert_eq!(r.call(vec![4.into()], Some(block)).unwrap(), Value::Integer(4));
    }

    #[test]
    fn test_missing_callback_placeholder_fails() {
        let apply = record(
            vec![ContractSpec::function([int()], int())],
            int(),
            sum(),
        );
        let err = apply.call(vec![], None).unwrap_err();
        assert_eq!(
            argument_location(&err),
            FailureLocation::Argument {
                position: 1,
                count: 0
            }
        );
        assert!(err.to_string().contains("Actual: nil"));
    }

    #[test]
    fn test_optional_callback_placeholder_passes() {
        let probe = Callable::new("probe", |args, callback| {
            Ok(Value::Array(vec![
                Value::Integer(args.len() as i64),
                Value::Boolean(callback.is_some()),
            ]))
        });
        let r = record(
            vec![int(), ContractSpec::maybe(ContractSpec::function([int()], int()))],
            ContractSpec::from(ScalarType::Array),
            probe,
        );
        let result = r.call(vec![7.into()], None).unwrap();
        assert_eq!(
            result,
            Value::Array(vec![Value::Integer(1), Value::Boolean(false)])
        );
    }

    #[test]
    fn test_callback_is_wrapped_and_checked_before_body() {
        let counter = Arc::new(AtomicUsize::new(0));
        let inner = counting(&counter, Value::Integer(1));
        let apply = Callable::new("apply", |args, callback| match callback {
            Some(cb) => cb.call(args, None),
            None => Ok(Value::Null),
        });
        let r = record(
            vec![ContractSpec::variadic(ContractSpec::from(ScalarType::Any)), ContractSpec::function([int()], int())],
            int(),
            apply,
        );

        assert_eq!(r.call(vec![5.into()], Some(inner.clone())).unwrap(), Value::Integer(1));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let err = r.call(vec!["five".into()], Some(inner)).unwrap_err();
        assert!(matches!(err, Error::ArgumentViolation { .. }));
        assert_eq!(counter.load(Ordering::SeqCst), 1, "callback body must not run");
    }

    #[test]
    fn test_positional_function_argument_is_wrapped() {
        let counter = Arc::new(AtomicUsize::new(0));
        let f = counting(&counter, Value::from("not an integer"));
        let apply = Callable::new("apply", |args, _| match args.first() {
            Some(Value::Function(f)) => f.call(&[Value::Integer(1)], None),
            _ => Ok(Value::Null),
        });
        let r = record(
            vec![ContractSpec::function([int()], int())],
            ContractSpec::from(ScalarType::Any),
            apply,
        );
        let err = r.call(vec![f.into()], None).unwrap_err();
        assert!(matches!(err, Error::ReturnViolation { .. }));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wrapped_callback_reports_outer_call_site() {
        let apply = Callable::new("apply", |args, _| match args.first() {
            Some(Value::Function(f)) => f.call(&[Value::from("x")], None),
            _ => Ok(Value::Null),
        });
        let r = record(
            vec![ContractSpec::function([int()], int())],
            ContractSpec::from(ScalarType::Any),
            apply,
        );
        let line = line!() + 1;
        let err = r.call(vec![sum().into()], None).unwrap_err();
        let site = err.report().unwrap().call_site;
        assert!(site.file().ends_with("binder.rs"));
        assert_eq!(site.line(), line);
    }

    #[test]
    fn test_function_result_is_wrapped() {
        let make = Callable::new("make", |_, _| Ok(Value::Function(sum())));
        let r = record(vec![], ContractSpec::function([int()], int()), make);
        let produced = r.call(vec![], None).unwrap();
        let f = produced.as_callable().unwrap();
        assert_eq!(f.call(&[Value::Integer(3)], None).unwrap(), Value::Integer(3));
        assert!(matches!(
            f.call(&[Value::from("x")], None),
            Err(Error::ArgumentViolation { .. })
        ));
    }

    #[test]
    fn test_supplied_callback_without_contract_is_surplus() {
        let r = record(vec![int()], int(), sum());
        let cb = Callable::new("cb", |_, _| Ok(Value::Null));
        let err = r.call(vec![1.into()], Some(cb)).unwrap_err();
        assert_eq!(
            argument_location(&err),
            FailureLocation::Argument {
                position: 2,
                count: 2
            }
        );
    }

    // ── Handlers ──────────────────────────────────────────

    #[test]
    fn test_suppressed_argument_violation_skips_call() {
        let counter = Arc::new(AtomicUsize::new(0));
        let r = record(vec![int()], int(), counting(&counter, Value::Integer(1)))
            .with_failure_handler(Arc::new(LogHandler::default()));
        assert_eq!(r.call(vec!["a".into()], None).unwrap(), Value::Null);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_suppressed_return_violation_keeps_result() {
        let counter = Arc::new(AtomicUsize::new(0));
        let r = record(vec![], int(), counting(&counter, Value::from("oops")))
            .with_failure_handler(Arc::new(LogHandler::default()));
        assert_eq!(r.call(vec![], None).unwrap(), Value::from("oops"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_continue_verdict_runs_call() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_handler = Arc::clone(&seen);
        let r = record(vec![int(), int()], int(), counting(&counter, Value::Integer(0)))
            .with_failure_handler(handler_fn(move |_| {
                seen_in_handler.fetch_add(1, Ordering::SeqCst);
                Ok(Verdict::Continue)
            }));
        r.call(vec!["a".into(), "b".into()], None).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pattern_matching_raises_despite_handler() {
        let r = record(vec![int()], int(), sum())
            .with_pattern_matching()
            .with_failure_handler(Arc::new(LogHandler::default()));
        let err = r.call(vec!["a".into()], None).unwrap_err();
        assert!(matches!(err, Error::PatternMatch { .. }));
    }

    #[test]
    fn test_callable_errors_propagate() {
        let fails = Callable::new("fails", |_, _| Err(Error::Execution("boom".into())));
        let r = record(vec![], int(), fails);
        assert!(matches!(r.call(vec![], None), Err(Error::Execution(_))));
    }

    // ── Bound targets & invariants ────────────────────────

    struct Account {
        balance: i64,
    }

    fn account_rules() -> InvariantSet<Account> {
        InvariantSet::new().invariant("balance_non_negative", |a: &Account| a.balance >= 0)
    }

    impl Invariants for Account {
        fn failed_invariant(&self) -> Option<String> {
            account_rules().first_failure(self).map(str::to_owned)
        }
    }

    impl Target for Account {
        fn type_name(&self) -> &str {
            "Account"
        }

        fn dispatch(
            &mut self,
            method: &str,
            args: &[Value],
            _callback: Option<&Callable>,
        ) -> Result<Value> {
            match (method, args.first().and_then(Value::as_i64)) {
                ("withdraw", Some(amount)) => {
                    self.balance -= amount;
                    Ok(Value::Integer(self.balance))
                }
                ("peek", _) => Ok(Value::from("not a number")),
                _ => Err(Error::Execution(format!("no method {}", method))),
            }
        }

        fn invariants(&self) -> Option<&dyn Invariants> {
            Some(self)
        }
    }

    fn withdraw() -> ContractRecord {
        let unused = Callable::new("withdraw", |_, _| Ok(Value::Null));
        record(vec![ContractSpec::from(crate::spec::Refinement::Pos)], int(), unused)
    }

    #[test]
    fn test_call_with_dispatches_to_target() {
        let mut account = Account { balance: 100 };
        let result = withdraw().call_with(&mut account, vec![40.into()], None).unwrap();
        assert_eq!(result, Value::Integer(60));
        assert_eq!(account.balance, 60);
    }

    #[test]
    fn test_invariant_violation_after_call() {
        let mut account = Account { balance: 100 };
        let err = withdraw()
            .call_with(&mut account, vec![500.into()], None)
            .unwrap_err();
        match err {
            Error::InvariantViolation { report, message } => {
                assert_eq!(
                    report.location,
                    FailureLocation::Invariant {
                        name: "balance_non_negative".into()
                    }
                );
                assert!(message.contains("Value guarded in: Account::withdraw"));
            }
            other => panic!("expected invariant violation, got {:?}", other),
        }
        // The call itself is not undone
        assert_eq!(account.balance, -400);
    }

    #[test]
    fn test_aborted_argument_violation_skips_invariants() {
        let mut account = Account { balance: -5 };
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_handler = Arc::clone(&seen);
        let r = withdraw().with_failure_handler(handler_fn(move |_| {
            seen_in_handler.fetch_add(1, Ordering::SeqCst);
            Ok(Verdict::Abort)
        }));
        let result = r.call_with(&mut account, vec![(-1).into()], None).unwrap();
        assert_eq!(result, Value::Null);
        assert_eq!(seen.load(Ordering::SeqCst), 1, "only the argument failure is reported");
        assert_eq!(account.balance, -5);
    }

    #[test]
    fn test_return_checked_before_invariants() {
        let mut account = Account { balance: -1 };
        let peek = record(vec![], int(), Callable::new("peek", |_, _| Ok(Value::Null))).named("peek");
        let err = peek.call_with(&mut account, vec![], None).unwrap_err();
        assert!(matches!(err, Error::ReturnViolation { .. }));
    }

    #[test]
    fn test_owner_defaults_to_target_type() {
        let mut account = Account { balance: 1 };
        let err = withdraw()
            .call_with(&mut account, vec![0.into()], None)
            .unwrap_err();
        assert_eq!(err.report().unwrap().owner.as_deref(), Some("Account"));
    }
}
