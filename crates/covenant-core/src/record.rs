//! Contract records — the full signature attached to one callable
//!
//! A [`Signature`] is the compiled, immutable half: argument and return
//! specs, their validators, the derived shape and the nested signatures of
//! function-typed positions. It is built once and shared through `Arc`, so
//! the records that wrap callbacks at call time never recompile anything.
//!
//! A [`ContractRecord`] pairs a signature with the callable it guards plus
//! the reporting options (owner, method name, pattern matching, handler).

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::report::FailureHandler;
use crate::spec::{write_signature, ContractSpec};
use crate::validator::Validator;
use crate::value::Callable;
use crate::{Error, Result};

// ── Shape ─────────────────────────────────────────────────

/// Positional layout derived from the argument contracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Shape {
    /// Index of the variadic marker, if any
    pub variadic: Option<usize>,
    /// The last argument contract is a function (an optional callback)
    pub trailing_function: bool,
    /// Index of a trailing options mapping: the last contract, or the
    /// second-to-last when the last is a function
    pub options: Option<usize>,
}

impl Shape {
    fn classify(args: &[ContractSpec]) -> Result<Self> {
        let mut variadic = None;
        for (i, spec) in args.iter().enumerate() {
            if spec.is_variadic() {
                if let Some(first) = variadic {
                    return Err(Error::Construction(format!(
                        "at most one variadic marker is allowed, found positions {} and {}",
                        first + 1,
                        i + 1
                    )));
                }
                variadic = Some(i);
            }
        }

        let trailing_function = args.last().is_some_and(ContractSpec::is_function);
        let options = match args.len() {
            0 => None,
            n if trailing_function => n
                .checked_sub(2)
                .filter(|&i| args[i].is_options()),
            n => Some(n - 1).filter(|&i| args[i].is_options()),
        };

        Ok(Shape {
            variadic,
            trailing_function,
            options,
        })
    }
}

// ── Signature ─────────────────────────────────────────────

/// Compiled argument and return contracts
pub struct Signature {
    args: Vec<ContractSpec>,
    returns: ContractSpec,
    validators: Vec<Validator>,
    return_validator: Validator,
    nested: Vec<Option<Arc<Signature>>>,
    nested_return: Option<Arc<Signature>>,
    shape: Shape,
}

impl Signature {
    /// Compile argument and return contracts; nested function contracts
    /// are compiled here too
    pub fn compile(args: Vec<ContractSpec>, returns: ContractSpec) -> Result<Self> {
        let shape = Shape::classify(&args)?;
        let validators = args.iter().map(Validator::compile).collect();
        let nested = args
            .iter()
            .map(nested_signature)
            .collect::<Result<Vec<_>>>()?;
        let nested_return = nested_signature(&returns)?;
        let return_validator = Validator::compile(&returns);

        Ok(Signature {
            args,
            returns,
            validators,
            return_validator,
            nested,
            nested_return,
            shape,
        })
    }

    pub fn args(&self) -> &[ContractSpec] {
        &self.args
    }

    pub fn returns(&self) -> &ContractSpec {
        &self.returns
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// `arg1, arg2, ... => ret`
    pub fn describe(&self) -> String {
        self.to_string()
    }

    pub(crate) fn validator(&self, index: usize) -> Option<&Validator> {
        self.validators.get(index)
    }

    pub(crate) fn return_validator(&self) -> &Validator {
        &self.return_validator
    }

    pub(crate) fn nested(&self, index: usize) -> Option<&Arc<Signature>> {
        self.nested.get(index).and_then(Option::as_ref)
    }

    pub(crate) fn nested_return(&self) -> Option<&Arc<Signature>> {
        self.nested_return.as_ref()
    }

    /// The contract each variadic-matched value is checked against
    pub(crate) fn variadic_inner(&self) -> Option<&ContractSpec> {
        let index = self.shape.variadic?;
        match &self.args[index] {
            ContractSpec::Variadic(inner) => Some(inner),
            other => Some(other),
        }
    }
}

fn nested_signature(spec: &ContractSpec) -> Result<Option<Arc<Signature>>> {
    spec.function_spec()
        .map(|f| Signature::compile(f.args.clone(), f.returns.clone()).map(Arc::new))
        .transpose()
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_signature(f, &self.args, &self.returns)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

// ── Contract record ───────────────────────────────────────

/// A callable together with the contracts every call to it must satisfy
#[derive(Clone)]
pub struct ContractRecord {
    pub(crate) signature: Arc<Signature>,
    pub(crate) callable: Callable,
    pub(crate) owner: Option<String>,
    pub(crate) method: String,
    pub(crate) pattern_match: bool,
    pub(crate) handler: Option<Arc<dyn FailureHandler>>,
    /// Call site reported for calls that arrive through a wrapped callable
    pub(crate) site: Option<&'static Location<'static>>,
}

impl ContractRecord {
    /// Build a record. Fails when no return contract is given or when the
    /// arguments carry more than one variadic marker.
    pub fn new(
        callable: Callable,
        args: Vec<ContractSpec>,
        returns: Option<ContractSpec>,
    ) -> Result<Self> {
        let returns = returns.ok_or_else(|| {
            Error::Construction(format!(
                "contract for '{}' declares no return contract",
                callable.name()
            ))
        })?;
        let signature = Signature::compile(args, returns)?;
        Ok(Self::from_compiled(Arc::new(signature), callable))
    }

    /// Build a record from signature text such as `Integer, Integer => Integer`
    pub fn from_signature(callable: Callable, text: &str) -> Result<Self> {
        let declaration = crate::parser::parse(text)?;
        Self::new(callable, declaration.args, Some(declaration.returns))
    }

    pub(crate) fn from_compiled(signature: Arc<Signature>, callable: Callable) -> Self {
        let method = callable.name().to_string();
        ContractRecord {
            signature,
            callable,
            owner: None,
            method,
            pattern_match: false,
            handler: None,
            site: None,
        }
    }

    /// Type name shown as `Owner::method` in diagnostics
    pub fn owned_by(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Method name used for diagnostics and for dispatch on a bound target
    pub fn named(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Mark as a pattern-matching contract: argument failures raise
    /// [`Error::PatternMatch`] so an overload set can try the next candidate
    pub fn with_pattern_matching(mut self) -> Self {
        self.pattern_match = true;
        self
    }

    /// Report this record's failures to `handler` instead of the
    /// process-wide one
    pub fn with_failure_handler(mut self, handler: Arc<dyn FailureHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn signature(&self) -> &Arc<Signature> {
        &self.signature
    }

    pub fn callable(&self) -> &Callable {
        &self.callable
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn is_pattern_match(&self) -> bool {
        self.pattern_match
    }

    /// `arg1, arg2, ... => ret`
    pub fn describe(&self) -> String {
        self.signature.describe()
    }

    /// A callable that routes every call through this record
    ///
    /// Violations raised through it report the place `into_callable` was
    /// called from. Callables wrapped by the binder report the outer call.
    #[track_caller]
    pub fn into_callable(self) -> Callable {
        let name = self.callable.name().to_string();
        let site = match self.site {
            Some(site) => site,
            None => Location::caller(),
        };
        let record = Arc::new(self);
        Callable::new(name, move |args, callback| {
            record.invoke(None, args.to_vec(), callback.cloned(), site)
        })
    }

    /// Guard `callable` with `signature`, inheriting this record's owner and
    /// handler and reporting `site` as the call site
    pub(crate) fn nested(
        &self,
        signature: &Arc<Signature>,
        callable: Callable,
        site: &'static Location<'static>,
    ) -> Self {
        ContractRecord {
            owner: self.owner.clone(),
            handler: self.handler.clone(),
            site: Some(site),
            ..Self::from_compiled(Arc::clone(signature), callable)
        }
    }
}

impl fmt::Debug for ContractRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractRecord")
            .field("method", &self.method)
            .field("owner", &self.owner)
            .field("signature", &self.signature.describe())
            .field("pattern_match", &self.pattern_match)
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ScalarType, Value};

    fn int() -> ContractSpec {
        ContractSpec::from(ScalarType::Integer)
    }

    fn noop() -> Callable {
        Callable::new("noop", |_, _| Ok(Value::Null))
    }

    #[test]
    fn test_construction_requires_return_contract() {
        let err = ContractRecord::new(noop(), vec![int()], None).unwrap_err();
        assert!(matches!(err, Error::Construction(_)));
        assert!(ContractRecord::new(noop(), vec![int()], Some(int())).is_ok());
    }

    #[test]
    fn test_construction_rejects_two_variadics() {
        let args = vec![ContractSpec::variadic(int()), ContractSpec::variadic(int())];
        let err = ContractRecord::new(noop(), args, Some(int())).unwrap_err();
        assert!(err.to_string().contains("at most one variadic"));
    }

    #[test]
    fn test_nested_function_with_two_variadics_rejected() {
        let inner = ContractSpec::function(
            [ContractSpec::variadic(int()), ContractSpec::variadic(int())],
            int(),
        );
        assert!(ContractRecord::new(noop(), vec![inner], Some(int())).is_err());
    }

    #[test]
    fn test_shape_variadic_position() {
        let args = vec![int(), ContractSpec::variadic(int()), int()];
        let record = ContractRecord::new(noop(), args, Some(int())).unwrap();
        assert_eq!(record.signature().shape().variadic, Some(1));
        assert!(!record.signature().shape().trailing_function);
    }

    #[test]
    fn test_shape_trailing_function_and_options() {
        let options = ContractSpec::mapping([("verbose", ContractSpec::from(ScalarType::Bool))]);
        let callback = ContractSpec::function([int()], int());

        let args = vec![int(), options.clone(), callback.clone()];
        let shape = Shape::classify(&args).unwrap();
        assert!(shape.trailing_function);
        assert_eq!(shape.options, Some(1));

        let shape = Shape::classify(&[int(), options.clone()]).unwrap();
        assert!(!shape.trailing_function);
        assert_eq!(shape.options, Some(1));

        let shape = Shape::classify(&[options, int()]).unwrap();
        assert_eq!(shape.options, None);

        let shape = Shape::classify(&[ContractSpec::maybe(callback)]).unwrap();
        assert!(shape.trailing_function);
        assert_eq!(shape.options, None);
    }

    #[test]
    fn test_describe_format() {
        let args = vec![int(), ContractSpec::variadic(ContractSpec::from(ScalarType::String))];
        let record = ContractRecord::new(noop(), args, Some(int())).unwrap();
        assert_eq!(record.describe(), "Integer, Args[String] => Integer");

        let record = ContractRecord::new(noop(), vec![], Some(int())).unwrap();
        assert_eq!(record.describe(), "=> Integer");
    }

    #[test]
    fn test_describe_is_stable() {
        let args = vec![ContractSpec::mapping([("name", ContractSpec::from(ScalarType::String))])];
        let record = ContractRecord::new(noop(), args, Some(int())).unwrap();
        let first = record.describe();
        for _ in 0..100 {
            assert_eq!(record.describe(), first);
        }
    }

    #[test]
    fn test_nested_signatures_compiled_once() {
        let callback = ContractSpec::function([int()], int());
        let record = ContractRecord::new(noop(), vec![callback], Some(int())).unwrap();
        let first = record.signature().nested(0).cloned().unwrap();
        let again = record.signature().nested(0).cloned().unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(first.describe(), "Integer => Integer");
    }

    #[test]
    fn test_builder_options() {
        let record = ContractRecord::new(noop(), vec![], Some(int()))
            .unwrap()
            .owned_by("Calculator")
            .named("total")
            .with_pattern_matching();
        assert_eq!(record.owner(), Some("Calculator"));
        assert_eq!(record.method(), "total");
        assert!(record.is_pattern_match());
    }

    #[test]
    fn test_from_signature_text() {
        let record = ContractRecord::from_signature(noop(), "Integer, Integer => Integer").unwrap();
        assert_eq!(record.signature().args().len(), 2);
        assert!(ContractRecord::from_signature(noop(), "Integer Integer").is_err());
    }

    #[test]
    fn test_into_callable_reports_creation_site() {
        let any = ContractSpec::from(ScalarType::Any);
        let record = ContractRecord::new(noop(), vec![int()], Some(any)).unwrap();
        let line = line!() + 1;
        let guarded = record.into_callable();
        let err = guarded.call(&[Value::from("x")], None).unwrap_err();
        let site = err.report().unwrap().call_site;
        assert!(site.file().ends_with("record.rs"));
        assert_eq!(site.line(), line);
    }
}
