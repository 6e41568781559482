//! Covenant Core - runtime contract verification for dynamically typed calls
//!
//! A contract states what a callable accepts and returns. Every guarded call
//! is checked against it before the callable runs, and the result is checked
//! afterwards.
//!
//! # Architecture
//!
//! ```text
//! ContractSpec ──compile──→ Validator          (once, at record construction)
//!      │
//!      ↓
//! ContractRecord = Signature + Callable
//!      │
//!      ↓ call / call_with
//! Call Binder → normalize actuals → forward/backward validation
//!      │                ↓ mismatch
//!      │         Failure Reporter → record handler | global handler | raise
//!      ↓
//! callable / Target::dispatch → return check → invariants
//!
//! Signature text → Parser → Declaration → Verifier   (diagnostics)
//!                                       → Normalizer (canonical text + SHA-256)
//! ```
//!
//! # Guarantees
//!
//! - **Compiled once**: validators and nested signatures are built at
//!   construction, never on the call path
//! - **Fail before side effects**: argument violations are reported before
//!   the guarded callable runs
//! - **Re-entrant**: no state is shared between calls except the
//!   process-wide failure handler
//!
//! # Example
//!
//! ```
//! use covenant_core::{Callable, ContractRecord, Value};
//!
//! let add = Callable::new("add", |args, _| {
//!     let sum = args.iter().filter_map(Value::as_i64).sum::<i64>();
//!     Ok(Value::Integer(sum))
//! });
//! let add = ContractRecord::from_signature(add, "Integer, Integer => Integer")?;
//!
//! assert_eq!(add.call(vec![2.into(), 3.into()], None)?, Value::Integer(5));
//! assert!(add.call(vec!["a".into(), 3.into()], None).is_err());
//! # Ok::<(), covenant_core::Error>(())
//! ```

pub mod binder;
pub mod error;
pub mod invariant;
pub mod normalizer;
pub mod overload;
pub mod parser;
pub mod record;
pub mod report;
pub mod spec;
pub mod validator;
pub mod value;
pub mod verifier;

pub use error::{Error, Result};
pub use invariant::{InvariantSet, Invariants, Target};
pub use overload::OverloadSet;
pub use parser::{parse, parse_spec, Declaration};
pub use record::{ContractRecord, Shape, Signature};
pub use report::{
    handler_fn, override_failure_callback, restore_default_failure_callback, DefaultHandler,
    FailureHandler, FailureLocation, FailureReport, LogHandler, Verdict,
};
pub use spec::{ContractSpec, FunctionSpec, Predicate, Refinement, Validate};
pub use validator::Validator;
pub use value::{Callable, ScalarType, Value};
pub use verifier::{verify, Diagnostic, DiagnosticKind, Severity, VerificationResult};
