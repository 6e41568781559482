//! Failure reporter — builds the diagnostic for a violation and decides what happens
//!
//! Every violation funnels through one [`FailureHandler`]. Lookup order:
//!
//! 1. pattern-matching records always use the default (raising) behavior
//! 2. the record's own handler ([`ContractRecord::with_failure_handler`])
//! 3. the process-wide handler ([`override_failure_callback`])
//! 4. the default: raise the matching [`Error`] variant
//!
//! [`ContractRecord::with_failure_handler`]: crate::ContractRecord::with_failure_handler

use std::fmt;
use std::panic::Location;
use std::sync::{Arc, RwLock};

use crate::record::Signature;
use crate::spec::ContractSpec;
use crate::value::Value;
use crate::{Error, Result};

// ── Report types ──────────────────────────────────────────

/// Where in the call the violation happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureLocation {
    /// 1-based argument position out of the caller's argument count
    Argument { position: usize, count: usize },
    /// The return value
    Return,
    /// A post-call invariant
    Invariant { name: String },
}

/// Everything known about one violation
#[derive(Debug, Clone)]
pub struct FailureReport {
    /// The offending value
    pub value: Value,
    /// The contract it failed
    pub contract: ContractSpec,
    /// Owning type, when known
    pub owner: Option<String>,
    /// Method or callable name
    pub target: String,
    /// The full signature of the guarded callable
    pub signature: Arc<Signature>,
    pub location: FailureLocation,
    pub pattern_match: bool,
    /// Where the guarded call was made from
    pub call_site: &'static Location<'static>,
}

impl FailureReport {
    /// `Owner::method`, or just the method without an owner
    pub fn guarded_in(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{}::{}", owner, self.target),
            None => self.target.clone(),
        }
    }

    /// The multi-line diagnostic raised by the default handler
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            FailureLocation::Argument { position, count } => writeln!(
                f,
                "Contract violation for argument {} of {}:",
                position, count
            )?,
            FailureLocation::Return => writeln!(f, "Contract violation for return value:")?,
            FailureLocation::Invariant { .. } => writeln!(f, "Invariant violation:")?,
        }
        match &self.location {
            FailureLocation::Invariant { name } => {
                writeln!(f, "    Expected: {} condition to be true", name)?
            }
            _ => writeln!(f, "    Expected: {},", self.contract)?,
        }
        writeln!(f, "    Actual: {}", self.value)?;
        writeln!(f, "    Value guarded in: {}", self.guarded_in())?;
        writeln!(f, "    With Contract: {}", self.signature)?;
        write!(f, "    At: {}", self.call_site)
    }
}

/// What the binder does after a handler returns normally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Stop processing this call; the guarded callable does not run
    Abort,
    /// Keep validating and run the call anyway
    Continue,
}

/// Receives every violation. Returning `Err` raises it to the caller.
pub trait FailureHandler: Send + Sync {
    fn on_failure(&self, report: &FailureReport) -> Result<Verdict>;
}

// ── Built-in handlers ─────────────────────────────────────

/// Raises the typed error for the report
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandler;

impl FailureHandler for DefaultHandler {
    fn on_failure(&self, report: &FailureReport) -> Result<Verdict> {
        Err(raise(report))
    }
}

/// Logs the violation at WARN and returns a fixed verdict
#[derive(Debug, Clone, Copy)]
pub struct LogHandler {
    verdict: Verdict,
}

impl LogHandler {
    pub fn new(verdict: Verdict) -> Self {
        LogHandler { verdict }
    }
}

impl Default for LogHandler {
    fn default() -> Self {
        Self::new(Verdict::Abort)
    }
}

impl FailureHandler for LogHandler {
    fn on_failure(&self, report: &FailureReport) -> Result<Verdict> {
        tracing::warn!(
            target: "covenant",
            guarded_in = %report.guarded_in(),
            location = ?report.location,
            expected = %report.contract,
            actual = %report.value,
            "contract violation suppressed"
        );
        Ok(self.verdict)
    }
}

struct FnHandler<F>(F);

impl<F> FailureHandler for FnHandler<F>
where
    F: Fn(&FailureReport) -> Result<Verdict> + Send + Sync,
{
    fn on_failure(&self, report: &FailureReport) -> Result<Verdict> {
        (self.0)(report)
    }
}

/// Adapt a closure into a handler
pub fn handler_fn<F>(f: F) -> Arc<dyn FailureHandler>
where
    F: Fn(&FailureReport) -> Result<Verdict> + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

/// The error the default behavior raises for a report
pub fn raise(report: &FailureReport) -> Error {
    let message = report.message();
    let boxed = Box::new(report.clone());
    match &report.location {
        FailureLocation::Argument { .. } if report.pattern_match => Error::PatternMatch {
            report: boxed,
            message,
        },
        FailureLocation::Argument { .. } => Error::ArgumentViolation {
            report: boxed,
            message,
        },
        FailureLocation::Return => Error::ReturnViolation {
            report: boxed,
            message,
        },
        FailureLocation::Invariant { .. } => Error::InvariantViolation {
            report: boxed,
            message,
        },
    }
}

// ── Process-wide handler ──────────────────────────────────

static FAILURE_HANDLER: RwLock<Option<Arc<dyn FailureHandler>>> = RwLock::new(None);

/// Replace the process-wide handler, returning the previous override
pub fn override_failure_callback(
    handler: Arc<dyn FailureHandler>,
) -> Option<Arc<dyn FailureHandler>> {
    let mut slot = FAILURE_HANDLER
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    slot.replace(handler)
}

/// Go back to raising on every violation
pub fn restore_default_failure_callback() {
    let mut slot = FAILURE_HANDLER
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = None;
}

fn current_handler() -> Option<Arc<dyn FailureHandler>> {
    FAILURE_HANDLER
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Route a report to whichever handler applies
pub(crate) fn dispatch(
    report: &FailureReport,
    record_handler: Option<&Arc<dyn FailureHandler>>,
) -> Result<Verdict> {
    tracing::debug!(
        target: "covenant",
        guarded_in = %report.guarded_in(),
        location = ?report.location,
        pattern_match = report.pattern_match,
        "contract violation"
    );

    if report.pattern_match {
        return DefaultHandler.on_failure(report);
    }
    match record_handler.cloned().or_else(current_handler) {
        Some(handler) => handler.on_failure(report),
        None => DefaultHandler.on_failure(report),
    }
}

// ── Tests ─────────────────────────────────────────────────
