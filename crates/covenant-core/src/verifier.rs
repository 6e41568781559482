//! Signature verifier — well-formedness checks over a parsed declaration
//!
//! A signature can compile and still be wrong: a variadic buried inside a
//! tuple never matches anything positional, an empty `Or` rejects every
//! value. The verifier walks the declaration and accumulates every
//! diagnostic rather than stopping at the first.
//!
//! # Checks
//!
//! 1. **Variadic placement** — at most one per argument list, never nested
//!    inside another contract or used as a return contract
//! 2. **Satisfiability** — `Or`, `And` and `Enum` need at least one member
//! 3. **Redundancy** (warnings) — `None` as an argument, duplicate `Enum`
//!    members, `Maybe[Maybe[..]]`

use serde::Serialize;

use crate::parser::Declaration;
use crate::spec::ContractSpec;

// ── Verification Result Types ─────────────────────────────

/// Result of verification — accumulates all diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct VerificationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl VerificationResult {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    /// Returns true if no errors were found (warnings are OK)
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    /// Returns only error-level diagnostics
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .collect()
    }

    /// Returns only warning-level diagnostics
    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .collect()
    }

    fn push(&mut self, severity: Severity, kind: DiagnosticKind, path: &Path, message: String) {
        self.diagnostics.push(Diagnostic {
            severity,
            kind,
            location: path.render(),
            message,
        });
    }

    fn add_error(&mut self, kind: DiagnosticKind, path: &Path, message: String) {
        self.push(Severity::Error, kind, path, message);
    }

    fn add_warning(&mut self, kind: DiagnosticKind, path: &Path, message: String) {
        self.push(Severity::Warning, kind, path, message);
    }
}

impl Default for VerificationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// A single verification diagnostic
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// Where in the signature, e.g. `argument 2 > Or member 1`
    pub location: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{} [{}] at {}: {}", prefix, self.kind, self.location, self.message)
    }
}

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Category of verification issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    VariadicPlacement,
    Unsatisfiable,
    Redundant,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DiagnosticKind::VariadicPlacement => write!(f, "variadic"),
            DiagnosticKind::Unsatisfiable => write!(f, "unsatisfiable"),
            DiagnosticKind::Redundant => write!(f, "redundant"),
        }
    }
}

// ── Location paths ────────────────────────────────────────

#[derive(Clone)]
struct Path(Vec<String>);

impl Path {
    fn root(segment: impl Into<String>) -> Self {
        Path(vec![segment.into()])
    }

    fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Path(segments)
    }

    fn render(&self) -> String {
        self.0.join(" > ")
    }
}

// ── Public API ────────────────────────────────────────────

/// Verify a parsed declaration.
///
/// Does not stop at first error — reports everything found.
pub fn verify(declaration: &Declaration) -> VerificationResult {
    let mut result = VerificationResult::new();
    verify_arguments(&declaration.args, None, &mut result);
    verify_spec(&declaration.returns, &Path::root("return"), true, &mut result);
    result
}

/// Parse and verify signature text
pub fn verify_text(text: &str) -> crate::Result<VerificationResult> {
    let declaration = crate::parser::parse(text)?;
    Ok(verify(&declaration))
}

// ── Argument lists ────────────────────────────────────────

/// One argument list: the top-level signature (no owner) or a `Func[..]`'s arguments
fn verify_arguments(args: &[ContractSpec], owner: Option<&Path>, result: &mut VerificationResult) {
    let mut variadic_seen = false;

    for (i, spec) in args.iter().enumerate() {
        let segment = format!("argument {}", i + 1);
        let path = match owner {
            Some(owner) => owner.child(segment),
            None => Path::root(segment),
        };

        if spec.is_variadic() {
            if variadic_seen {
                result.add_error(
                    DiagnosticKind::VariadicPlacement,
                    &path,
                    "more than one variadic marker in one argument list".to_string(),
                );
            }
            variadic_seen = true;
        }

        if matches!(spec, ContractSpec::Never) {
            result.add_warning(
                DiagnosticKind::Redundant,
                &path,
                "argument contract None rejects every value".to_string(),
            );
        }

        verify_spec(spec, &path, false, result);
    }
}

// ── Contract tree ─────────────────────────────────────────

fn verify_spec(spec: &ContractSpec, path: &Path, nested: bool, result: &mut VerificationResult) {
    match spec {
        ContractSpec::Variadic(inner) => {
            if nested {
                result.add_error(
                    DiagnosticKind::VariadicPlacement,
                    path,
                    format!("{} is only meaningful as an argument contract", spec),
                );
            }
            verify_spec(inner, &path.child("Args"), true, result);
        }
        ContractSpec::AnyOf(specs) | ContractSpec::AllOf(specs) => {
            let name = if matches!(spec, ContractSpec::AnyOf(_)) {
                "Or"
            } else {
                "And"
            };
            if specs.is_empty() {
                result.add_error(
                    DiagnosticKind::Unsatisfiable,
                    path,
                    format!("{}[] has no members", name),
                );
            }
            for (i, member) in specs.iter().enumerate() {
                verify_spec(member, &path.child(format!("{} member {}", name, i + 1)), true, result);
            }
        }
        ContractSpec::OneOf(values) => {
            if values.is_empty() {
                result.add_error(
                    DiagnosticKind::Unsatisfiable,
                    path,
                    "Enum[] has no members".to_string(),
                );
            }
            for (i, value) in values.iter().enumerate() {
                if values[..i].contains(value) {
                    result.add_warning(
                        DiagnosticKind::Redundant,
                        path,
                        format!("duplicate Enum member {}", value),
                    );
                }
            }
        }
        ContractSpec::Maybe(inner) => {
            if matches!(**inner, ContractSpec::Maybe(_)) {
                result.add_warning(
                    DiagnosticKind::Redundant,
                    path,
                    format!("{} is the same as {}", spec, inner),
                );
            }
            verify_spec(inner, &path.child("Maybe"), true, result);
        }
        ContractSpec::Not(inner) => verify_spec(inner, &path.child("Not"), true, result),
        ContractSpec::ListOf(inner) => verify_spec(inner, &path.child("ArrayOf"), true, result),
        ContractSpec::MapOf(key, value) => {
            verify_spec(key, &path.child("HashOf key"), true, result);
            verify_spec(value, &path.child("HashOf value"), true, result);
        }
        ContractSpec::Tuple(specs) => {
            for (i, item) in specs.iter().enumerate() {
                verify_spec(item, &path.child(format!("element {}", i + 1)), true, result);
            }
        }
        ContractSpec::Mapping(pairs) | ContractSpec::Keywords(pairs) => {
            for (key, item) in pairs {
                verify_spec(item, &path.child(format!("key {}", key)), true, result);
            }
        }
        ContractSpec::Function(function) => {
            let func = path.child("Func");
            verify_arguments(&function.args, Some(&func), result);
            verify_spec(&function.returns, &func.child("return"), true, result);
        }
        ContractSpec::Type(_)
        | ContractSpec::Refined(_)
        | ContractSpec::Exactly(_)
        | ContractSpec::Predicate(_)
        | ContractSpec::Custom(_)
        | ContractSpec::Never => {}
    }
}
