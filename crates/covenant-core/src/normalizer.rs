//! Canonical normalizer — one text form and one fingerprint per signature
//!
//! # Pipeline
//!
//! `signature text → parse → Declaration → canonical text → SHA-256`
//!
//! # Guarantees
//!
//! - **Idempotent**: `normalize(normalize(x)) == normalize(x)`
//! - **Deterministic**: mapping keys render in sorted order, spacing is fixed
//! - **Agrees with records**: the canonical text is what
//!   [`ContractRecord::describe`](crate::ContractRecord::describe) prints

use sha2::{Digest, Sha256};

use crate::parser::Declaration;
use crate::Result;

// ── Public API ─────────────────────────────────────────────

/// Normalize signature text to canonical form
///
/// # Errors
/// Returns `Error::Parse` for invalid input.
pub fn normalize(text: &str) -> Result<String> {
    let declaration = crate::parser::parse(text)?;
    Ok(canonical(&declaration))
}

/// Canonical text of a parsed declaration
pub fn canonical(declaration: &Declaration) -> String {
    declaration.to_string()
}

/// Lowercase hex SHA-256 of the canonical text
pub fn fingerprint(declaration: &Declaration) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical(declaration).as_bytes());
    let result = hasher.finalize();
    format!("{:x}", result)
}

/// Parse then fingerprint
pub fn fingerprint_text(text: &str) -> Result<String> {
    let declaration = crate::parser::parse(text)?;
    Ok(fingerprint(&declaration))
}
