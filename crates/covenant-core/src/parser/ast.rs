//! Parsed signature — argument and return contracts before compilation
//!
//! A [`Declaration`] is what the parser produces and what the verifier and
//! normalizer inspect. It renders exactly like
//! [`Signature::describe`](crate::Signature::describe).

use std::fmt;

use crate::spec::{write_signature, ContractSpec};

/// `arg1, arg2, ... => ret`, uncompiled
#[derive(Debug, Clone)]
pub struct Declaration {
    pub args: Vec<ContractSpec>,
    pub returns: ContractSpec,
}

impl Declaration {
    pub fn new(args: Vec<ContractSpec>, returns: ContractSpec) -> Self {
        Declaration { args, returns }
    }
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_signature(f, &self.args, &self.returns)
    }
}
