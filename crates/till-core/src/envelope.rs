//! # Result Envelopes
//!
//! Every kernel operation that can fail for domain reasons crosses the
//! boundary as an `OperationResult` rather than a raw `Result`: hosts and
//! orchestrators get a uniform `{success, transaction?, errors[], warnings[]}`
//! shape regardless of transport.

use serde::{Deserialize, Serialize};

use crate::error::KernelError;
use crate::types::Transaction;

/// Uniform outcome of a kernel operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    pub transaction: Option<Transaction>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl OperationResult {
    /// A successful outcome carrying the post-operation snapshot.
    pub fn ok(transaction: Transaction) -> Self {
        OperationResult {
            success: true,
            transaction: Some(transaction),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// A failed outcome with one descriptive message.
    pub fn failed(error: &KernelError) -> Self {
        OperationResult {
            success: false,
            transaction: None,
            errors: vec![error.to_string()],
            warnings: Vec::new(),
        }
    }

    /// Attaches a warning without changing success.
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// First error message, for terse hosts.
    pub fn first_error(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }
}

impl From<Result<Transaction, KernelError>> for OperationResult {
    fn from(result: Result<Transaction, KernelError>) -> Self {
        match result {
            Ok(tx) => OperationResult::ok(tx),
            Err(e) => OperationResult::failed(&e),
        }
    }
}
