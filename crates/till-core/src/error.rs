//! # Kernel Error Taxonomy
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Failure Routing                                    │
//! │                                                                         │
//! │  ConfigurationMissing ──► throw at the boundary, host must reconfigure  │
//! │  All other KernelError ──► result envelope {success: false, errors[]}   │
//! │  Financial integrity   ──► panic! (programmer error, never swallowed)   │
//! │                                                                         │
//! │  There is NO error variant for a broken invariant: a transaction whose  │
//! │  stored totals disagree with its lines is corrupt, and corruption is    │
//! │  not a domain outcome.                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (session id, tender, modifier)
//! 3. Errors are enum variants, never bare strings
//! 4. Each variant maps to one meaning in the failure taxonomy ([`ErrorKind`])

use rust_decimal::Decimal;
use thiserror::Error;

use crate::ids::{LineItemId, SessionId, TransactionId};
use crate::types::TransactionState;

// =============================================================================
// Kernel Error
// =============================================================================

/// Kernel operation errors.
///
/// Every variant is a *domain outcome*: it crosses the kernel boundary as a
/// result envelope with `success = false`. The single exception is
/// [`KernelError::ConfigurationMissing`], which hosts are expected to treat
/// as fatal at startup.
#[derive(Debug, Error)]
pub enum KernelError {
    /// A required collaborator or value was not wired at construction.
    ///
    /// ## When This Occurs
    /// - Store profile has no database but the host needs a catalog
    /// - A profile declares no payment types
    ///
    /// Never recoverable locally: the host must terminate or reconfigure.
    #[error("Missing configuration: {what}. {remedy}")]
    ConfigurationMissing { what: String, remedy: String },

    /// Session id is not known to the session manager.
    #[error("Session not found: {0}")]
    UnknownSession(SessionId),

    /// Session exists but was closed; all further operations fail.
    #[error("Session {0} is closed")]
    SessionClosed(SessionId),

    /// Transaction id is not known to the engine.
    #[error("Transaction not found: {0}")]
    UnknownTransaction(TransactionId),

    /// Line item id does not exist in the addressed transaction.
    #[error("Line item not found: {0}")]
    UnknownLineItem(LineItemId),

    /// The target line is already voided.
    #[error("Line item {0} is already voided")]
    LineAlreadyVoided(LineItemId),

    /// Operation attempted on a transaction in a terminal state.
    #[error("Transaction {id} is {state}, no further mutation is allowed")]
    TerminalState {
        id: TransactionId,
        state: TransactionState,
    },

    /// An argument failed validation (blank, non-positive, negative, ...).
    #[error("{field} {reason}")]
    InvalidArgument { field: String, reason: String },

    /// Payment attempted on a transaction with no item lines.
    #[error("Transaction {0} has no item lines to pay for")]
    EmptyTransaction(TransactionId),

    /// The payment rules rejected the tender type outright.
    #[error("Invalid payment type: '{0}'")]
    InvalidPaymentType(String),

    /// Overpayment on a tender that cannot issue change.
    #[error("Tender '{tender}' cannot issue change; overpayment of {overpay} rejected")]
    OverpaymentNotAllowed { tender: String, overpay: Decimal },

    /// An exact-amount tender was tendered inexactly.
    #[error("Tender '{tender}' requires the exact balance of {balance}, got {amount}")]
    ExactTenderRequired {
        tender: String,
        balance: Decimal,
        amount: Decimal,
    },

    /// A modifier rule was violated (unknown, non-applicable, incompatible,
    /// duplicate in a single-select group, missing required group).
    #[error("{message}")]
    ModifierRule { message: String },

    /// Arithmetic or line construction across two different currencies.
    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: String, right: String },

    /// The store extension failed underneath the kernel (catalog lookup,
    /// modifier graph access). Carries the extension's own message.
    #[error("Store extension failure: {0}")]
    Extension(String),
}

impl KernelError {
    /// Convenience constructor for argument validation failures.
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        KernelError::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Convenience constructor for missing-configuration failures.
    pub fn configuration_missing(what: impl Into<String>, remedy: impl Into<String>) -> Self {
        KernelError::ConfigurationMissing {
            what: what.into(),
            remedy: remedy.into(),
        }
    }

    /// The taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            KernelError::ConfigurationMissing { .. } => ErrorKind::ConfigurationMissing,
            KernelError::UnknownSession(_)
            | KernelError::UnknownTransaction(_)
            | KernelError::UnknownLineItem(_)
            | KernelError::InvalidArgument { .. }
            | KernelError::CurrencyMismatch { .. } => ErrorKind::InvalidArgument,
            KernelError::SessionClosed(_)
            | KernelError::TerminalState { .. }
            | KernelError::LineAlreadyVoided(_)
            | KernelError::EmptyTransaction(_) => ErrorKind::IllegalState,
            KernelError::InvalidPaymentType(_)
            | KernelError::OverpaymentNotAllowed { .. }
            | KernelError::ExactTenderRequired { .. } => ErrorKind::PaymentPolicyViolation,
            KernelError::ModifierRule { .. } => ErrorKind::ModifierRuleViolation,
            KernelError::Extension(_) => ErrorKind::Extension,
        }
    }
}

// =============================================================================
// Error Kind
// =============================================================================

/// Failure taxonomy by meaning, independent of the concrete variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Required service/value not wired; fatal for the host.
    ConfigurationMissing,
    /// Bad input: blank ids, non-positive quantity, unknown references.
    InvalidArgument,
    /// Operation not legal in the current lifecycle state.
    IllegalState,
    /// Tender rejected by payment policy.
    PaymentPolicyViolation,
    /// Modifier selection rejected by the rule graph.
    ModifierRuleViolation,
    /// Store extension I/O failure underneath the kernel.
    Extension,
}

/// Convenience type alias for Results with KernelError.
pub type KernelResult<T> = Result<T, KernelError>;

// =============================================================================
// Unit Tests
// =============================================================================
