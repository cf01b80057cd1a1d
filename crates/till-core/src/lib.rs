//! # till-core: Pure Transaction Kernel for Till POS
//!
//! This crate is the **heart** of Till. It owns the authoritative lifecycle,
//! pricing aggregation, and financial integrity of retail transactions, with
//! zero I/O of its own. Everything culture- or catalog-specific is supplied
//! from outside through the [`extension`] contract.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till Architecture                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               Orchestrator / CLI host / tests                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ tool invocations                      │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 till-tools (executor + client)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌────────┐  │   │
//! │  │   │  money  │ │ session │ │  engine  │ │ payment │ │ types  │  │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └─────────┘ └────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CULTURE • NO HARDCODED RULES        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ StoreExtension contract               │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          till-store (catalog, modifier rules, formatter)        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - `Money` value type with exact decimal arithmetic
//! - [`ids`] - Opaque identifier newtypes
//! - [`types`] - Transactions, lines, snapshots, store profiles
//! - [`session`] - Operator session lifecycle
//! - [`engine`] - Transaction state machine and pricing aggregation
//! - [`payment`] - Pluggable tender normalization and change policy
//! - [`extension`] - Store extension contract (catalog, modifiers, formatting)
//! - [`envelope`] - Result envelopes crossing the kernel boundary
//! - [`error`] - Kernel error taxonomy
//! - [`validation`] - Input validation helpers
//!
//! ## Design Principles
//!
//! 1. **Exact money**: every amount is an arbitrary-precision decimal; the
//!    engine never rounds and never assumes a decimal-place count
//! 2. **Explicit collaborators**: payment rules and store services are
//!    constructor-time requirements, not nullable lookups
//! 3. **Result envelopes for domain outcomes**: panics are reserved for
//!    financial-integrity violations, which indicate a bug and must never be
//!    swallowed
//! 4. **Data-driven rules**: no tender name, modifier code, or currency is
//!    hardcoded here

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod envelope;
pub mod error;
pub mod extension;
pub mod ids;
pub mod money;
pub mod payment;
pub mod session;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use engine::{LineItemRequest, TransactionEngine};
pub use envelope::OperationResult;
pub use error::{ErrorKind, KernelError, KernelResult};
pub use extension::{
    CurrencyFormatter, ModificationCheck, ModifierSelection, ProductCatalog, ProductCheck,
    ModifierService, StoreExtension,
};
pub use ids::{LineItemId, ProductId, SessionId, TransactionId};
pub use money::Money;
pub use payment::{DefaultPaymentRules, PaymentRules, ProfilePaymentRules};
pub use session::{Session, SessionManager};
pub use types::{
    LineType, Modifier, ModifierGroup, PaymentTenderType, PriceAdjustment, ProductInfo,
    StoreDatabase, StoreProfile, Transaction, TransactionLine, TransactionState,
};
