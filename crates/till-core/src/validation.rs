//! # Validation Module
//!
//! Input validation helpers shared by the session manager and the engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Tool Executor                                                 │
//! │  ├── Declared parameter types, required/unknown keys                    │
//! │  └── Invariant-culture coercion                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (kernel argument checks)                          │
//! │  ├── Blank identifiers, non-positive quantities, negative prices        │
//! │  └── Runs before any state is touched                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Engine invariants (assert_integrity)                          │
//! │  └── Recomputed aggregates; violation = programmer error                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;

use crate::error::{KernelError, KernelResult};

/// Rejects blank (empty or whitespace-only) identifier-ish fields.
pub fn require_non_blank(field: &str, value: &str) -> KernelResult<()> {
    if value.trim().is_empty() {
        return Err(KernelError::invalid_argument(field, "must not be blank"));
    }
    Ok(())
}

/// Rejects quantities that are zero or negative.
pub fn require_positive_quantity(quantity: i64) -> KernelResult<()> {
    if quantity <= 0 {
        return Err(KernelError::invalid_argument(
            "quantity",
            format!("must be positive, got {}", quantity),
        ));
    }
    Ok(())
}

/// Rejects negative monetary amounts (unit prices, tendered amounts).
pub fn require_non_negative(field: &str, amount: Decimal) -> KernelResult<()> {
    if amount < Decimal::ZERO {
        return Err(KernelError::invalid_argument(
            field,
            format!("must not be negative, got {}", amount),
        ));
    }
    Ok(())
}
