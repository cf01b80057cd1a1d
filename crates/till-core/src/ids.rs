//! # Identifier Types
//!
//! Opaque identifier newtypes used across the kernel.
//!
//! ## Dual-Key Identity Pattern
//! A transaction line has two numbers attached to it:
//! - `LineItemId`: opaque, immutable, assigned once - THE identity
//! - `line_number`: 1-based display position - may shift, never identity
//!
//! Every kernel operation addresses lines by `LineItemId` only.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! opaque_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an existing identifier string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generates a fresh random identifier (UUID v4).
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

opaque_id! {
    /// Identifies an operator session.
    SessionId
}

opaque_id! {
    /// Identifies a transaction for its whole lifetime.
    TransactionId
}

opaque_id! {
    /// Identifies a transaction line. Stable across voids and renumbering.
    LineItemId
}

opaque_id! {
    /// Identifies a product (SKU). Owned by the store catalog, opaque here.
    ProductId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        let a = LineItemId::generate();
        let b = LineItemId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_display_round_trip() {
        let id = TransactionId::new("tx-42");
        assert_eq!(id.to_string(), "tx-42");
        assert_eq!(TransactionId::from("tx-42"), id);
    }
}
