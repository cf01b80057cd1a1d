//! # Payment Rules
//!
//! Pluggable tender policy: normalization plus the "may this tender issue
//! change?" predicate. The engine consults this trait and nothing else, so
//! no tender name is ever hardcoded in the kernel.
//!
//! ## Policy Flow
//! ```text
//! process_payment(amount, raw_tender)
//!        │
//!        ▼
//! normalize_tender_type(raw) ──None──► InvalidPaymentType
//!        │
//!        ▼ canonical
//! requires_exact(canonical)? ──and amount ≠ balance──► ExactTenderRequired
//!        │
//!        ▼
//! overpay > 0 and !can_issue_change(canonical) ──► OverpaymentNotAllowed
//!        │
//!        ▼
//! tender line appended (+ change line when overpay > 0)
//! ```

use std::collections::HashMap;

use crate::types::PaymentTenderType;

/// Tender normalization and change policy.
///
/// Implementations must be pure and culture-neutral: the same input yields
/// the same canonical form on every call.
pub trait PaymentRules: Send + Sync {
    /// Returns the canonical tender form, or `None` for invalid input. The
    /// engine fails fast on `None`; there is no hidden default tender.
    fn normalize_tender_type(&self, raw: &str) -> Option<String>;

    /// Whether an overpayment on this canonical tender may become a change
    /// line.
    fn can_issue_change(&self, canonical: &str) -> bool;

    /// Whether this canonical tender must match the open balance exactly.
    /// Exactness is checked before the change policy: a tender that both
    /// requires exactness and allows change still rejects inexact amounts.
    fn requires_exact(&self, _canonical: &str) -> bool {
        false
    }
}

// =============================================================================
// Default Policy
// =============================================================================

/// The reference policy: any non-blank trimmed string is accepted as its
/// lowercased canonical form; only `cash` permits change.
#[derive(Debug, Default, Clone)]
pub struct DefaultPaymentRules;

impl PaymentRules for DefaultPaymentRules {
    fn normalize_tender_type(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(trimmed.to_lowercase())
    }

    fn can_issue_change(&self, canonical: &str) -> bool {
        canonical == "cash"
    }
}

// =============================================================================
// Profile-Driven Policy
// =============================================================================

/// A policy driven by a store profile's declared tender types. Tenders not
/// present in the profile are invalid outright.
#[derive(Debug, Clone)]
pub struct ProfilePaymentRules {
    /// Keyed by lowercased tender id.
    tenders: HashMap<String, PaymentTenderType>,
}

impl ProfilePaymentRules {
    /// Builds the policy from a profile's payment-type table.
    pub fn new<'a>(types: impl IntoIterator<Item = &'a PaymentTenderType>) -> Self {
        let tenders = types
            .into_iter()
            .map(|t| (t.id.trim().to_lowercase(), t.clone()))
            .collect();
        ProfilePaymentRules { tenders }
    }

    fn lookup(&self, canonical: &str) -> Option<&PaymentTenderType> {
        self.tenders.get(canonical)
    }
}

impl PaymentRules for ProfilePaymentRules {
    fn normalize_tender_type(&self, raw: &str) -> Option<String> {
        let canonical = raw.trim().to_lowercase();
        if canonical.is_empty() || !self.tenders.contains_key(&canonical) {
            return None;
        }
        Some(canonical)
    }

    fn can_issue_change(&self, canonical: &str) -> bool {
        self.lookup(canonical).map(|t| t.allows_change).unwrap_or(false)
    }

    fn requires_exact(&self, canonical: &str) -> bool {
        self.lookup(canonical).map(|t| t.requires_exact).unwrap_or(false)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
