//! # Store Extension Contract
//!
//! The seam between the culture-neutral kernel and everything a store
//! supplies: catalog, modifier rules, and currency formatting.
//!
//! ## Composition
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       StoreExtension                                    │
//! │                                                                         │
//! │   ┌─────────────────┐  ┌──────────────────┐  ┌────────────────────┐    │
//! │   │ ProductCatalog  │  │ ModifierService  │  │ CurrencyFormatter  │    │
//! │   │ ─────────────── │  │ ──────────────── │  │ ────────────────── │    │
//! │   │ validate        │  │ validate         │  │ format_currency    │    │
//! │   │ search          │  │ price            │  │ symbol / places    │    │
//! │   │ popular items   │  └──────────────────┘  └────────────────────┘    │
//! │   └─────────────────┘                                                   │
//! │                                                                         │
//! │  Collaborators are constructor-time requirements of whoever composes    │
//! │  them. There is no nullable injection: a missing service is a           │
//! │  ConfigurationMissing failure at build time, not a nil check later.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Catalog and modifier calls are `async`: they may reach a store database.
//! Cancellation is cooperative - dropping the future at an `.await` abandons
//! the lookup.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::KernelResult;
use crate::types::{ProductInfo, StoreProfile};

// =============================================================================
// Check Results
// =============================================================================

/// Outcome of a catalog lookup. Domain invalidity (unknown or inactive
/// product) lives here; infrastructure failures travel as errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCheck {
    pub is_valid: bool,
    pub product: Option<ProductInfo>,
    /// The price the kernel must charge. Never synthesized on failure.
    pub effective_price: Decimal,
    pub error_message: Option<String>,
}

impl ProductCheck {
    pub fn valid(product: ProductInfo) -> Self {
        let effective_price = product.base_price;
        ProductCheck {
            is_valid: true,
            product: Some(product),
            effective_price,
            error_message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ProductCheck {
            is_valid: false,
            product: None,
            effective_price: Decimal::ZERO,
            error_message: Some(message.into()),
        }
    }
}

/// One requested modifier: id, optional group assertion, and quantity
/// (normally mirroring the parent line's quantity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifierSelection {
    pub modifier_id: String,
    /// When present, must match the modifier's stored group.
    pub group_code: Option<String>,
    pub quantity: i64,
}

impl ModifierSelection {
    pub fn new(modifier_id: impl Into<String>, quantity: i64) -> Self {
        ModifierSelection {
            modifier_id: modifier_id.into(),
            group_code: None,
            quantity,
        }
    }

    pub fn in_group(mut self, group_code: impl Into<String>) -> Self {
        self.group_code = Some(group_code.into());
        self
    }
}

/// Outcome of validating a modifier selection set against the rule graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModificationCheck {
    pub is_valid: bool,
    /// Total surcharge across the implication closure.
    pub total_extra_price: Decimal,
    pub error_message: Option<String>,
}

impl ModificationCheck {
    pub fn valid(total_extra_price: Decimal) -> Self {
        ModificationCheck {
            is_valid: true,
            total_extra_price,
            error_message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ModificationCheck {
            is_valid: false,
            total_extra_price: Decimal::ZERO,
            error_message: Some(message.into()),
        }
    }
}

// =============================================================================
// Sub-Service Contracts
// =============================================================================

/// Product lookup and discovery.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Resolves a product and its effective price. Unknown or inactive
    /// products come back invalid with a message - never a fallback price.
    async fn validate_product(&self, product_id: &str) -> KernelResult<ProductCheck>;

    /// Case-insensitive search over sku and name.
    async fn search_products(&self, term: &str, max_results: u32) -> KernelResult<Vec<ProductInfo>>;

    /// A short list of active products for idle-screen suggestions.
    async fn get_popular_items(&self) -> KernelResult<Vec<ProductInfo>>;
}

/// Modifier validation and pricing against the store's rule graph.
#[async_trait]
pub trait ModifierService: Send + Sync {
    /// Runs the full rule pipeline (applicability, implications,
    /// incompatibilities, cardinality) for one product's selections.
    async fn validate_modifications(
        &self,
        product_id: &str,
        selections: &[ModifierSelection],
    ) -> KernelResult<ModificationCheck>;

    /// Prices a selection set (surcharges over the implication closure)
    /// without product-applicability checks.
    async fn calculate_modification_total(
        &self,
        selections: &[ModifierSelection],
    ) -> KernelResult<Decimal>;
}

/// Culture-aware money rendering. The kernel itself never formats money.
pub trait CurrencyFormatter: Send + Sync {
    fn format_currency(&self, amount: Decimal, currency: &str, culture: &str) -> String;
    fn get_currency_symbol(&self, currency: &str) -> String;
    fn get_decimal_places(&self, currency: &str) -> u32;
}

// =============================================================================
// Composite
// =============================================================================

/// A store extension composes the three sub-services plus the profile that
/// activated it.
pub trait StoreExtension: Send + Sync {
    fn profile(&self) -> &StoreProfile;
    fn catalog(&self) -> &dyn ProductCatalog;
    fn modifications(&self) -> &dyn ModifierService;
    fn currency_formatter(&self) -> &dyn CurrencyFormatter;
}
