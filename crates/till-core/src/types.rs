//! # Domain Types
//!
//! Core domain types used throughout Till.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌───────────────────┐   │
//! │  │   Transaction    │   │ TransactionLine  │   │    ProductInfo    │   │
//! │  │  ──────────────  │   │  ──────────────  │   │  ───────────────  │   │
//! │  │  id              │   │  line_item_id    │   │  sku              │   │
//! │  │  state           │   │  line_number     │   │  name             │   │
//! │  │  currency        │   │  parent_line?    │   │  base_price       │   │
//! │  │  lines[]         │   │  line_type       │   │  is_active        │   │
//! │  │  total/tendered  │   │  extended        │   └───────────────────┘   │
//! │  └──────────────────┘   └──────────────────┘                           │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌───────────────────┐   │
//! │  │     Modifier     │   │  ModifierGroup   │   │   StoreProfile    │   │
//! │  │  Free|Surcharge  │   │  single_select   │   │  payment_types    │   │
//! │  └──────────────────┘   └──────────────────┘   └───────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Discipline
//! `Transaction` values handed out by the engine are snapshots: owned clones
//! that reflect all prior successful calls and never mutate underneath the
//! caller. Product names and prices on a line are frozen at add time.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::ids::{LineItemId, ProductId, TransactionId};
use crate::money::Money;

// =============================================================================
// Transaction State
// =============================================================================

/// Lifecycle state of a transaction.
///
/// ```text
/// StartTransaction ──first item──► ItemsPending ──fully tendered──► EndOfTransaction
///        │                              │
///        └────────────── void ──────────┴──────► Voided
/// ```
///
/// `EndOfTransaction` and `Voided` are terminal: every mutation against a
/// transaction in one of those states is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    /// Created, no item lines yet.
    StartTransaction,
    /// At least one item line has been added.
    ItemsPending,
    /// Fully tendered and settled. Terminal.
    EndOfTransaction,
    /// Abandoned before settlement. Terminal.
    Voided,
}

impl TransactionState {
    /// Returns true when no further mutation is allowed.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionState::EndOfTransaction | TransactionState::Voided
        )
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionState::StartTransaction => "StartTransaction",
            TransactionState::ItemsPending => "ItemsPending",
            TransactionState::EndOfTransaction => "EndOfTransaction",
            TransactionState::Voided => "Voided",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Line Type
// =============================================================================

/// What a transaction line represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineType {
    /// Merchandise. `extended = unit_price × quantity`.
    Item,
    /// Money in. Recorded negatively for accounting symmetry.
    Tender,
    /// Money returned to the customer. Recorded positively.
    Change,
}

// =============================================================================
// Transaction Line
// =============================================================================

/// A single row in a transaction.
///
/// Lines are append-only records keyed by a stable `line_item_id`; after
/// creation only `is_voided` and `void_reason` ever change. Child lines
/// (modifiers) reference their parent through `parent_line_item_id` - the
/// engine derives the descendant graph on demand rather than embedding child
/// lists in parents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionLine {
    /// Stable identity, assigned once.
    pub line_item_id: LineItemId,

    /// 1-based insertion position. Display-only; never identity.
    pub line_number: u32,

    /// Parent line for modifier/child lines.
    pub parent_line_item_id: Option<LineItemId>,

    /// Product reference (opaque to the kernel).
    pub product_id: ProductId,

    /// Product name frozen at add time.
    pub product_name: Option<String>,

    /// Product description frozen at add time.
    pub product_description: Option<String>,

    /// Quantity. Always 1 for tender and change lines.
    pub quantity: i64,

    /// Unit price. For tender lines this equals `extended`.
    pub unit_price: Money,

    /// Extended amount under the sign conventions of `line_type`.
    pub extended: Money,

    /// Item, Tender, or Change.
    pub line_type: LineType,

    /// Canonical tender type for Tender lines.
    pub tender_type: Option<String>,

    /// Whether this line has been voided.
    pub is_voided: bool,

    /// Reason recorded on the first void. Later cascades never overwrite it.
    pub void_reason: Option<String>,

    /// Nesting depth for display: parent's level + 1.
    pub display_indent_level: u32,

    /// Free-form annotations attached by callers.
    pub metadata: serde_json::Value,
}

impl TransactionLine {
    /// Returns true when the line participates in aggregation.
    #[inline]
    pub fn is_live(&self) -> bool {
        !self.is_voided
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A retail transaction: ordered line sequence plus derived aggregates.
///
/// ## Invariants (asserted after every mutation)
/// - `total = Σ extended` of non-voided Item lines
/// - `tendered = Σ (−extended)` of non-voided Tender lines
/// - `change_due = Σ extended` of non-voided Change lines
/// - `balance_due = total − tendered + change_due`
/// - `EndOfTransaction ⇒ balance_due = 0`
/// - `change_due ≤ max(tendered − total, 0)`; `change_due > 0 ⇒ tendered ≥ total`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub state: TransactionState,

    /// Transaction currency, stored verbatim from `start_transaction`.
    pub currency: String,

    /// Ordered by insertion. Voided lines stay in place.
    pub lines: Vec<TransactionLine>,

    /// Sum of live item lines.
    pub total: Decimal,

    /// Positive aggregate of live tender lines.
    pub tendered: Decimal,

    /// Sum of live change lines.
    pub change_due: Decimal,

    /// `total − tendered + change_due`.
    pub balance_due: Decimal,

    pub created_utc: DateTime<Utc>,
}

impl Transaction {
    /// Creates an empty transaction in `StartTransaction`.
    pub fn new(id: TransactionId, currency: impl Into<String>) -> Self {
        Transaction {
            id,
            state: TransactionState::StartTransaction,
            currency: currency.into(),
            lines: Vec::new(),
            total: Decimal::ZERO,
            tendered: Decimal::ZERO,
            change_due: Decimal::ZERO,
            balance_due: Decimal::ZERO,
            created_utc: Utc::now(),
        }
    }

    /// Looks a line up by its stable identity.
    pub fn line(&self, id: &LineItemId) -> Option<&TransactionLine> {
        self.lines.iter().find(|l| &l.line_item_id == id)
    }

    /// Returns true when at least one live item line exists.
    pub fn has_item_lines(&self) -> bool {
        self.lines
            .iter()
            .any(|l| l.line_type == LineType::Item && l.is_live())
    }

    /// Live lines of the given type.
    pub fn live_lines(&self, line_type: LineType) -> impl Iterator<Item = &TransactionLine> {
        self.lines
            .iter()
            .filter(move |l| l.line_type == line_type && l.is_live())
    }
}

// =============================================================================
// Product Info
// =============================================================================

/// Catalog data for one product. The kernel never synthesizes these; they
/// come from the store extension verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInfo {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub base_price: Decimal,
    pub is_active: bool,
}

// =============================================================================
// Modifiers
// =============================================================================

/// How a modifier affects the price of its parent item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceAdjustment {
    /// No charge.
    Free,
    /// Adds `value` per unit of accumulated quantity.
    Surcharge,
}

/// A product attribute selection ("iced", "less sugar") with its own
/// applicability, pricing, and rule graph, loaded from the store database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Modifier {
    pub id: String,
    pub name: String,
    pub group_code: Option<String>,
    pub adjustment: PriceAdjustment,
    pub value: Decimal,
    /// Loaded and exposed; the kernel never injects automatic modifiers into
    /// a selection set on its own.
    pub is_automatic: bool,
    pub display_order: i64,
}

/// A named group of modifiers with selection cardinality rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifierGroup {
    pub code: String,
    pub name: String,
    /// At most one modifier from this group may be selected.
    pub single_select: bool,
    /// At least one modifier from this group must be selected.
    pub required: bool,
}

// =============================================================================
// Store Profile
// =============================================================================

/// One tender type a store accepts, with its change/exactness policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTenderType {
    pub id: String,
    pub allows_change: bool,
    pub requires_exact: bool,
}

/// Per-store database reference (opaque to the kernel).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDatabase {
    #[serde(rename = "type")]
    pub db_type: String,
    pub connection_string: String,
}

/// A parsed store profile. The on-disk format belongs to the host; the
/// kernel consumes these records only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreProfile {
    pub store_id: String,
    pub display_name: String,
    /// 3-letter ISO currency code.
    pub currency: String,
    /// Culture tag handed to the currency formatter, e.g. `en-US`.
    pub culture: String,
    pub version: i64,
    pub payment_types: HashMap<String, PaymentTenderType>,
    pub database: Option<StoreDatabase>,
}

// =============================================================================
// Unit Tests
// =============================================================================
