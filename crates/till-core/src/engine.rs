//! # Transaction Engine
//!
//! Holds transactions in memory, mutates them only through declared
//! operations, recalculates totals after every mutation, and asserts the
//! financial invariants before any snapshot leaves the engine.
//!
//! ## Mutation Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Every mutating operation                                │
//! │                                                                         │
//! │  validate_session ──► look up transaction (exclusive entry lock)        │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  domain validation (state, arguments, policy) - NOTHING mutated yet     │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  mutate ──► recalculate ──► assert_integrity ──► clone snapshot         │
//! │                                                                         │
//! │  Domain failures leave the transaction untouched.                       │
//! │  A failed integrity assertion is a programmer error and panics.         │
//! │  No `.await` happens while the entry lock is held.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Sign Conventions
//! - Item lines: `extended = unit_price × quantity` (non-negative)
//! - Tender lines: `extended < 0` (money in, recorded negatively)
//! - Change lines: `extended > 0` (money out)
//!
//! The engine serves concurrent sessions; two simultaneous operations on the
//! SAME transaction must be serialized by the caller. The per-transaction
//! entry lock makes each single mutation+recalculate+assert sequence atomic.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{KernelError, KernelResult};
use crate::ids::{LineItemId, ProductId, SessionId, TransactionId};
use crate::money::Money;
use crate::payment::PaymentRules;
use crate::session::SessionManager;
use crate::types::{LineType, Transaction, TransactionLine, TransactionState};
use crate::validation::{require_non_blank, require_non_negative, require_positive_quantity};

// =============================================================================
// Line Item Request
// =============================================================================

/// Arguments for adding one item line.
#[derive(Debug, Clone)]
pub struct LineItemRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
    pub product_name: Option<String>,
    pub product_description: Option<String>,
    /// When set, the new line becomes a child (modifier line) of this line.
    pub parent_line_item_id: Option<LineItemId>,
    pub metadata: serde_json::Value,
}

impl LineItemRequest {
    pub fn new(product_id: impl Into<ProductId>, quantity: i64, unit_price: Money) -> Self {
        LineItemRequest {
            product_id: product_id.into(),
            quantity,
            unit_price,
            product_name: None,
            product_description: None,
            parent_line_item_id: None,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.product_name = Some(name.into());
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.product_description = Some(description.into());
        self
    }

    pub fn child_of(mut self, parent: LineItemId) -> Self {
        self.parent_line_item_id = Some(parent);
        self
    }
}

// =============================================================================
// Transaction Engine
// =============================================================================

/// The authoritative owner of transaction lifecycle and financial integrity.
pub struct TransactionEngine {
    sessions: Arc<SessionManager>,
    payment_rules: Arc<dyn PaymentRules>,
    transactions: DashMap<TransactionId, Transaction>,
}

impl TransactionEngine {
    /// Both collaborators are required at construction; there is no setter
    /// and no nullable fallback.
    pub fn new(sessions: Arc<SessionManager>, payment_rules: Arc<dyn PaymentRules>) -> Self {
        TransactionEngine {
            sessions,
            payment_rules,
            transactions: DashMap::new(),
        }
    }

    /// The session manager this engine validates against.
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    // -------------------------------------------------------------------------
    // Operations
    // -------------------------------------------------------------------------

    /// Creates a new transaction in the given currency (stored verbatim).
    pub fn start_transaction(
        &self,
        session_id: &SessionId,
        currency: &str,
    ) -> KernelResult<Transaction> {
        self.sessions.validate(session_id)?;
        require_non_blank("currency", currency)?;

        let id = TransactionId::generate();
        let tx = Transaction::new(id.clone(), currency);
        debug!(session = %session_id, transaction = %id, currency = %currency, "transaction started");

        self.transactions.insert(id, tx.clone());
        Ok(tx)
    }

    /// Appends an item line (optionally as a child of an existing line).
    ///
    /// On the first successful item the transaction moves from
    /// `StartTransaction` to `ItemsPending`.
    pub fn add_line_item(
        &self,
        session_id: &SessionId,
        tx_id: &TransactionId,
        request: LineItemRequest,
    ) -> KernelResult<Transaction> {
        self.sessions.validate(session_id)?;
        require_positive_quantity(request.quantity)?;
        require_non_negative("unitPrice", request.unit_price.amount)?;
        require_non_blank("productId", request.product_id.as_str())?;

        let mut entry = self
            .transactions
            .get_mut(tx_id)
            .ok_or_else(|| KernelError::UnknownTransaction(tx_id.clone()))?;
        let tx = entry.value_mut();

        Self::require_open(tx)?;

        if request.unit_price.currency != tx.currency {
            return Err(KernelError::CurrencyMismatch {
                left: request.unit_price.currency.clone(),
                right: tx.currency.clone(),
            });
        }

        // Items precede tenders: once a live tender exists the item phase is
        // over for this transaction.
        if tx.live_lines(LineType::Tender).next().is_some() {
            return Err(KernelError::invalid_argument(
                "productId",
                "cannot be added after tender lines",
            ));
        }

        let indent = match &request.parent_line_item_id {
            None => 0,
            Some(parent_id) => {
                let parent = tx
                    .line(parent_id)
                    .ok_or_else(|| KernelError::UnknownLineItem(parent_id.clone()))?;
                if parent.is_voided {
                    return Err(KernelError::LineAlreadyVoided(parent_id.clone()));
                }
                parent.display_indent_level + 1
            }
        };

        let extended = request.unit_price.multiply_quantity(request.quantity);
        let line = TransactionLine {
            line_item_id: LineItemId::generate(),
            line_number: (tx.lines.len() + 1) as u32,
            parent_line_item_id: request.parent_line_item_id,
            product_id: request.product_id,
            product_name: request.product_name,
            product_description: request.product_description,
            quantity: request.quantity,
            unit_price: request.unit_price,
            extended,
            line_type: LineType::Item,
            tender_type: None,
            is_voided: false,
            void_reason: None,
            display_indent_level: indent,
            metadata: request.metadata,
        };

        debug!(
            transaction = %tx.id,
            line = %line.line_item_id,
            product = %line.product_id,
            quantity = line.quantity,
            "item line added"
        );

        tx.lines.push(line);
        if tx.state == TransactionState::StartTransaction {
            tx.state = TransactionState::ItemsPending;
        }

        Self::recalculate(tx);
        Self::assert_integrity(tx);
        Ok(tx.clone())
    }

    /// Applies a tender. Fully covering the balance settles the transaction;
    /// partial tenders leave it open for further payments.
    pub fn process_payment(
        &self,
        session_id: &SessionId,
        tx_id: &TransactionId,
        amount: Decimal,
        payment_type: &str,
    ) -> KernelResult<Transaction> {
        self.sessions.validate(session_id)?;
        require_non_blank("paymentType", payment_type)?;
        require_non_negative("amount", amount)?;
        if amount.is_zero() {
            return Err(KernelError::invalid_argument("amount", "must be positive"));
        }

        let canonical = self
            .payment_rules
            .normalize_tender_type(payment_type)
            .ok_or_else(|| KernelError::InvalidPaymentType(payment_type.trim().to_string()))?;

        let mut entry = self
            .transactions
            .get_mut(tx_id)
            .ok_or_else(|| KernelError::UnknownTransaction(tx_id.clone()))?;
        let tx = entry.value_mut();

        Self::require_open(tx)?;
        if !tx.has_item_lines() {
            return Err(KernelError::EmptyTransaction(tx_id.clone()));
        }

        // Decide the whole outcome before touching the line sequence, so a
        // rejected tender leaves the transaction byte-for-byte unchanged.
        let balance = tx.total - tx.tendered;
        let new_tendered = tx.tendered + amount;
        let overpay = (new_tendered - tx.total).max(Decimal::ZERO);

        if self.payment_rules.requires_exact(&canonical) && amount != balance {
            return Err(KernelError::ExactTenderRequired {
                tender: canonical,
                balance,
                amount,
            });
        }

        if overpay > Decimal::ZERO && !self.payment_rules.can_issue_change(&canonical) {
            return Err(KernelError::OverpaymentNotAllowed {
                tender: canonical,
                overpay,
            });
        }

        let tender_money = Money::new(-amount, tx.currency.clone());
        let tender_line = TransactionLine {
            line_item_id: LineItemId::generate(),
            line_number: (tx.lines.len() + 1) as u32,
            parent_line_item_id: None,
            product_id: ProductId::new("TENDER"),
            product_name: Some(canonical.clone()),
            product_description: None,
            quantity: 1,
            unit_price: tender_money.clone(),
            extended: tender_money,
            line_type: LineType::Tender,
            tender_type: Some(canonical.clone()),
            is_voided: false,
            void_reason: None,
            display_indent_level: 0,
            metadata: serde_json::Value::Null,
        };

        debug!(
            transaction = %tx.id,
            tender = %canonical,
            amount = %amount,
            overpay = %overpay,
            "tender applied"
        );
        tx.lines.push(tender_line);

        if new_tendered >= tx.total {
            if overpay > Decimal::ZERO {
                let change_money = Money::new(overpay, tx.currency.clone());
                let change_line = TransactionLine {
                    line_item_id: LineItemId::generate(),
                    line_number: (tx.lines.len() + 1) as u32,
                    parent_line_item_id: None,
                    product_id: ProductId::new("CHANGE"),
                    product_name: Some("change".to_string()),
                    product_description: None,
                    quantity: 1,
                    unit_price: change_money.clone(),
                    extended: change_money,
                    line_type: LineType::Change,
                    tender_type: None,
                    is_voided: false,
                    void_reason: None,
                    display_indent_level: 0,
                    metadata: serde_json::Value::Null,
                };
                tx.lines.push(change_line);
            }
            tx.state = TransactionState::EndOfTransaction;
        }

        Self::recalculate(tx);
        Self::assert_integrity(tx);
        Ok(tx.clone())
    }

    /// Voids a line and, atomically, every non-voided descendant reachable
    /// through `parent_line_item_id` edges.
    pub fn void_line_item(
        &self,
        session_id: &SessionId,
        tx_id: &TransactionId,
        line_item_id: &LineItemId,
        reason: Option<&str>,
    ) -> KernelResult<Transaction> {
        self.sessions.validate(session_id)?;

        let mut entry = self
            .transactions
            .get_mut(tx_id)
            .ok_or_else(|| KernelError::UnknownTransaction(tx_id.clone()))?;
        let tx = entry.value_mut();

        Self::require_open(tx)?;

        let target = tx
            .line(line_item_id)
            .ok_or_else(|| KernelError::UnknownLineItem(line_item_id.clone()))?;
        if target.is_voided {
            return Err(KernelError::LineAlreadyVoided(line_item_id.clone()));
        }

        let cascade = Self::descendants_of(tx, line_item_id);
        debug!(
            transaction = %tx.id,
            line = %line_item_id,
            cascade = cascade.len(),
            "voiding line with cascade"
        );

        for line in tx.lines.iter_mut() {
            if cascade.contains(&line.line_item_id) && !line.is_voided {
                line.is_voided = true;
                // Only the first void's reason persists.
                if line.void_reason.is_none() {
                    line.void_reason = reason.map(str::to_string);
                }
            }
        }

        Self::recalculate(tx);
        Self::assert_integrity(tx);
        Ok(tx.clone())
    }

    /// Voids a whole open transaction: every live line is voided and the
    /// state becomes terminal `Voided`.
    ///
    /// Idempotent: re-voiding a voided transaction is a successful no-op.
    /// A settled (`EndOfTransaction`) transaction cannot be voided.
    pub fn void_transaction(
        &self,
        session_id: &SessionId,
        tx_id: &TransactionId,
        reason: Option<&str>,
    ) -> KernelResult<Transaction> {
        self.sessions.validate(session_id)?;

        let mut entry = self
            .transactions
            .get_mut(tx_id)
            .ok_or_else(|| KernelError::UnknownTransaction(tx_id.clone()))?;
        let tx = entry.value_mut();

        if tx.state == TransactionState::Voided {
            return Ok(tx.clone());
        }
        if tx.state == TransactionState::EndOfTransaction {
            return Err(KernelError::TerminalState {
                id: tx_id.clone(),
                state: tx.state,
            });
        }

        debug!(transaction = %tx.id, "voiding transaction");
        for line in tx.lines.iter_mut() {
            if !line.is_voided {
                line.is_voided = true;
                if line.void_reason.is_none() {
                    line.void_reason = reason.map(str::to_string);
                }
            }
        }
        tx.state = TransactionState::Voided;

        Self::recalculate(tx);
        Self::assert_integrity(tx);
        Ok(tx.clone())
    }

    /// Read-only snapshot reflecting all prior successful calls.
    pub fn get_transaction(
        &self,
        session_id: &SessionId,
        tx_id: &TransactionId,
    ) -> KernelResult<Transaction> {
        self.sessions.validate(session_id)?;
        self.transactions
            .get(tx_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| KernelError::UnknownTransaction(tx_id.clone()))
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn require_open(tx: &Transaction) -> KernelResult<()> {
        if tx.state.is_terminal() {
            return Err(KernelError::TerminalState {
                id: tx.id.clone(),
                state: tx.state,
            });
        }
        Ok(())
    }

    /// The target plus every non-voided line reachable from it through
    /// `parent_line_item_id` edges (breadth-first fixpoint).
    fn descendants_of(tx: &Transaction, root: &LineItemId) -> HashSet<LineItemId> {
        let mut reached: HashSet<LineItemId> = HashSet::new();
        reached.insert(root.clone());

        let mut frontier = vec![root.clone()];
        while let Some(current) = frontier.pop() {
            for line in &tx.lines {
                if line.is_voided || reached.contains(&line.line_item_id) {
                    continue;
                }
                if line.parent_line_item_id.as_ref() == Some(&current) {
                    reached.insert(line.line_item_id.clone());
                    frontier.push(line.line_item_id.clone());
                }
            }
        }
        reached
    }

    /// Walks non-voided lines once, summing by line type under the sign
    /// conventions, and refreshes the stored aggregates and line numbers.
    fn recalculate(tx: &mut Transaction) {
        let mut total = Decimal::ZERO;
        let mut tendered = Decimal::ZERO;
        let mut change_due = Decimal::ZERO;

        for (index, line) in tx.lines.iter_mut().enumerate() {
            line.line_number = (index + 1) as u32;
            if line.is_voided {
                continue;
            }
            match line.line_type {
                LineType::Item => total += line.extended.amount,
                LineType::Tender => tendered += -line.extended.amount,
                LineType::Change => change_due += line.extended.amount,
            }
        }

        tx.total = total;
        tx.tendered = tendered;
        tx.change_due = change_due;
        tx.balance_due = total - tendered + change_due;
    }

    /// Re-derives every invariant from the raw line sequence and compares it
    /// with the stored aggregates. A violation is corruption, not a domain
    /// outcome: it panics and must never be swallowed.
    fn assert_integrity(tx: &Transaction) {
        let mut total = Decimal::ZERO;
        let mut tendered = Decimal::ZERO;
        let mut change_due = Decimal::ZERO;

        for line in &tx.lines {
            if line.is_voided {
                continue;
            }

            if line.extended.currency != tx.currency || line.unit_price.currency != tx.currency {
                Self::integrity_violation(tx, &format!(
                    "line {} carries currency {} in a {} transaction",
                    line.line_item_id, line.extended.currency, tx.currency
                ));
            }

            match line.line_type {
                LineType::Item => {
                    if line.quantity <= 0 {
                        Self::integrity_violation(tx, &format!(
                            "item line {} has non-positive quantity {}",
                            line.line_item_id, line.quantity
                        ));
                    }
                    let expected = line.unit_price.amount * Decimal::from(line.quantity);
                    if line.extended.amount != expected {
                        Self::integrity_violation(tx, &format!(
                            "item line {} extended {} != unit {} x quantity {}",
                            line.line_item_id, line.extended.amount, line.unit_price.amount, line.quantity
                        ));
                    }
                    total += line.extended.amount;
                }
                LineType::Tender => {
                    if line.extended.amount >= Decimal::ZERO {
                        Self::integrity_violation(tx, &format!(
                            "tender line {} has non-negative extended {}",
                            line.line_item_id, line.extended.amount
                        ));
                    }
                    tendered += -line.extended.amount;
                }
                LineType::Change => {
                    if line.extended.amount <= Decimal::ZERO {
                        Self::integrity_violation(tx, &format!(
                            "change line {} has non-positive extended {}",
                            line.line_item_id, line.extended.amount
                        ));
                    }
                    change_due += line.extended.amount;
                }
            }

            if let Some(parent_id) = &line.parent_line_item_id {
                match tx.line(parent_id) {
                    None => Self::integrity_violation(tx, &format!(
                        "line {} references missing parent {}",
                        line.line_item_id, parent_id
                    )),
                    Some(parent) => {
                        if line.display_indent_level != parent.display_indent_level + 1 {
                            Self::integrity_violation(tx, &format!(
                                "line {} indent {} != parent indent {} + 1",
                                line.line_item_id, line.display_indent_level, parent.display_indent_level
                            ));
                        }
                        // A live child under a voided parent is an orphaned
                        // modifier line - the cascade failed.
                        if parent.is_voided {
                            Self::integrity_violation(tx, &format!(
                                "live line {} has voided parent {}",
                                line.line_item_id, parent_id
                            ));
                        }
                    }
                }
            }
        }

        if total != tx.total {
            Self::integrity_violation(tx, &format!("stored total {} != derived {}", tx.total, total));
        }
        if tendered != tx.tendered {
            Self::integrity_violation(tx, &format!(
                "stored tendered {} != derived {}",
                tx.tendered, tendered
            ));
        }
        if change_due != tx.change_due {
            Self::integrity_violation(tx, &format!(
                "stored change_due {} != derived {}",
                tx.change_due, change_due
            ));
        }
        if tx.balance_due != total - tendered + change_due {
            Self::integrity_violation(tx, &format!(
                "balance_due {} != total - tendered + change_due",
                tx.balance_due
            ));
        }
        if tx.state == TransactionState::EndOfTransaction && !tx.balance_due.is_zero() {
            Self::integrity_violation(tx, &format!(
                "settled transaction has non-zero balance {}",
                tx.balance_due
            ));
        }
        let max_change = (tendered - total).max(Decimal::ZERO);
        if change_due > max_change {
            Self::integrity_violation(tx, &format!(
                "change_due {} exceeds overpayment {}",
                change_due, max_change
            ));
        }
        if change_due > Decimal::ZERO && tendered < total {
            Self::integrity_violation(tx, "change issued on an underpaid transaction");
        }
    }

    fn integrity_violation(tx: &Transaction, message: &str) -> ! {
        tracing::error!(transaction = %tx.id, message, "financial integrity violation");
        panic!(
            "financial integrity violation in transaction {}: {}",
            tx.id, message
        );
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::DefaultPaymentRules;
    use rust_decimal_macros::dec;

    fn engine() -> (TransactionEngine, SessionId) {
        let sessions = Arc::new(SessionManager::new());
        let session_id = sessions.create_session("TERM1", "OP1").unwrap();
        let engine = TransactionEngine::new(sessions, Arc::new(DefaultPaymentRules));
        (engine, session_id)
    }

    fn usd(amount: Decimal) -> Money {
        Money::new(amount, "USD")
    }

    #[test]
    fn test_basic_lifecycle() {
        // S1: two coffees at 3.50 paid exactly with cash.
        let (engine, session) = engine();
        let tx = engine.start_transaction(&session, "USD").unwrap();
        assert_eq!(tx.state, TransactionState::StartTransaction);

        let tx = engine
            .add_line_item(
                &session,
                &tx.id,
                LineItemRequest::new("COFFEE.SMALL", 2, usd(dec!(3.50))),
            )
            .unwrap();
        assert_eq!(tx.state, TransactionState::ItemsPending);
        assert_eq!(tx.total, dec!(7.00));

        let tx = engine
            .process_payment(&session, &tx.id, dec!(7.00), "cash")
            .unwrap();
        assert_eq!(tx.state, TransactionState::EndOfTransaction);
        assert_eq!(tx.total, dec!(7.00));
        assert_eq!(tx.tendered, dec!(7.00));
        assert_eq!(tx.change_due, dec!(0));
        assert_eq!(tx.balance_due, dec!(0));
        assert_eq!(tx.lines.len(), 2);
        assert_eq!(tx.lines[1].line_type, LineType::Tender);
        assert_eq!(tx.lines[1].extended.amount, dec!(-7.00));
    }

    #[test]
    fn test_over_tender_with_cash_issues_change() {
        // S2: items 8.00, cash 10.00 -> change 2.00.
        let (engine, session) = engine();
        let tx = engine.start_transaction(&session, "USD").unwrap();
        engine
            .add_line_item(
                &session,
                &tx.id,
                LineItemRequest::new("SANDWICH", 1, usd(dec!(8.00))),
            )
            .unwrap();

        let tx = engine
            .process_payment(&session, &tx.id, dec!(10.00), "cash")
            .unwrap();
        assert_eq!(tx.state, TransactionState::EndOfTransaction);
        assert_eq!(tx.tendered, dec!(10.00));
        assert_eq!(tx.change_due, dec!(2.00));
        assert_eq!(tx.balance_due, dec!(0));

        let tenders: Vec<_> = tx.live_lines(LineType::Tender).collect();
        let changes: Vec<_> = tx.live_lines(LineType::Change).collect();
        assert_eq!(tenders.len(), 1);
        assert_eq!(tenders[0].extended.amount, dec!(-10.00));
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].extended.amount, dec!(2.00));
    }

    #[test]
    fn test_partial_tenders_accumulate() {
        // S3: 5.00 total, 2.00 + 3.00 cash, then a third payment fails.
        let (engine, session) = engine();
        let tx = engine.start_transaction(&session, "USD").unwrap();
        engine
            .add_line_item(
                &session,
                &tx.id,
                LineItemRequest::new("TEA", 1, usd(dec!(5.00))),
            )
            .unwrap();

        let tx1 = engine
            .process_payment(&session, &tx.id, dec!(2.00), "cash")
            .unwrap();
        assert_eq!(tx1.state, TransactionState::ItemsPending);
        assert_eq!(tx1.tendered, dec!(2.00));
        assert_eq!(tx1.live_lines(LineType::Change).count(), 0);

        let tx2 = engine
            .process_payment(&session, &tx.id, dec!(3.00), "cash")
            .unwrap();
        assert_eq!(tx2.state, TransactionState::EndOfTransaction);
        assert_eq!(tx2.tendered, dec!(5.00));
        assert_eq!(tx2.change_due, dec!(0));
        assert_eq!(tx2.live_lines(LineType::Tender).count(), 2);
        assert_eq!(tx2.live_lines(LineType::Change).count(), 0);

        let err = engine
            .process_payment(&session, &tx.id, dec!(1.00), "cash")
            .unwrap_err();
        assert!(matches!(err, KernelError::TerminalState { .. }));
    }

    #[test]
    fn test_modifier_cascade_void() {
        // S4: drink with two linked modifier lines; voiding the parent voids
        // everything and the total drops to zero.
        let (engine, session) = engine();
        let tx = engine.start_transaction(&session, "USD").unwrap();
        let tx = engine
            .add_line_item(
                &session,
                &tx.id,
                LineItemRequest::new("DRINK", 1, usd(dec!(5.00))),
            )
            .unwrap();
        let parent_id = tx.lines[0].line_item_id.clone();

        let tx = engine
            .add_line_item(
                &session,
                &tx.id,
                LineItemRequest::new("MOD_ICED", 1, usd(dec!(0.10))).child_of(parent_id.clone()),
            )
            .unwrap();
        assert_eq!(tx.lines[1].display_indent_level, 1);

        let tx = engine
            .add_line_item(
                &session,
                &tx.id,
                LineItemRequest::new("MOD_LESS_SUGAR", 1, usd(dec!(0.00)))
                    .child_of(parent_id.clone()),
            )
            .unwrap();
        assert_eq!(tx.total, dec!(5.10));

        let tx = engine
            .void_line_item(&session, &tx.id, &parent_id, Some("customer changed mind"))
            .unwrap();
        assert!(tx.lines.iter().all(|l| l.is_voided));
        assert_eq!(tx.total, dec!(0));
        assert_eq!(
            tx.lines[0].void_reason.as_deref(),
            Some("customer changed mind")
        );
    }

    #[test]
    fn test_non_cash_overpay_rejected() {
        // S5: exact card payment settles; overpay on card is rejected with
        // no tender line appended.
        let (engine, session) = engine();
        let tx = engine.start_transaction(&session, "USD").unwrap();
        engine
            .add_line_item(
                &session,
                &tx.id,
                LineItemRequest::new("BOOK", 1, usd(dec!(5.00))),
            )
            .unwrap();
        let tx = engine
            .process_payment(&session, &tx.id, dec!(5.00), "card")
            .unwrap();
        assert_eq!(tx.state, TransactionState::EndOfTransaction);

        let tx2 = engine.start_transaction(&session, "USD").unwrap();
        engine
            .add_line_item(
                &session,
                &tx2.id,
                LineItemRequest::new("BOOK", 1, usd(dec!(5.00))),
            )
            .unwrap();
        let err = engine
            .process_payment(&session, &tx2.id, dec!(10.00), "card")
            .unwrap_err();
        assert!(matches!(err, KernelError::OverpaymentNotAllowed { .. }));

        let after = engine.get_transaction(&session, &tx2.id).unwrap();
        assert_eq!(after.state, TransactionState::ItemsPending);
        assert_eq!(after.live_lines(LineType::Tender).count(), 0);
    }

    #[test]
    fn test_rejections() {
        let (engine, session) = engine();
        let tx = engine.start_transaction(&session, "USD").unwrap();

        // Blank currency.
        assert!(engine.start_transaction(&session, "  ").is_err());

        // Non-positive quantity, negative price.
        assert!(engine
            .add_line_item(&session, &tx.id, LineItemRequest::new("X", 0, usd(dec!(1))))
            .is_err());
        assert!(engine
            .add_line_item(
                &session,
                &tx.id,
                LineItemRequest::new("X", 1, usd(dec!(-1)))
            )
            .is_err());

        // Currency mismatch at line construction.
        let err = engine
            .add_line_item(
                &session,
                &tx.id,
                LineItemRequest::new("X", 1, Money::new(dec!(1), "EUR")),
            )
            .unwrap_err();
        assert!(matches!(err, KernelError::CurrencyMismatch { .. }));

        // Payment on a transaction with no item lines.
        let err = engine
            .process_payment(&session, &tx.id, dec!(1.00), "cash")
            .unwrap_err();
        assert!(matches!(err, KernelError::EmptyTransaction(_)));

        // Unknown parent line.
        let err = engine
            .add_line_item(
                &session,
                &tx.id,
                LineItemRequest::new("X", 1, usd(dec!(1))).child_of(LineItemId::new("ghost")),
            )
            .unwrap_err();
        assert!(matches!(err, KernelError::UnknownLineItem(_)));
    }

    #[test]
    fn test_closed_session_rejected() {
        let (engine, session) = engine();
        let tx = engine.start_transaction(&session, "USD").unwrap();
        engine.sessions().close_session(&session).unwrap();

        let err = engine
            .add_line_item(&session, &tx.id, LineItemRequest::new("X", 1, usd(dec!(1))))
            .unwrap_err();
        assert!(matches!(err, KernelError::SessionClosed(_)));
    }

    #[test]
    fn test_double_void_rejected_but_cascade_revisit_is_noop() {
        let (engine, session) = engine();
        let tx = engine.start_transaction(&session, "USD").unwrap();
        let tx = engine
            .add_line_item(
                &session,
                &tx.id,
                LineItemRequest::new("DRINK", 1, usd(dec!(5.00))),
            )
            .unwrap();
        let parent_id = tx.lines[0].line_item_id.clone();
        let tx = engine
            .add_line_item(
                &session,
                &tx.id,
                LineItemRequest::new("MOD", 1, usd(dec!(0.50))).child_of(parent_id.clone()),
            )
            .unwrap();
        let child_id = tx.lines[1].line_item_id.clone();

        // Void the child first with its own reason.
        engine
            .void_line_item(&session, &tx.id, &child_id, Some("child reason"))
            .unwrap();
        // Parent cascade revisits the voided child without touching it.
        let tx = engine
            .void_line_item(&session, &tx.id, &parent_id, Some("parent reason"))
            .unwrap();
        assert_eq!(tx.lines[1].void_reason.as_deref(), Some("child reason"));

        let err = engine
            .void_line_item(&session, &tx.id, &parent_id, None)
            .unwrap_err();
        assert!(matches!(err, KernelError::LineAlreadyVoided(_)));
    }

    #[test]
    fn test_void_transaction_is_idempotent_terminal() {
        let (engine, session) = engine();
        let tx = engine.start_transaction(&session, "USD").unwrap();
        engine
            .add_line_item(
                &session,
                &tx.id,
                LineItemRequest::new("DRINK", 1, usd(dec!(5.00))),
            )
            .unwrap();

        let voided = engine
            .void_transaction(&session, &tx.id, Some("walkout"))
            .unwrap();
        assert_eq!(voided.state, TransactionState::Voided);
        assert_eq!(voided.total, dec!(0));
        assert!(voided.lines.iter().all(|l| l.is_voided));

        // Re-void: successful no-op.
        let again = engine.void_transaction(&session, &tx.id, None).unwrap();
        assert_eq!(again.state, TransactionState::Voided);

        // Settled transactions cannot be voided.
        let tx2 = engine.start_transaction(&session, "USD").unwrap();
        engine
            .add_line_item(
                &session,
                &tx2.id,
                LineItemRequest::new("TEA", 1, usd(dec!(2.00))),
            )
            .unwrap();
        engine
            .process_payment(&session, &tx2.id, dec!(2.00), "cash")
            .unwrap();
        assert!(engine.void_transaction(&session, &tx2.id, None).is_err());
    }

    #[test]
    fn test_items_cannot_follow_live_tender() {
        let (engine, session) = engine();
        let tx = engine.start_transaction(&session, "USD").unwrap();
        engine
            .add_line_item(
                &session,
                &tx.id,
                LineItemRequest::new("TEA", 1, usd(dec!(5.00))),
            )
            .unwrap();
        engine
            .process_payment(&session, &tx.id, dec!(2.00), "cash")
            .unwrap();

        let err = engine
            .add_line_item(
                &session,
                &tx.id,
                LineItemRequest::new("MORE", 1, usd(dec!(1.00))),
            )
            .unwrap_err();
        assert!(matches!(err, KernelError::InvalidArgument { .. }));
    }

    #[test]
    fn test_line_identity_is_stable() {
        let (engine, session) = engine();
        let tx = engine.start_transaction(&session, "USD").unwrap();
        let tx = engine
            .add_line_item(
                &session,
                &tx.id,
                LineItemRequest::new("A", 1, usd(dec!(1.00))),
            )
            .unwrap();
        let first_id = tx.lines[0].line_item_id.clone();

        let tx = engine
            .add_line_item(
                &session,
                &tx.id,
                LineItemRequest::new("B", 1, usd(dec!(2.00))),
            )
            .unwrap();
        engine
            .void_line_item(&session, &tx.id, &tx.lines[1].line_item_id, None)
            .unwrap();

        let after = engine.get_transaction(&session, &tx.id).unwrap();
        assert_eq!(after.lines[0].line_item_id, first_id);
        assert_eq!(after.lines[0].line_number, 1);
    }
}
