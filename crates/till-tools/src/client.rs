//! # Kernel Client
//!
//! The transport-neutral surface over the transaction engine - the direct
//! in-process reference binding. Every operation validates its session and
//! returns a result envelope; the client adds no pricing or policy of its
//! own.
//!
//! ## Surface
//! ```text
//! create_session(terminal, operator)            → session id
//! start_transaction(session, currency)          → envelope
//! add_line_item(session, tx, request)           → envelope
//! process_payment(session, tx, amount, tender)  → envelope
//! void_line_item(session, tx, line, reason?)    → envelope
//! void_transaction(session, tx, reason?)        → envelope
//! get_transaction(session, tx)                  → envelope
//! close_session(session)
//! ```

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::debug;

use till_core::{
    KernelResult, LineItemId, LineItemRequest, OperationResult, SessionId, SessionManager,
    TransactionEngine, TransactionId,
};

/// In-process kernel client.
pub struct KernelClient {
    engine: Arc<TransactionEngine>,
}

impl KernelClient {
    pub fn new(engine: Arc<TransactionEngine>) -> Self {
        KernelClient { engine }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        self.engine.sessions()
    }

    pub async fn create_session(
        &self,
        terminal_id: &str,
        operator_id: &str,
    ) -> KernelResult<SessionId> {
        self.engine.sessions().create_session(terminal_id, operator_id)
    }

    pub async fn start_transaction(&self, session: &SessionId, currency: &str) -> OperationResult {
        debug!(session = %session, currency = %currency, "start_transaction");
        self.engine.start_transaction(session, currency).into()
    }

    pub async fn add_line_item(
        &self,
        session: &SessionId,
        tx: &TransactionId,
        request: LineItemRequest,
    ) -> OperationResult {
        debug!(session = %session, transaction = %tx, product = %request.product_id, "add_line_item");
        self.engine.add_line_item(session, tx, request).into()
    }

    pub async fn process_payment(
        &self,
        session: &SessionId,
        tx: &TransactionId,
        amount: Decimal,
        payment_type: &str,
    ) -> OperationResult {
        debug!(session = %session, transaction = %tx, amount = %amount, tender = %payment_type, "process_payment");
        self.engine
            .process_payment(session, tx, amount, payment_type)
            .into()
    }

    pub async fn void_line_item(
        &self,
        session: &SessionId,
        tx: &TransactionId,
        line: &LineItemId,
        reason: Option<&str>,
    ) -> OperationResult {
        debug!(session = %session, transaction = %tx, line = %line, "void_line_item");
        self.engine.void_line_item(session, tx, line, reason).into()
    }

    pub async fn void_transaction(
        &self,
        session: &SessionId,
        tx: &TransactionId,
        reason: Option<&str>,
    ) -> OperationResult {
        debug!(session = %session, transaction = %tx, "void_transaction");
        self.engine.void_transaction(session, tx, reason).into()
    }

    pub async fn get_transaction(&self, session: &SessionId, tx: &TransactionId) -> OperationResult {
        self.engine.get_transaction(session, tx).into()
    }

    pub async fn close_session(&self, session: &SessionId) -> KernelResult<()> {
        self.engine.sessions().close_session(session)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
