//! # Session Manager
//!
//! Issues, validates, and closes operator sessions keyed by
//! `(terminal_id, operator_id)`.
//!
//! ## Thread Safety
//! Sessions live in a concurrent map; every kernel mutation begins with a
//! constant-time `validate` lookup, so the manager must tolerate concurrent
//! sessions without a global lock.
//!
//! ## Lifecycle
//! ```text
//! create_session ──► live ──close_session──► closed (terminal)
//!                     │                         │
//!                validate: Ok              validate: Err(SessionClosed)
//!
//! close_session on a closed session: no-op (idempotent)
//! ```

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{KernelError, KernelResult};
use crate::ids::SessionId;
use crate::validation::require_non_blank;

/// An operator session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub terminal_id: String,
    pub operator_id: String,
    pub created_utc: DateTime<Utc>,
    pub closed: bool,
}

/// Concurrent registry of operator sessions.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: DashMap<SessionId, Session>,
}

impl SessionManager {
    pub fn new() -> Self {
        SessionManager {
            sessions: DashMap::new(),
        }
    }

    /// Creates a session for an operator at a terminal.
    ///
    /// Fails when either identifier is blank.
    pub fn create_session(&self, terminal_id: &str, operator_id: &str) -> KernelResult<SessionId> {
        require_non_blank("terminalId", terminal_id)?;
        require_non_blank("operatorId", operator_id)?;

        let id = SessionId::generate();
        let session = Session {
            id: id.clone(),
            terminal_id: terminal_id.trim().to_string(),
            operator_id: operator_id.trim().to_string(),
            created_utc: Utc::now(),
            closed: false,
        };

        debug!(session = %id, terminal = %session.terminal_id, operator = %session.operator_id, "session created");
        self.sessions.insert(id.clone(), session);
        Ok(id)
    }

    /// Fails when the session is unknown or closed. Called at the head of
    /// every kernel mutation.
    pub fn validate(&self, id: &SessionId) -> KernelResult<()> {
        match self.sessions.get(id) {
            None => Err(KernelError::UnknownSession(id.clone())),
            Some(s) if s.closed => Err(KernelError::SessionClosed(id.clone())),
            Some(_) => Ok(()),
        }
    }

    /// Closes a session. Re-closing a closed session is a no-op; operations
    /// referencing it afterwards fail through [`SessionManager::validate`].
    pub fn close_session(&self, id: &SessionId) -> KernelResult<()> {
        match self.sessions.get_mut(id) {
            None => Err(KernelError::UnknownSession(id.clone())),
            Some(mut s) => {
                if !s.closed {
                    s.closed = true;
                    debug!(session = %id, "session closed");
                }
                Ok(())
            }
        }
    }

    /// Read-only snapshot, mainly for hosts and tests.
    pub fn get(&self, id: &SessionId) -> Option<Session> {
        self.sessions.get(id).map(|s| s.clone())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_validate() {
        let mgr = SessionManager::new();
        let id = mgr.create_session("TERM1", "OP1").unwrap();
        assert!(mgr.validate(&id).is_ok());

        let s = mgr.get(&id).unwrap();
        assert_eq!(s.terminal_id, "TERM1");
        assert_eq!(s.operator_id, "OP1");
        assert!(!s.closed);
    }

    #[test]
    fn test_blank_identifiers_rejected() {
        let mgr = SessionManager::new();
        assert!(mgr.create_session("", "OP1").is_err());
        assert!(mgr.create_session("TERM1", "  ").is_err());
    }

    #[test]
    fn test_unknown_session_fails_validation() {
        let mgr = SessionManager::new();
        let err = mgr.validate(&SessionId::new("nope")).unwrap_err();
        assert!(matches!(err, KernelError::UnknownSession(_)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mgr = SessionManager::new();
        let id = mgr.create_session("TERM1", "OP1").unwrap();

        mgr.close_session(&id).unwrap();
        // Second close: no-op, still Ok.
        mgr.close_session(&id).unwrap();

        let err = mgr.validate(&id).unwrap_err();
        assert!(matches!(err, KernelError::SessionClosed(_)));
    }
}
