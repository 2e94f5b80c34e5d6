//! Session state tracking for MySQL connections.
//!
//! This module tracks the lifecycle of one connection: its state machine,
//! the transaction flag, and the schema selected on the server.

use crate::driver::ServerInfo;
use crate::error::ConnectionError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Default query execution timeout
    pub query_timeout: Duration,

    /// Whether the session starts in autocommit mode
    pub auto_commit: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(120),
            auto_commit: true,
        }
    }
}

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session is connected and ready
    Ready,

    /// Session is executing a statement
    Executing,

    /// Session is in an explicit transaction
    InTransaction,

    /// Session is being closed
    Closing,

    /// Session is closed
    Closed,

    /// Session encountered an unrecoverable error
    Error,
}

impl SessionState {
    /// Check if the session is active.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionState::Ready | SessionState::Executing | SessionState::InTransaction
        )
    }

    /// Check if the session can execute statements.
    pub fn can_execute(&self) -> bool {
        matches!(self, SessionState::Ready | SessionState::InTransaction)
    }
}

/// Per-connection session information and state tracking.
pub struct Session {
    /// Server handshake information
    server_info: ServerInfo,

    /// Session configuration
    config: SessionConfig,

    /// Current session state
    state: Arc<RwLock<SessionState>>,

    /// Last activity timestamp
    last_activity: Arc<RwLock<Instant>>,

    /// Statement execution counter
    query_count: AtomicU64,

    /// Transaction active flag
    in_transaction: AtomicBool,

    /// Database currently selected on the server
    current_database: Arc<RwLock<Option<String>>>,
}

impl Session {
    /// Create a new session.
    pub fn new(server_info: ServerInfo, config: SessionConfig) -> Self {
        Self {
            server_info,
            config,
            state: Arc::new(RwLock::new(SessionState::Ready)),
            last_activity: Arc::new(RwLock::new(Instant::now())),
            query_count: AtomicU64::new(0),
            in_transaction: AtomicBool::new(false),
            current_database: Arc::new(RwLock::new(None)),
        }
    }

    /// Get the server-assigned connection id.
    pub fn connection_id(&self) -> u32 {
        self.server_info.connection_id
    }

    /// Get server handshake information.
    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Get session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get current session state.
    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    /// Set session state.
    pub async fn set_state(&self, new_state: SessionState) {
        let mut state = self.state.write().await;
        *state = new_state;
    }

    /// Update last activity timestamp.
    pub async fn update_activity(&self) {
        let mut last_activity = self.last_activity.write().await;
        *last_activity = Instant::now();
    }

    /// Get time since last activity.
    pub async fn idle_duration(&self) -> Duration {
        let last_activity = self.last_activity.read().await;
        last_activity.elapsed()
    }

    /// Increment statement counter.
    pub fn increment_query_count(&self) -> u64 {
        self.query_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Get total statement count.
    pub fn query_count(&self) -> u64 {
        self.query_count.load(Ordering::SeqCst)
    }

    /// Check if in transaction.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction.load(Ordering::SeqCst)
    }

    /// Begin a transaction.
    ///
    /// Transactions do not nest: beginning one while another is active is
    /// an error.
    pub async fn begin_transaction(&self) -> Result<(), ConnectionError> {
        let state = self.state().await;
        if !state.can_execute() {
            return Err(ConnectionError::ConnectionClosed);
        }

        if self.in_transaction() {
            return Err(ConnectionError::InvalidParameter {
                parameter: "transaction".to_string(),
                message: "Transaction already active".to_string(),
            });
        }

        self.in_transaction.store(true, Ordering::SeqCst);
        self.set_state(SessionState::InTransaction).await;
        self.update_activity().await;

        Ok(())
    }

    /// Commit the current transaction.
    pub async fn commit_transaction(&self) -> Result<(), ConnectionError> {
        if !self.in_transaction() {
            return Err(ConnectionError::InvalidParameter {
                parameter: "transaction".to_string(),
                message: "No active transaction".to_string(),
            });
        }

        self.in_transaction.store(false, Ordering::SeqCst);
        self.set_state(SessionState::Ready).await;
        self.update_activity().await;

        Ok(())
    }

    /// Rollback the current transaction.
    pub async fn rollback_transaction(&self) -> Result<(), ConnectionError> {
        if !self.in_transaction() {
            return Err(ConnectionError::InvalidParameter {
                parameter: "transaction".to_string(),
                message: "No active transaction".to_string(),
            });
        }

        self.in_transaction.store(false, Ordering::SeqCst);
        self.set_state(SessionState::Ready).await;
        self.update_activity().await;

        Ok(())
    }

    /// Get the currently selected database.
    pub async fn current_database(&self) -> Option<String> {
        self.current_database.read().await.clone()
    }

    /// Record the currently selected database.
    pub async fn set_current_database(&self, database: Option<String>) {
        let mut current_database = self.current_database.write().await;
        *current_database = database;
        self.update_activity().await;
    }

    /// Close the session.
    pub async fn close(&self) -> Result<(), ConnectionError> {
        self.set_state(SessionState::Closing).await;

        // A transaction left open at close is discarded by the server
        if self.in_transaction() {
            self.in_transaction.store(false, Ordering::SeqCst);
        }

        self.set_state(SessionState::Closed).await;

        Ok(())
    }

    /// Check if session is closed.
    pub async fn is_closed(&self) -> bool {
        matches!(self.state().await, SessionState::Closed)
    }

    /// Mark session as having an error.
    pub async fn mark_error(&self) {
        self.set_state(SessionState::Error).await;
    }

    /// Validate session is ready for operations.
    pub async fn validate_ready(&self) -> Result<(), ConnectionError> {
        let state = self.state().await;

        match state {
            SessionState::Closed => Err(ConnectionError::ConnectionClosed),
            SessionState::Error => Err(ConnectionError::InvalidParameter {
                parameter: "session".to_string(),
                message: "Session is in error state".to_string(),
            }),
            SessionState::Closing => Err(ConnectionError::ConnectionClosed),
            _ if !state.is_active() => Err(ConnectionError::InvalidParameter {
                parameter: "session".to_string(),
                message: format!("Session is not active: {:?}", state),
            }),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("connection_id", &self.connection_id())
            .field("config", &self.config)
            .field("query_count", &self.query_count())
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_server_info() -> ServerInfo {
        ServerInfo {
            connection_id: 42,
            server_version: "8.0.36".to_string(),
        }
    }

    #[tokio::test]
    async fn test_session_creation() {
        let session = Session::new(mock_server_info(), SessionConfig::default());

        assert_eq!(session.connection_id(), 42);
        assert_eq!(session.state().await, SessionState::Ready);
        assert_eq!(session.query_count(), 0);
        assert!(!session.in_transaction());
    }

    #[tokio::test]
    async fn test_session_state_transitions() {
        let session = Session::new(mock_server_info(), SessionConfig::default());

        assert_eq!(session.state().await, SessionState::Ready);

        session.set_state(SessionState::Executing).await;
        assert_eq!(session.state().await, SessionState::Executing);

        session.set_state(SessionState::Closed).await;
        assert_eq!(session.state().await, SessionState::Closed);
    }

    #[tokio::test]
    async fn test_session_query_counter() {
        let session = Session::new(mock_server_info(), SessionConfig::default());

        assert_eq!(session.increment_query_count(), 1);
        assert_eq!(session.increment_query_count(), 2);
        assert_eq!(session.query_count(), 2);
    }

    #[tokio::test]
    async fn test_session_transaction() {
        let session = Session::new(mock_server_info(), SessionConfig::default());

        assert!(!session.in_transaction());

        // Begin transaction
        session.begin_transaction().await.unwrap();
        assert!(session.in_transaction());
        assert_eq!(session.state().await, SessionState::InTransaction);

        // Cannot begin another transaction
        let result = session.begin_transaction().await;
        assert!(result.is_err());

        // Commit transaction
        session.commit_transaction().await.unwrap();
        assert!(!session.in_transaction());
        assert_eq!(session.state().await, SessionState::Ready);
    }

    #[tokio::test]
    async fn test_session_rollback() {
        let session = Session::new(mock_server_info(), SessionConfig::default());

        session.begin_transaction().await.unwrap();
        assert!(session.in_transaction());

        session.rollback_transaction().await.unwrap();
        assert!(!session.in_transaction());
        assert_eq!(session.state().await, SessionState::Ready);
    }

    #[tokio::test]
    async fn test_commit_without_transaction_fails() {
        let session = Session::new(mock_server_info(), SessionConfig::default());

        assert!(session.commit_transaction().await.is_err());
        assert!(session.rollback_transaction().await.is_err());
    }

    #[tokio::test]
    async fn test_session_database() {
        let session = Session::new(mock_server_info(), SessionConfig::default());

        assert!(session.current_database().await.is_none());

        session.set_current_database(Some("foo".to_string())).await;
        assert_eq!(session.current_database().await, Some("foo".to_string()));

        session.set_current_database(None).await;
        assert!(session.current_database().await.is_none());
    }

    #[tokio::test]
    async fn test_session_activity() {
        let session = Session::new(mock_server_info(), SessionConfig::default());

        session.update_activity().await;

        let idle = session.idle_duration().await;
        assert!(idle < Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(10)).await;
        let idle = session.idle_duration().await;
        assert!(idle >= Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_session_close() {
        let session = Session::new(mock_server_info(), SessionConfig::default());

        assert!(!session.is_closed().await);

        session.close().await.unwrap();
        assert!(session.is_closed().await);
        assert_eq!(session.state().await, SessionState::Closed);
    }

    #[tokio::test]
    async fn test_session_close_discards_transaction() {
        let session = Session::new(mock_server_info(), SessionConfig::default());

        session.begin_transaction().await.unwrap();
        session.close().await.unwrap();

        assert!(!session.in_transaction());
        assert!(session.is_closed().await);
    }

    #[tokio::test]
    async fn test_session_validate_ready() {
        let session = Session::new(mock_server_info(), SessionConfig::default());

        // Ready state should validate
        assert!(session.validate_ready().await.is_ok());

        // Closed state should fail
        session.set_state(SessionState::Closed).await;
        assert!(session.validate_ready().await.is_err());

        // Error state should fail
        session.set_state(SessionState::Error).await;
        assert!(session.validate_ready().await.is_err());
    }

    #[test]
    fn test_session_state_checks() {
        assert!(SessionState::Ready.is_active());
        assert!(SessionState::Executing.is_active());
        assert!(!SessionState::Closed.is_active());
        assert!(!SessionState::Error.is_active());

        assert!(SessionState::Ready.can_execute());
        assert!(SessionState::InTransaction.can_execute());
        assert!(!SessionState::Executing.can_execute());
        assert!(!SessionState::Closed.can_execute());
    }
}
