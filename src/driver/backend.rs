//! Backend abstraction trait.
//!
//! This module defines the `DriverBackend` trait that abstracts the
//! underlying MySQL driver. The production implementation wraps
//! `mysql_async`; unit tests substitute a mock.

use crate::error::DriverError;
use crate::types::{MysqlType, Value};
use async_trait::async_trait;
use std::fmt;

/// Low-level options for establishing a server connection.
#[derive(Clone)]
pub struct DriverOpts {
    /// Server host
    pub host: String,
    /// Server TCP port
    pub port: u16,
    /// Unix socket path, preferred over TCP when set
    pub socket: Option<String>,
    /// Username
    pub username: String,
    /// Password
    password: String,
    /// Default database (schema) to select on connect
    pub database: Option<String>,
}

impl DriverOpts {
    /// Create options for a TCP connection.
    pub fn new(host: String, port: u16, username: String, password: String) -> Self {
        Self {
            host,
            port,
            socket: None,
            username,
            password,
            database: None,
        }
    }

    /// Select a default database on connect.
    pub fn with_database(mut self, database: Option<String>) -> Self {
        self.database = database;
        self
    }

    /// Connect through a Unix socket instead of TCP.
    pub fn with_socket(mut self, socket: Option<String>) -> Self {
        self.socket = socket;
        self
    }

    /// Get the password (for internal use only, never logged).
    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

// Prevent the password from appearing in debug output
impl fmt::Debug for DriverOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverOpts")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("socket", &self.socket)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

/// Server information returned by a successful handshake.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    /// Server-assigned connection (thread) id
    pub connection_id: u32,
    /// Server version string as reported by `SELECT VERSION()`
    pub server_version: String,
}

/// Metadata for one column of a result set.
#[derive(Debug, Clone)]
pub struct ColumnMeta {
    /// Column name
    pub name: String,
    /// Column type
    pub ty: MysqlType,
    /// BINARY flag; distinguishes BLOB from TEXT, which share a wire type
    pub binary: bool,
}

/// Handle to a server-side prepared statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementHandle {
    /// Server-assigned statement id
    pub id: u32,
    /// Number of `?` placeholders in the statement
    pub num_params: u16,
}

/// Outcome of executing one statement.
#[derive(Debug, Clone)]
pub enum ExecOutcome {
    /// Statement did not produce rows (DDL/DML)
    RowCount {
        /// Rows affected
        affected: u64,
        /// AUTO_INCREMENT id generated by the statement, if any
        last_insert_id: Option<u64>,
    },
    /// Statement produced a result set
    Rows {
        /// Result set column metadata, in order
        columns: Vec<ColumnMeta>,
        /// Decoded rows, in server order
        rows: Vec<Vec<Value>>,
    },
}

impl ExecOutcome {
    /// Get the affected-row count, if this outcome is a row count.
    pub fn affected(&self) -> Option<u64> {
        match self {
            ExecOutcome::RowCount { affected, .. } => Some(*affected),
            ExecOutcome::Rows { .. } => None,
        }
    }
}

/// Backend trait for MySQL communication.
///
/// All methods take `&mut self`: a MySQL connection processes one command
/// at a time, and callers serialize access behind a lock.
#[async_trait]
pub trait DriverBackend: Send + Sync {
    /// Connect and authenticate.
    ///
    /// # Errors
    /// Returns `DriverError` if the connection or handshake fails.
    async fn connect(&mut self, opts: &DriverOpts) -> Result<ServerInfo, DriverError>;

    /// Execute a statement.
    ///
    /// Statements without parameters go through the text protocol;
    /// parameterized statements are prepared server-side and executed with
    /// bound values.
    ///
    /// # Errors
    /// Returns `DriverError` on server errors, I/O failures, or row
    /// decoding failures.
    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecOutcome, DriverError>;

    /// Prepare a statement for repeated execution.
    async fn prepare(&mut self, sql: &str) -> Result<StatementHandle, DriverError>;

    /// Execute a previously prepared statement with bound values.
    async fn execute_prepared(
        &mut self,
        handle: StatementHandle,
        params: &[Value],
    ) -> Result<ExecOutcome, DriverError>;

    /// Release a server-side prepared statement.
    async fn close_statement(&mut self, handle: StatementHandle) -> Result<(), DriverError>;

    /// Enable or disable autocommit on the session.
    async fn set_autocommit(&mut self, enabled: bool) -> Result<(), DriverError>;

    /// Commit the current transaction.
    async fn commit(&mut self) -> Result<(), DriverError>;

    /// Roll back the current transaction.
    async fn rollback(&mut self) -> Result<(), DriverError>;

    /// Check the connection is alive.
    async fn ping(&mut self) -> Result<(), DriverError>;

    /// Close the connection.
    async fn close(&mut self) -> Result<(), DriverError>;

    /// Check whether the backend currently holds a live connection.
    fn is_connected(&self) -> bool;

    /// AUTO_INCREMENT id generated by the most recent statement, if any.
    fn last_insert_id(&self) -> Option<u64>;

    /// Rows affected by the most recent statement.
    fn affected_rows(&self) -> u64;
}
