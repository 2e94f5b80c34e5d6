//! Error types for mylite.
//!
//! This module defines domain-specific error types organized by functional area.

use thiserror::Error;

/// MySQL server error code for `DROP TABLE` on a missing table.
pub const ER_BAD_TABLE_ERROR: u16 = 1051;

/// MySQL server error code for referencing a missing table.
pub const ER_NO_SUCH_TABLE: u16 = 1146;

/// Top-level error type encompassing all possible errors.
#[derive(Error, Debug)]
pub enum MyliteError {
    /// Connection-related errors
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Query execution errors
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Data conversion errors
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Driver-layer errors
    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl MyliteError {
    /// Get the MySQL server error code, if this error originated server-side.
    pub fn server_code(&self) -> Option<u16> {
        match self {
            MyliteError::Query(e) => e.server_code(),
            MyliteError::Driver(e) => e.server_code(),
            _ => None,
        }
    }

    /// Check whether this error means the referenced table does not exist.
    ///
    /// Covers both `DROP TABLE` on a missing table and statements that
    /// reference one.
    pub fn is_unknown_table(&self) -> bool {
        matches!(
            self.server_code(),
            Some(ER_BAD_TABLE_ERROR) | Some(ER_NO_SUCH_TABLE)
        )
    }
}

/// Errors related to database connections.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Failed to establish connection to the database
    #[error("Failed to connect to {host}:{port}: {message}")]
    ConnectionFailed {
        host: String,
        port: u16,
        message: String,
    },

    /// Authentication failure
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid connection parameters
    #[error("Invalid connection parameter '{parameter}': {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Connection string parsing error
    #[error("Failed to parse connection string: {0}")]
    ParseError(String),

    /// Connection timeout
    #[error("Connection timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Connection is closed
    #[error("Connection is closed")]
    ConnectionClosed,
}

/// Errors related to query execution.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Query execution failed
    #[error("Query execution failed: {0}")]
    ExecutionFailed(String),

    /// Server-side error with MySQL error code and SQLSTATE
    #[error("Server error {code} ({state}): {message}")]
    Server {
        code: u16,
        state: String,
        message: String,
    },

    /// Query timeout
    #[error("Query timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Invalid query state
    #[error("Invalid query state: {0}")]
    InvalidState(String),

    /// Parameter binding error
    #[error("Parameter binding error for parameter {index}: {message}")]
    ParameterBindingError { index: usize, message: String },

    /// Result set not available
    #[error("Result set not available: {0}")]
    NoResultSet(String),

    /// Transaction error
    #[error("Transaction error: {0}")]
    TransactionError(String),

    /// Prepared statement has been closed
    #[error("Prepared statement has been closed")]
    StatementClosed,

    /// Cursor has been closed
    #[error("Cursor has been closed")]
    CursorClosed,

    /// Unexpected result set when row count was expected
    #[error("Expected row count but received result set")]
    UnexpectedResultSet,
}

impl QueryError {
    /// Get the MySQL server error code, if any.
    pub fn server_code(&self) -> Option<u16> {
        match self {
            QueryError::Server { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Errors related to data type conversion.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// Unsupported MySQL column type
    #[error("Unsupported MySQL type: {type_name}")]
    UnsupportedType { type_name: String },

    /// Failed to convert value
    #[error("Failed to convert value at row {row}, column {column}: {message}")]
    ValueConversionFailed {
        row: usize,
        column: usize,
        message: String,
    },

    /// Invalid UTF-8 string
    #[error("Invalid UTF-8 string at row {row}, column {column}")]
    InvalidUtf8 { row: usize, column: usize },

    /// Overflow during conversion
    #[error("Numeric overflow at row {row}, column {column}")]
    NumericOverflow { row: usize, column: usize },
}

/// Errors raised by the driver layer.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Server-side error with MySQL error code and SQLSTATE
    #[error("Server error {code} ({state}): {message}")]
    Server {
        code: u16,
        state: String,
        message: String,
    },

    /// Network I/O error
    #[error("Network I/O error: {0}")]
    Io(String),

    /// Wire protocol error
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Connection URL or options error
    #[error("Invalid connection options: {0}")]
    Setup(String),

    /// The backend is not connected
    #[error("Driver is not connected")]
    Disconnected,

    /// Unknown prepared statement handle
    #[error("Unknown prepared statement handle {0}")]
    UnknownStatement(u32),

    /// Row decoding failed
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

impl DriverError {
    /// Get the MySQL server error code, if any.
    pub fn server_code(&self) -> Option<u16> {
        match self {
            DriverError::Server { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<mysql_async::Error> for DriverError {
    fn from(err: mysql_async::Error) -> Self {
        match err {
            mysql_async::Error::Server(e) => DriverError::Server {
                code: e.code,
                state: e.state,
                message: e.message,
            },
            mysql_async::Error::Io(e) => DriverError::Io(e.to_string()),
            mysql_async::Error::Url(e) => DriverError::Setup(e.to_string()),
            mysql_async::Error::Driver(e) => DriverError::Protocol(e.to_string()),
            other => DriverError::Protocol(other.to_string()),
        }
    }
}

impl From<DriverError> for QueryError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Server {
                code,
                state,
                message,
            } => QueryError::Server {
                code,
                state,
                message,
            },
            DriverError::Disconnected => {
                QueryError::InvalidState("Driver is not connected".to_string())
            }
            other => QueryError::ExecutionFailed(other.to_string()),
        }
    }
}
