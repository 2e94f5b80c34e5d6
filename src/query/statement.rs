//! SQL statement handling and execution.
//!
//! This module provides the `Statement` type for executing SQL with
//! positional parameter binding. Parameters always travel as real bind
//! values through the prepared-statement protocol, never as literals
//! spliced into the SQL text.

use crate::driver::DriverBackend;
use crate::error::QueryError;
use crate::query::results::ResultSet;
use crate::types::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

/// Type of SQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementType {
    /// Row-producing query (SELECT, SHOW, DESCRIBE, EXPLAIN)
    Select,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
    /// DDL statement (CREATE, ALTER, DROP, TRUNCATE)
    Ddl,
    /// Transaction control (BEGIN, START TRANSACTION, COMMIT, ROLLBACK)
    Transaction,
    /// USE statement
    Use,
    /// SET statement
    Set,
    /// Unknown or other statement type
    Other,
}

impl StatementType {
    /// Detect statement type from SQL text.
    pub fn from_sql(sql: &str) -> Self {
        let trimmed = sql.trim_start().to_uppercase();

        if trimmed.starts_with("SELECT")
            || trimmed.starts_with("WITH")
            || trimmed.starts_with("SHOW")
            || trimmed.starts_with("DESCRIBE")
            || trimmed.starts_with("EXPLAIN")
        {
            Self::Select
        } else if trimmed.starts_with("INSERT") || trimmed.starts_with("REPLACE") {
            Self::Insert
        } else if trimmed.starts_with("UPDATE") {
            Self::Update
        } else if trimmed.starts_with("DELETE") {
            Self::Delete
        } else if trimmed.starts_with("CREATE")
            || trimmed.starts_with("ALTER")
            || trimmed.starts_with("DROP")
            || trimmed.starts_with("TRUNCATE")
        {
            Self::Ddl
        } else if trimmed.starts_with("BEGIN")
            || trimmed.starts_with("START TRANSACTION")
            || trimmed.starts_with("COMMIT")
            || trimmed.starts_with("ROLLBACK")
        {
            Self::Transaction
        } else if trimmed.starts_with("USE") {
            Self::Use
        } else if trimmed.starts_with("SET") {
            Self::Set
        } else {
            Self::Other
        }
    }

    /// Check if this statement type returns a result set.
    pub fn returns_result_set(&self) -> bool {
        matches!(self, Self::Select)
    }

    /// Check if this statement type returns a row count.
    pub fn returns_row_count(&self) -> bool {
        matches!(self, Self::Insert | Self::Update | Self::Delete)
    }
}

/// Count `?` placeholders outside of quoted literals.
pub(crate) fn count_placeholders(sql: &str) -> usize {
    let mut count = 0;
    let mut quote: Option<char> = None;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                if c == '\\' {
                    chars.next();
                } else if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '?' => count += 1,
                _ => {}
            },
        }
    }

    count
}

/// SQL statement for one-shot execution.
///
/// Supports positional parameter binding and timeout control.
pub struct Statement {
    /// Reference to the driver backend
    backend: Arc<Mutex<dyn DriverBackend>>,
    /// SQL text (may contain `?` placeholders)
    sql: String,
    /// Bound parameters (indexed by position)
    parameters: Vec<Option<Value>>,
    /// Query timeout in milliseconds
    timeout_ms: u64,
    /// Statement type
    statement_type: StatementType,
    /// Whether the statement has been executed
    executed: bool,
}

impl Statement {
    /// Create a new statement.
    pub fn new(backend: Arc<Mutex<dyn DriverBackend>>, sql: String) -> Self {
        let statement_type = StatementType::from_sql(&sql);

        Self {
            backend,
            sql,
            parameters: Vec::new(),
            timeout_ms: 120_000, // 2 minutes default
            statement_type,
            executed: false,
        }
    }

    /// Get the SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Get the statement type.
    pub fn statement_type(&self) -> StatementType {
        self.statement_type
    }

    /// Set query timeout.
    pub fn set_timeout(&mut self, timeout_ms: u64) {
        self.timeout_ms = timeout_ms;
    }

    /// Bind a parameter at the given index (0-based).
    ///
    /// # Errors
    /// Returns `QueryError::ParameterBindingError` if the index exceeds the
    /// number of placeholders in the SQL text.
    pub fn bind<T: Into<Value>>(&mut self, index: usize, value: T) -> Result<(), QueryError> {
        let placeholders = count_placeholders(&self.sql);
        if index >= placeholders {
            return Err(QueryError::ParameterBindingError {
                index,
                message: format!(
                    "Statement has {} placeholder(s), index {} is out of bounds",
                    placeholders, index
                ),
            });
        }

        if index >= self.parameters.len() {
            self.parameters.resize(index + 1, None);
        }

        self.parameters[index] = Some(value.into());
        Ok(())
    }

    /// Bind multiple parameters starting at index 0.
    pub fn bind_all<T: Into<Value> + Clone>(&mut self, params: &[T]) -> Result<(), QueryError> {
        for (index, param) in params.iter().enumerate() {
            self.bind(index, param.clone())?;
        }
        Ok(())
    }

    /// Clear all bound parameters.
    pub fn clear_parameters(&mut self) {
        self.parameters.clear();
    }

    /// Collect bound parameters, verifying every placeholder is bound.
    fn gather_parameters(&self) -> Result<Vec<Value>, QueryError> {
        let placeholders = count_placeholders(&self.sql);

        if self.parameters.len() < placeholders {
            return Err(QueryError::ParameterBindingError {
                index: self.parameters.len(),
                message: "Not enough parameters bound".to_string(),
            });
        }

        self.parameters
            .iter()
            .enumerate()
            .take(placeholders)
            .map(|(index, p)| {
                p.clone().ok_or(QueryError::ParameterBindingError {
                    index,
                    message: "Parameter not bound".to_string(),
                })
            })
            .collect()
    }

    /// Execute the statement.
    ///
    /// Returns a `ResultSet` holding either rows or a row count.
    ///
    /// # Errors
    /// Returns `QueryError` if execution fails or times out.
    pub async fn execute(&mut self) -> Result<ResultSet, QueryError> {
        if self.executed {
            return Err(QueryError::InvalidState(
                "Statement already executed".to_string(),
            ));
        }

        let params = self.gather_parameters()?;

        let timeout_duration = Duration::from_millis(self.timeout_ms);
        let backend = Arc::clone(&self.backend);
        let sql = self.sql.clone();

        let outcome = timeout(timeout_duration, async move {
            let mut backend_guard = backend.lock().await;
            backend_guard.execute(&sql, &params).await
        })
        .await
        .map_err(|_| QueryError::Timeout {
            timeout_ms: self.timeout_ms,
        })??;

        self.executed = true;

        Ok(ResultSet::from_outcome(outcome))
    }

    /// Execute and return the affected-row count (for non-SELECT statements).
    ///
    /// # Errors
    /// Returns `QueryError::UnexpectedResultSet` if the statement produced
    /// rows instead of a row count.
    pub async fn execute_update(&mut self) -> Result<u64, QueryError> {
        let result_set = self.execute().await?;

        result_set
            .row_count()
            .ok_or(QueryError::UnexpectedResultSet)
    }

    /// Reset the statement for re-execution.
    ///
    /// Clears the executed flag but preserves parameters.
    pub fn reset(&mut self) {
        self.executed = false;
    }
}
