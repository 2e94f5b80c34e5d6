//! Prepared statement handling for repeated parameterized execution.
//!
//! This module provides the `PreparedStatement` type for executing a
//! statement prepared once on the server and executed many times with
//! different bind values.

use crate::driver::{DriverBackend, StatementHandle};
use crate::error::QueryError;
use crate::query::results::ResultSet;
use crate::types::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

/// A server-side prepared statement.
///
/// Created via `Connection::prepare`. Parameters are rebound between
/// executions; `close` releases the server-side handle. Executing a closed
/// statement is an error.
pub struct PreparedStatement {
    /// Reference to the driver backend
    backend: Arc<Mutex<dyn DriverBackend>>,
    /// Server-side statement handle
    handle: StatementHandle,
    /// Bound parameter values (indexed by position)
    parameters: Vec<Option<Value>>,
    /// Query timeout in milliseconds
    timeout_ms: u64,
    /// Whether the statement has been closed
    closed: bool,
}

impl PreparedStatement {
    /// Create a new PreparedStatement from a handle.
    pub(crate) fn new(backend: Arc<Mutex<dyn DriverBackend>>, handle: StatementHandle) -> Self {
        let num_params = handle.num_params as usize;
        Self {
            backend,
            handle,
            parameters: vec![None; num_params],
            timeout_ms: 120_000, // 2 minutes default
            closed: false,
        }
    }

    /// Get the number of parameters in this prepared statement.
    pub fn parameter_count(&self) -> usize {
        self.handle.num_params as usize
    }

    /// Get the server-side statement id.
    pub fn id(&self) -> u32 {
        self.handle.id
    }

    /// Check if the prepared statement has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Set query timeout.
    pub fn set_timeout(&mut self, timeout_ms: u64) {
        self.timeout_ms = timeout_ms;
    }

    /// Bind a parameter value at the given index (0-based).
    ///
    /// # Errors
    /// Returns `QueryError::ParameterBindingError` if the index is out of
    /// bounds for the statement's placeholder count.
    pub fn bind(&mut self, index: usize, value: impl Into<Value>) -> Result<(), QueryError> {
        if index >= self.parameters.len() {
            return Err(QueryError::ParameterBindingError {
                index,
                message: format!(
                    "Parameter index {} out of bounds (statement has {} parameters)",
                    index,
                    self.parameters.len()
                ),
            });
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
        for param in &mut self.parameters {
            *param = None;
        }
    }

    /// Collect bound parameters, verifying every placeholder is bound.
    fn gather_parameters(&self) -> Result<Vec<Value>, QueryError> {
        self.parameters
            .iter()
            .enumerate()
            .map(|(index, p)| {
                p.clone().ok_or(QueryError::ParameterBindingError {
                    index,
                    message: "Parameter not bound".to_string(),
                })
            })
            .collect()
    }

    /// Execute the prepared statement.
    ///
    /// # Errors
    /// Returns an error if not all parameters are bound, the statement has
    /// been closed, or execution fails on the server.
    pub async fn execute(&mut self) -> Result<ResultSet, QueryError> {
        if self.closed {
            return Err(QueryError::StatementClosed);
        }

        let params = self.gather_parameters()?;
        let handle = self.handle;
        let backend = Arc::clone(&self.backend);

        let outcome = timeout(Duration::from_millis(self.timeout_ms), async move {
            let mut backend_guard = backend.lock().await;
            backend_guard.execute_prepared(handle, &params).await
        })
        .await
        .map_err(|_| QueryError::Timeout {
            timeout_ms: self.timeout_ms,
        })??;

        Ok(ResultSet::from_outcome(outcome))
    }

    /// Execute and return the affected-row count.
    ///
    /// Use this for INSERT, UPDATE, DELETE statements.
    pub async fn execute_update(&mut self) -> Result<u64, QueryError> {
        let result_set = self.execute().await?;

        result_set
            .row_count()
            .ok_or(QueryError::UnexpectedResultSet)
    }

    /// Close the statement, releasing the server-side handle.
    ///
    /// # Errors
    /// Returns `QueryError` if the server rejects the close.
    pub async fn close(&mut self) -> Result<(), QueryError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut backend = self.backend.lock().await;
        backend.close_statement(self.handle).await?;
        Ok(())
    }
}

impl std::fmt::Debug for PreparedStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedStatement")
            .field("id", &self.handle.id)
            .field("parameter_count", &self.parameter_count())
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverOpts, ExecOutcome, ServerInfo};
    use crate::error::DriverError;
    use async_trait::async_trait;
    use mockall::mock;

    mock! {
        pub Backend {}

        #[async_trait]
        impl DriverBackend for Backend {
            async fn connect(&mut self, opts: &DriverOpts) -> Result<ServerInfo, DriverError>;
            async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecOutcome, DriverError>;
            async fn prepare(&mut self, sql: &str) -> Result<StatementHandle, DriverError>;
            async fn execute_prepared(&mut self, handle: StatementHandle, params: &[Value]) -> Result<ExecOutcome, DriverError>;
            async fn close_statement(&mut self, handle: StatementHandle) -> Result<(), DriverError>;
            async fn set_autocommit(&mut self, enabled: bool) -> Result<(), DriverError>;
            async fn commit(&mut self) -> Result<(), DriverError>;
            async fn rollback(&mut self) -> Result<(), DriverError>;
            async fn ping(&mut self) -> Result<(), DriverError>;
            async fn close(&mut self) -> Result<(), DriverError>;
            fn is_connected(&self) -> bool;
            fn last_insert_id(&self) -> Option<u64>;
            fn affected_rows(&self) -> u64;
        }
    }

    fn handle() -> StatementHandle {
        StatementHandle {
            id: 1,
            num_params: 2,
        }
    }

    #[test]
    fn test_prepared_parameter_count() {
        let backend: Arc<Mutex<dyn DriverBackend>> = Arc::new(Mutex::new(MockBackend::new()));
        let stmt = PreparedStatement::new(backend, handle());

        assert_eq!(stmt.parameter_count(), 2);
        assert_eq!(stmt.id(), 1);
        assert!(!stmt.is_closed());
    }

    #[test]
    fn test_prepared_bind_out_of_bounds() {
        let backend: Arc<Mutex<dyn DriverBackend>> = Arc::new(Mutex::new(MockBackend::new()));
        let mut stmt = PreparedStatement::new(backend, handle());

        assert!(stmt.bind(0, 1).is_ok());
        assert!(stmt.bind(1, "x").is_ok());
        assert!(stmt.bind(2, 3).is_err());
    }

    #[tokio::test]
    async fn test_prepared_execute_requires_all_bindings() {
        let backend: Arc<Mutex<dyn DriverBackend>> = Arc::new(Mutex::new(MockBackend::new()));
        let mut stmt = PreparedStatement::new(backend, handle());

        stmt.bind(0, 1).unwrap();
        let err = stmt.execute().await.unwrap_err();
        assert!(matches!(
            err,
            QueryError::ParameterBindingError { index: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_prepared_rebind_and_execute() {
        let mut mock_backend = MockBackend::new();
        mock_backend
            .expect_execute_prepared()
            .times(1)
            .returning(|h, p| {
                assert_eq!(h.id, 1);
                assert_eq!(p, &[Value::Int(1), Value::from("foo")][..]);
                Ok(ExecOutcome::RowCount {
                    affected: 1,
                    last_insert_id: None,
                })
            });
        mock_backend
            .expect_execute_prepared()
            .times(1)
            .returning(|h, p| {
                assert_eq!(h.id, 1);
                assert_eq!(p, &[Value::Int(2), Value::from("bar")][..]);
                Ok(ExecOutcome::RowCount {
                    affected: 1,
                    last_insert_id: None,
                })
            });

        let backend: Arc<Mutex<dyn DriverBackend>> = Arc::new(Mutex::new(mock_backend));
        let mut stmt = PreparedStatement::new(backend, handle());

        stmt.bind_all(&[Value::Int(1), Value::from("foo")]).unwrap();
        assert_eq!(stmt.execute_update().await.unwrap(), 1);

        stmt.bind_all(&[Value::Int(2), Value::from("bar")]).unwrap();
        assert_eq!(stmt.execute_update().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_prepared_execute_after_close_fails() {
        let mut mock_backend = MockBackend::new();
        mock_backend
            .expect_close_statement()
            .times(1)
            .returning(|_h| Ok(()));

        let backend: Arc<Mutex<dyn DriverBackend>> = Arc::new(Mutex::new(mock_backend));
        let mut stmt = PreparedStatement::new(backend, handle());

        stmt.close().await.unwrap();
        assert!(stmt.is_closed());

        let err = stmt.execute().await.unwrap_err();
        assert!(matches!(err, QueryError::StatementClosed));

        // Closing twice is a no-op
        stmt.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_prepared_clear_parameters() {
        let backend: Arc<Mutex<dyn DriverBackend>> = Arc::new(Mutex::new(MockBackend::new()));
        let mut stmt = PreparedStatement::new(backend, handle());

        stmt.bind(0, 1).unwrap();
        stmt.bind(1, 2).unwrap();
        stmt.clear_parameters();

        let err = stmt.execute().await.unwrap_err();
        assert!(matches!(err, QueryError::ParameterBindingError { .. }));
    }
}
