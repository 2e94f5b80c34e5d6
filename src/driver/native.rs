//! Production backend over `mysql_async`.
//!
//! The wire protocol, authentication, and TLS are owned by `mysql_async`;
//! this module adapts its connection type to the `DriverBackend` seam and
//! decodes raw wire values into mylite values.

use crate::driver::backend::{
    ColumnMeta, DriverBackend, DriverOpts, ExecOutcome, ServerInfo, StatementHandle,
};
use crate::error::DriverError;
use crate::types::{decode, MysqlType, Value};
use async_trait::async_trait;
use mysql_async::consts::ColumnFlags;
use mysql_async::prelude::*;
use mysql_async::{Conn, Opts, OptsBuilder, Params, QueryResult};
use std::collections::HashMap;
use tracing::debug;

/// `DriverBackend` implementation backed by a `mysql_async` connection.
pub struct NativeBackend {
    /// Live connection, present between `connect` and `close`
    conn: Option<Conn>,
    /// Server-side prepared statements by id
    statements: HashMap<u32, mysql_async::Statement>,
    /// AUTO_INCREMENT id from the most recent statement
    last_insert_id: Option<u64>,
    /// Rows affected by the most recent statement
    affected_rows: u64,
}

impl NativeBackend {
    /// Create a backend with no connection.
    pub fn new() -> Self {
        Self {
            conn: None,
            statements: HashMap::new(),
            last_insert_id: None,
            affected_rows: 0,
        }
    }

    fn conn_mut(&mut self) -> Result<&mut Conn, DriverError> {
        self.conn.as_mut().ok_or(DriverError::Disconnected)
    }

    fn build_opts(opts: &DriverOpts) -> Opts {
        let mut builder = OptsBuilder::default()
            .ip_or_hostname(opts.host.clone())
            .tcp_port(opts.port)
            .user(Some(opts.username.clone()))
            .pass(Some(opts.password().to_string()))
            .db_name(opts.database.clone());

        if opts.socket.is_some() {
            builder = builder.socket(opts.socket.clone());
        }

        Opts::from(builder)
    }

    fn remember(&mut self, outcome: &ExecOutcome) {
        match outcome {
            ExecOutcome::RowCount {
                affected,
                last_insert_id,
            } => {
                self.affected_rows = *affected;
                self.last_insert_id = *last_insert_id;
            }
            ExecOutcome::Rows { rows, .. } => {
                self.affected_rows = rows.len() as u64;
                self.last_insert_id = None;
            }
        }
    }

    fn column_meta(column: &mysql_async::Column) -> Result<ColumnMeta, DriverError> {
        let ty = MysqlType::from_column_type(column.column_type())?;
        Ok(ColumnMeta {
            name: column.name_str().into_owned(),
            ty,
            binary: column.flags().contains(ColumnFlags::BINARY_FLAG),
        })
    }

    async fn drain_result<'a, 't: 'a, P>(
        mut result: QueryResult<'a, 't, P>,
    ) -> Result<ExecOutcome, DriverError>
    where
        P: Protocol,
    {
        let columns = match result.columns() {
            None => {
                return Ok(ExecOutcome::RowCount {
                    affected: result.affected_rows(),
                    last_insert_id: result.last_insert_id(),
                });
            }
            Some(columns) => columns,
        };

        let metas = columns
            .iter()
            .map(Self::column_meta)
            .collect::<Result<Vec<_>, DriverError>>()?;

        let raw_rows: Vec<mysql_async::Row> = result.collect().await?;

        let mut rows = Vec::with_capacity(raw_rows.len());
        for (row_index, raw) in raw_rows.into_iter().enumerate() {
            // Row::unwrap takes every column value; nothing has been taken
            // from the row before this point.
            let raw_values = raw.unwrap();
            let mut values = Vec::with_capacity(raw_values.len());
            for (col_index, raw_value) in raw_values.into_iter().enumerate() {
                let meta = &metas[col_index];
                values.push(decode(raw_value, meta.ty, meta.binary, row_index, col_index)?);
            }
            rows.push(values);
        }

        Ok(ExecOutcome::Rows {
            columns: metas,
            rows,
        })
    }

    fn wire_params(params: &[Value]) -> Params {
        if params.is_empty() {
            Params::Empty
        } else {
            Params::Positional(params.iter().map(Value::to_wire).collect())
        }
    }
}

impl Default for NativeBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DriverBackend for NativeBackend {
    async fn connect(&mut self, opts: &DriverOpts) -> Result<ServerInfo, DriverError> {
        let mut conn = Conn::new(Self::build_opts(opts)).await?;

        let version: Option<String> = conn.query_first("SELECT VERSION()").await?;
        let info = ServerInfo {
            connection_id: conn.id(),
            server_version: version.unwrap_or_default(),
        };

        debug!(
            connection_id = info.connection_id,
            server_version = %info.server_version,
            "connected"
        );

        self.conn = Some(conn);
        Ok(info)
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecOutcome, DriverError> {
        let wire = Self::wire_params(params);
        let conn = self.conn_mut()?;

        debug!(sql, params = params.len(), "execute");

        // Parameterless statements run over the text protocol: MySQL forbids
        // preparing some of them (USE, certain SET forms).
        let outcome = if params.is_empty() {
            let result = conn.query_iter(sql).await?;
            Self::drain_result(result).await?
        } else {
            let result = conn.exec_iter(sql, wire).await?;
            Self::drain_result(result).await?
        };

        self.remember(&outcome);
        Ok(outcome)
    }

    async fn prepare(&mut self, sql: &str) -> Result<StatementHandle, DriverError> {
        let conn = self.conn_mut()?;
        let statement = conn.prep(sql).await?;
        let handle = StatementHandle {
            id: statement.id(),
            num_params: statement.num_params(),
        };
        self.statements.insert(handle.id, statement);
        Ok(handle)
    }

    async fn execute_prepared(
        &mut self,
        handle: StatementHandle,
        params: &[Value],
    ) -> Result<ExecOutcome, DriverError> {
        let statement = self
            .statements
            .get(&handle.id)
            .ok_or(DriverError::UnknownStatement(handle.id))?
            .clone();
        let wire = Self::wire_params(params);

        let conn = self.conn_mut()?;
        let result = conn.exec_iter(&statement, wire).await?;
        let outcome = Self::drain_result(result).await?;

        self.remember(&outcome);
        Ok(outcome)
    }

    async fn close_statement(&mut self, handle: StatementHandle) -> Result<(), DriverError> {
        let statement = self
            .statements
            .remove(&handle.id)
            .ok_or(DriverError::UnknownStatement(handle.id))?;
        self.conn_mut()?.close(statement).await?;
        Ok(())
    }

    async fn set_autocommit(&mut self, enabled: bool) -> Result<(), DriverError> {
        let sql = if enabled {
            "SET autocommit=1"
        } else {
            "SET autocommit=0"
        };
        self.conn_mut()?.query_drop(sql).await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DriverError> {
        self.conn_mut()?.query_drop("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DriverError> {
        self.conn_mut()?.query_drop("ROLLBACK").await?;
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), DriverError> {
        self.conn_mut()?.ping().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.statements.clear();
        if let Some(conn) = self.conn.take() {
            debug!("disconnecting");
            conn.disconnect().await?;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn last_insert_id(&self) -> Option<u64> {
        self.last_insert_id
    }

    fn affected_rows(&self) -> u64 {
        self.affected_rows
    }
}

impl std::fmt::Debug for NativeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeBackend")
            .field("connected", &self.is_connected())
            .field("prepared_statements", &self.statements.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> DriverOpts {
        DriverOpts::new(
            "db.example.com".to_string(),
            3307,
            "root".to_string(),
            "secret".to_string(),
        )
    }

    #[test]
    fn test_build_opts_tcp() {
        let built = NativeBackend::build_opts(&opts().with_database(Some("foo".to_string())));

        assert_eq!(built.ip_or_hostname(), "db.example.com");
        assert_eq!(built.tcp_port(), 3307);
        assert_eq!(built.user(), Some("root"));
        assert_eq!(built.pass(), Some("secret"));
        assert_eq!(built.db_name(), Some("foo"));
    }

    #[test]
    fn test_build_opts_socket() {
        let built =
            NativeBackend::build_opts(&opts().with_socket(Some("/tmp/mysql.sock".to_string())));
        assert_eq!(built.socket(), Some("/tmp/mysql.sock"));
    }

    #[test]
    fn test_wire_params() {
        assert!(matches!(
            NativeBackend::wire_params(&[]),
            Params::Empty
        ));

        let params = NativeBackend::wire_params(&[Value::Int(1), Value::from("foo")]);
        match params {
            Params::Positional(values) => {
                assert_eq!(values.len(), 2);
                assert_eq!(values[0], mysql_async::Value::Int(1));
            }
            other => panic!("expected positional params, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_disconnected_backend_errors() {
        let mut backend = NativeBackend::new();
        assert!(!backend.is_connected());

        let err = backend.execute("SELECT 1", &[]).await.unwrap_err();
        assert!(matches!(err, DriverError::Disconnected));

        let err = backend.ping().await.unwrap_err();
        assert!(matches!(err, DriverError::Disconnected));

        // Closing without a connection is a no-op
        backend.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_statement_handle() {
        let mut backend = NativeBackend::new();
        let handle = StatementHandle {
            id: 99,
            num_params: 0,
        };
        let err = backend.execute_prepared(handle, &[]).await.unwrap_err();
        assert!(matches!(err, DriverError::UnknownStatement(99)));
    }
}
