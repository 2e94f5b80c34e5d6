//! Result set handling and row iteration.
//!
//! A statement execution produces a [`ResultSet`]: either an affected-row
//! count (DDL/DML) or row data. Row data is consumed through a
//! [`RowCursor`], which exposes the ordered column names (`fields`), yields
//! rows until exhaustion, and is explicitly closed after use.

use crate::driver::{ColumnMeta, ExecOutcome};
use crate::error::QueryError;
use crate::types::Value;
use std::fmt;
use std::sync::Arc;

/// Metadata about a row-producing statement execution.
#[derive(Debug, Clone)]
pub struct ResultMetadata {
    /// Result set column metadata, in order
    columns: Vec<ColumnMeta>,
    /// Total number of buffered rows
    total_rows: usize,
}

impl ResultMetadata {
    /// Get column names in result order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Get column metadata.
    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    /// Get the number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the total number of rows in the result.
    pub fn total_rows(&self) -> usize {
        self.total_rows
    }
}

/// One row of a result set: an ordered sequence of heterogeneous values.
#[derive(Debug, Clone)]
pub struct Row {
    /// Column names, shared across all rows of a result
    fields: Arc<Vec<String>>,
    /// Column values in result order
    values: Vec<Value>,
}

impl Row {
    /// Get a value by column position.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by column name.
    pub fn get_named(&self, name: &str) -> Option<&Value> {
        let index = self.fields.iter().position(|f| f == name)?;
        self.values.get(index)
    }

    /// Get the column names.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Get all values in order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consume the row, returning its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}

/// Result of a statement execution: a row count or row data.
#[derive(Debug)]
pub struct ResultSet {
    inner: ResultSetInner,
}

#[derive(Debug)]
enum ResultSetInner {
    /// Affected-row count (DDL/DML)
    RowCount {
        affected: u64,
        last_insert_id: Option<u64>,
    },
    /// Buffered row data
    Rows {
        metadata: ResultMetadata,
        fields: Arc<Vec<String>>,
        rows: Vec<Vec<Value>>,
    },
}

impl ResultSet {
    /// Build a result set from a driver execution outcome.
    pub(crate) fn from_outcome(outcome: ExecOutcome) -> Self {
        match outcome {
            ExecOutcome::RowCount {
                affected,
                last_insert_id,
            } => Self {
                inner: ResultSetInner::RowCount {
                    affected,
                    last_insert_id,
                },
            },
            ExecOutcome::Rows { columns, rows } => {
                let fields = Arc::new(columns.iter().map(|c| c.name.clone()).collect::<Vec<_>>());
                let metadata = ResultMetadata {
                    total_rows: rows.len(),
                    columns,
                };
                Self {
                    inner: ResultSetInner::Rows {
                        metadata,
                        fields,
                        rows,
                    },
                }
            }
        }
    }

    /// Get the affected-row count if this is a row count result.
    pub fn row_count(&self) -> Option<u64> {
        match &self.inner {
            ResultSetInner::RowCount { affected, .. } => Some(*affected),
            ResultSetInner::Rows { .. } => None,
        }
    }

    /// Get the AUTO_INCREMENT id generated by the statement, if any.
    pub fn last_insert_id(&self) -> Option<u64> {
        match &self.inner {
            ResultSetInner::RowCount { last_insert_id, .. } => *last_insert_id,
            ResultSetInner::Rows { .. } => None,
        }
    }

    /// Get the metadata if this result holds rows.
    pub fn metadata(&self) -> Option<&ResultMetadata> {
        match &self.inner {
            ResultSetInner::Rows { metadata, .. } => Some(metadata),
            ResultSetInner::RowCount { .. } => None,
        }
    }

    /// Check if this result holds rows.
    pub fn is_rows(&self) -> bool {
        matches!(&self.inner, ResultSetInner::Rows { .. })
    }

    /// Convert into a cursor over the rows.
    ///
    /// # Errors
    /// Returns `QueryError::NoResultSet` if this is a row count result.
    pub fn into_cursor(self) -> Result<RowCursor, QueryError> {
        match self.inner {
            ResultSetInner::Rows {
                metadata,
                fields,
                rows,
            } => Ok(RowCursor {
                metadata,
                fields,
                rows: rows.into_iter(),
                eof: false,
                closed: false,
            }),
            ResultSetInner::RowCount { .. } => Err(QueryError::NoResultSet(
                "Cannot iterate over a row count result".to_string(),
            )),
        }
    }

    /// Collect all rows into memory.
    ///
    /// # Errors
    /// Returns `QueryError::NoResultSet` if this is a row count result.
    pub fn into_rows(self) -> Result<Vec<Row>, QueryError> {
        let mut cursor = self.into_cursor()?;
        let mut rows = Vec::new();
        while let Some(row) = cursor.next_row()? {
            rows.push(row);
        }
        Ok(rows)
    }
}

/// Cursor over the rows of a result set.
///
/// Mirrors the lifecycle of the underlying C API cursor: `fields` describes
/// the columns, `next_row` yields rows until exhaustion (after which `eof`
/// reports true), and `close` releases the cursor. Reading a closed cursor
/// is an error.
pub struct RowCursor {
    /// Result metadata
    metadata: ResultMetadata,
    /// Column names, shared with yielded rows
    fields: Arc<Vec<String>>,
    /// Remaining rows
    rows: std::vec::IntoIter<Vec<Value>>,
    /// Whether the cursor has been read past the last row
    eof: bool,
    /// Whether the cursor has been closed
    closed: bool,
}

impl RowCursor {
    /// Get the ordered column names of the result.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Get the result metadata.
    pub fn metadata(&self) -> &ResultMetadata {
        &self.metadata
    }

    /// Fetch the next row.
    ///
    /// Returns `None` once the cursor is exhausted; `eof` reports true from
    /// then on.
    ///
    /// # Errors
    /// Returns `QueryError::CursorClosed` if the cursor has been closed.
    pub fn next_row(&mut self) -> Result<Option<Row>, QueryError> {
        if self.closed {
            return Err(QueryError::CursorClosed);
        }
        if self.eof {
            return Ok(None);
        }

        match self.rows.next() {
            Some(values) => Ok(Some(Row {
                fields: Arc::clone(&self.fields),
                values,
            })),
            None => {
                self.eof = true;
                Ok(None)
            }
        }
    }

    /// Check whether the cursor has been read past the last row.
    pub fn eof(&self) -> bool {
        self.eof
    }

    /// Close the cursor and release its rows.
    pub fn close(&mut self) {
        self.closed = true;
        // Drop any rows not yet consumed
        self.rows = Vec::new().into_iter();
    }

    /// Check whether the cursor has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl fmt::Debug for RowCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowCursor")
            .field("fields", &self.fields)
            .field("eof", &self.eof)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::ColumnMeta;
    use crate::types::MysqlType;

    fn rows_outcome() -> ExecOutcome {
        ExecOutcome::Rows {
            columns: vec![
                ColumnMeta {
                    name: "id".to_string(),
                    ty: MysqlType::Long,
                    binary: false,
                },
                ColumnMeta {
                    name: "text".to_string(),
                    ty: MysqlType::VarString,
                    binary: false,
                },
                ColumnMeta {
                    name: "f".to_string(),
                    ty: MysqlType::Float,
                    binary: false,
                },
            ],
            rows: vec![
                vec![Value::Int(1), Value::from("bababa"), Value::Null],
                vec![Value::Int(2), Value::from("bababa"), Value::Float(3.14)],
            ],
        }
    }

    #[test]
    fn test_result_set_row_count() {
        let result = ResultSet::from_outcome(ExecOutcome::RowCount {
            affected: 42,
            last_insert_id: Some(7),
        });

        assert_eq!(result.row_count(), Some(42));
        assert_eq!(result.last_insert_id(), Some(7));
        assert!(!result.is_rows());
        assert!(result.metadata().is_none());
        assert!(result.into_cursor().is_err());
    }

    #[test]
    fn test_result_set_rows_metadata() {
        let result = ResultSet::from_outcome(rows_outcome());

        assert!(result.row_count().is_none());
        assert!(result.is_rows());

        let metadata = result.metadata().unwrap();
        assert_eq!(metadata.column_count(), 3);
        assert_eq!(metadata.total_rows(), 2);
        assert_eq!(metadata.column_names(), vec!["id", "text", "f"]);
    }

    #[test]
    fn test_cursor_iteration() {
        let mut cursor = ResultSet::from_outcome(rows_outcome()).into_cursor().unwrap();

        assert_eq!(cursor.fields(), &["id", "text", "f"]);
        assert!(!cursor.eof());

        let row = cursor.next_row().unwrap().unwrap();
        assert_eq!(row.get(0), Some(&Value::Int(1)));
        assert_eq!(row.get(2), Some(&Value::Null));

        let row = cursor.next_row().unwrap().unwrap();
        assert_eq!(row.get_named("f"), Some(&Value::Float(3.14)));
        assert!(!cursor.eof());

        // Exhaustion sets eof, and stays there
        assert!(cursor.next_row().unwrap().is_none());
        assert!(cursor.eof());
        assert!(cursor.next_row().unwrap().is_none());
    }

    #[test]
    fn test_cursor_close() {
        let mut cursor = ResultSet::from_outcome(rows_outcome()).into_cursor().unwrap();

        let _ = cursor.next_row().unwrap();
        cursor.close();
        assert!(cursor.is_closed());

        let err = cursor.next_row().unwrap_err();
        assert!(matches!(err, QueryError::CursorClosed));
    }

    #[test]
    fn test_row_accessors() {
        let rows = ResultSet::from_outcome(rows_outcome()).into_rows().unwrap();
        assert_eq!(rows.len(), 2);

        let row = &rows[0];
        assert_eq!(row.len(), 3);
        assert!(!row.is_empty());
        assert_eq!(row.fields(), &["id", "text", "f"]);
        assert_eq!(row.get_named("id"), Some(&Value::Int(1)));
        assert_eq!(row.get_named("missing"), None);
        assert_eq!(row.get(9), None);
    }

    #[test]
    fn test_row_display() {
        let rows = ResultSet::from_outcome(rows_outcome()).into_rows().unwrap();

        assert_eq!(rows[0].to_string(), "1, bababa, NULL");
        assert_eq!(rows[1].to_string(), "2, bababa, 3.14");
    }
}
