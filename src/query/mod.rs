//! Statement execution and result handling.

pub mod prepared;
pub mod results;
pub mod statement;

pub use prepared::PreparedStatement;
pub use results::{ResultMetadata, ResultSet, Row, RowCursor};
pub use statement::{Statement, StatementType};
