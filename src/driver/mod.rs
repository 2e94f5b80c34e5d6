//! Driver layer for MySQL communication.
//!
//! This module defines the backend abstraction the rest of the crate is
//! written against, plus the production implementation over `mysql_async`.
//! Everything above this layer deals in mylite types only, which keeps the
//! statement and cursor logic testable without a server.
//!
//! The layer is organized into:
//! - `backend` - Backend trait and data types crossing the seam
//! - `native` - `mysql_async`-backed implementation

pub mod backend;
pub mod native;

pub use backend::{
    ColumnMeta, DriverBackend, DriverOpts, ExecOutcome, ServerInfo, StatementHandle,
};
pub use native::NativeBackend;
