//! Public client surface.
//!
//! This module provides the `Driver` → `Database` → `Connection` layering:
//! the driver parses connection strings and acts as a factory for databases,
//! a database holds validated parameters and connects, and a connection
//! executes statements and manages transactions.

pub mod connection;
pub mod database;
pub mod driver;

pub use connection::{Connection, ConnectionBuilder};
pub use database::Database;
pub use driver::Driver;
