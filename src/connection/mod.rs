//! Connection management for MySQL connections.
//!
//! This module provides connection parameter parsing and session state
//! tracking.
//!
//! # Example
//!
//! ```no_run
//! # use mylite::connection::{ConnectionBuilder, ConnectionParams};
//! # use std::str::FromStr;
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Using ConnectionBuilder
//! let params = ConnectionBuilder::new()
//!     .host("localhost")
//!     .port(3306)
//!     .username("root")
//!     .password("")
//!     .database("foo")
//!     .build()?;
//!
//! // Or parse from connection string
//! let params = ConnectionParams::from_str("mysql://root@localhost:3306/foo")?;
//! # Ok(())
//! # }
//! ```

pub mod params;
pub mod session;

pub use params::{ConnectionBuilder, ConnectionParams};
pub use session::{Session, SessionConfig, SessionState};
