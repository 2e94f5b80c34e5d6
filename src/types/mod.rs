//! Type mapping between MySQL column types and mylite values.

mod mapping;
mod value;

pub use mapping::{decode, MysqlType};
pub use value::Value;
