//! # Domain Value Objects
//!
//! Immutable value types shared by every entity.
//!
//! ## Value Objects
//!
//! - **Column / ColumnValue**: Table layout descriptors and typed cell values
//! - **QueryOptions / Page**: Search input and paginated output
//! - **Predicate**: Filter conditions after operator translation

mod column;
mod query;

pub use column::*;
pub use query::*;
