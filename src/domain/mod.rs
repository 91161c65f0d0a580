//! # Domain Layer
//!
//! The domain layer contains the entities, the generic repository contract
//! and the storage seam for uploaded bytes. It is independent of any
//! particular backend.
//!
//! ## Structure
//!
//! - **entities**: User, File, ErrorLog
//! - **value_objects**: Columns, query options, filter predicates
//! - **repository**: `Entity` and `Repository<E>` traits
//! - **storage**: `FileStorage` trait for upload bytes
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Repository traits define data access contracts
//! - Implementations live in the infrastructure layer

pub mod entities;
pub mod repository;
pub mod storage;
pub mod value_objects;

// Re-export commonly used types
pub use entities::*;
pub use repository::{Entity, ImportSummary, Repository};
pub use storage::FileStorage;
pub use value_objects::*;
