//! Repository Implementations
//!
//! Backends for the generic `Repository<E>` trait defined in the domain layer.
//!
//! ## Available Backends
//!
//! - **PgRepository** - PostgreSQL through `sqlx`
//! - **InMemoryRepository** - Process-local document store
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use crud_api::domain::{Repository, User};
//! use crud_api::infrastructure::repositories::PgRepository;
//!
//! let users: Arc<dyn Repository<User>> = Arc::new(PgRepository::<User>::new(pool));
//! ```

mod memory_repository;
mod pg_repository;

pub use memory_repository::InMemoryRepository;
pub use pg_repository::PgRepository;
