//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Repository backends (PostgreSQL, in-memory)
//! - Cache implementation (Redis)
//! - Upload storage on local disk

pub mod cache;
pub mod database;
pub mod repositories;
pub mod storage;
