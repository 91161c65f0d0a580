//! Storage Module
//!
//! File storage backends for uploaded content.

mod local;

pub use local::LocalFileStorage;
