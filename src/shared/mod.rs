//! Shared Utilities
//!
//! Common utilities used across all layers.

pub mod csv_codec;
pub mod error;
pub mod jwt;
pub mod validation;
