//! HTTP Layer
//!
//! Routes, handlers, extractors and the OpenAPI document.

pub mod extractors;
pub mod handlers;
pub mod openapi;
pub mod routes;

pub use routes::create_router;
