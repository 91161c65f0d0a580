//! Middleware
//!
//! Tower middleware for request processing.

pub mod auth;
pub mod cache;
pub mod cors;
pub mod error_details;
pub mod error_log;
pub mod logging;
pub mod rate_limit;

pub use auth::{auth_middleware, AuthUser};
pub use cache::response_cache;
pub use cors::create_cors_layer;
pub use error_details::expose_error_details;
pub use error_log::persist_server_errors;
pub use logging::create_trace_layer;
pub use rate_limit::{rate_limit, RateLimitInfo, RateLimiter};
