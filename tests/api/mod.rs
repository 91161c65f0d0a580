//! REST API endpoint tests

mod auth_tests;
mod cache_tests;
mod file_tests;
mod health_tests;
mod user_tests;
