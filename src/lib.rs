//! # CRUD API Library
//!
//! This crate provides a generic CRUD backend with:
//! - Authentication (login, registration, token extension, password reset)
//! - User management with CSV import/export
//! - File uploads stored on local disk and served under `/uploads`
//! - PostgreSQL or in-memory storage behind one generic repository
//! - Redis response caching
//! - OpenAPI documentation served by Swagger UI at `/docs`
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Entities, the generic repository contract, query options
//! - **Application Layer**: Business logic services and DTOs
//! - **Infrastructure Layer**: Repository backends, cache and upload storage
//! - **Presentation Layer**: HTTP handlers, routes and middleware
//!
//! ## Module Structure
//!
//! ```text
//! crud_api/
//! +-- config/         Configuration management
//! +-- domain/         Entities, value objects, and traits
//! +-- application/    Application services and DTOs
//! +-- infrastructure/ Database, cache and storage implementations
//! +-- presentation/   HTTP routes, handlers and middleware
//! +-- shared/         Common utilities (errors, JWT, CSV, validation)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP handlers and middleware
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
