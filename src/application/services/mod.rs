//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **AuthService**: Login, registration, JWT issuing, password reset
//! - **UserService**: User CRUD and CSV export/import
//! - **FileService**: Upload storage and file metadata
//! - **PasswordHasher**: Argon2id hashing shared by the services above

pub mod auth_service;
pub mod file_service;
pub mod password;
pub mod user_service;

pub use auth_service::{AuthError, AuthService, AuthServiceImpl};
pub use file_service::{
    parse_tags, FileContent, FileError, FileService, FileServiceImpl, UpdateFileDto, UploadDto,
};
pub use password::{PasswordError, PasswordHasher};
pub use user_service::{UserError, UserService, UserServiceImpl};
