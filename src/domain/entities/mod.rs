//! # Domain Entities
//!
//! Core domain entities. All entities map directly to their corresponding
//! database tables and implement [`Entity`](crate::domain::Entity) so the
//! generic repository can store them.
//!
//! - **User**: Account with credentials and an application-level uuid
//! - **File**: Uploaded file metadata; bytes live in file storage
//! - **ErrorLog**: Persisted server errors

mod error_log;
mod file;
mod user;

pub use error_log::{ErrorLog, NewErrorLog};
pub use file::{File, FilePatch, NewFile};
pub use user::{NewUser, User, UserPatch};
