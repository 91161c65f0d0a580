//! Data Transfer Objects
//!
//! DTOs for API request/response serialization.

pub mod request;
pub mod response;

pub use request::{
    CreateUserRequest, FileUploadForm, ForgotPasswordRequest, LoginRequest, ResetPasswordRequest,
    UpdateUserRequest, UserCsvRow,
};
pub use response::{
    AuthResponse, DeleteAllResponse, FileResponse, ForgotPasswordResponse, MessageResponse,
    UserResponse,
};
