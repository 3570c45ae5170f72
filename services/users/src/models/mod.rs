//! User service models

pub mod dto;
pub mod page;
pub mod role;
pub mod user;

// Re-export for convenience
pub use dto::{
    CountResponse, CreateUserRequest, PaginationQuery, PatchUserRequest, SignInRequest,
    SignInResponse, UpdateUserRequest, UserResponse,
};
pub use page::{Page, PageRequest};
pub use role::{Role, UserRole};
pub use user::{User, UserDraft, UserId};
