//! Business logic of the user service

pub mod auth;
pub mod conflict;
pub mod roles;
pub mod users;

pub use auth::AuthService;
pub use roles::RoleResolver;
pub use users::UserService;
