//! Persistence gateway: store traits and their implementations

pub mod memory;
pub mod role;
pub mod user;

pub use memory::{InMemoryRoleRepository, InMemoryUserRepository};
pub use role::{PgRoleRepository, RoleStore};
pub use user::{PgUserRepository, UserStore};
