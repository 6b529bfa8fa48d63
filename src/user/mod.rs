pub mod handlers;
pub mod models;
pub mod repository;
pub mod roles;
pub mod service;
pub mod types;

pub use handlers::{get_me, get_profile, get_public_user, update_me, update_profile, update_roles};
pub use models::UserModel;
pub use roles::UserRole;
pub use service::UserService;
