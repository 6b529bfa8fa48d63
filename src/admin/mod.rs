pub mod handlers;
pub mod middleware;
pub mod service;
pub mod types;

pub use handlers::{list_pre_registrations, list_users, list_verifications, review_verification, stats};
pub use middleware::require_admin;
pub use service::AdminService;
