pub mod cookies;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod token;
pub mod types;

pub use handlers::{change_password, current_session, login, logout, register};
pub use middleware::{optional_claims, require_session};
pub use service::SessionService;
pub use types::SessionClaims;
