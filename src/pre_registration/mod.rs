pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;

pub use handlers::pre_register;
pub use service::PreRegistrationService;
