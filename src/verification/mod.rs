pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;

pub use handlers::{get_verification, submit_verification};
pub use models::{VerificationRequestModel, VerificationStatus};
pub use service::VerificationService;
