// Library crate for the spacematch marketplace API
// This file exposes the public API for integration tests

pub mod admin;
pub mod booking;
pub mod config;
pub mod favorite;
pub mod message;
pub mod notification;
pub mod oauth;
pub mod pre_registration;
pub mod review;
pub mod routes;
pub mod session;
pub mod shared;
pub mod space;
pub mod store;
pub mod user;
pub mod verification;

// Re-export commonly used types for easier access in tests
pub use config::AppConfig;
pub use notification::{EmailSender, RecordingEmailSender};
pub use oauth::{OAuthProfile, OAuthProviders};
pub use routes::router;
pub use shared::{AppError, AppState};
