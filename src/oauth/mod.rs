pub mod handlers;
pub mod models;
pub mod provider;
pub mod repository;
pub mod service;
pub mod types;

pub use handlers::{authorize, callback, list_accounts, unlink_account};
pub use provider::{OAuthClient, OAuthProfile, OAuthProviders};
pub use service::AccountLinkService;
