pub mod email;
pub mod templates;

use std::sync::Arc;
use tracing::info;

pub use email::{
    notify, Email, EmailSender, LoggingEmailSender, RecordingEmailSender, ResendEmailSender,
};

use crate::config::AppConfig;

/// Resend when an API key is configured, otherwise log-only
pub fn email_sender_from_config(config: &AppConfig) -> Arc<dyn EmailSender> {
    match &config.resend_api_key {
        Some(key) => {
            info!(from = %config.email_from, "Sending email through Resend");
            Arc::new(ResendEmailSender::new(key.clone(), config.email_from.clone()))
        }
        None => Arc::new(LoggingEmailSender),
    }
}
