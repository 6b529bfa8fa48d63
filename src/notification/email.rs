use async_trait::async_trait;
use serde::Serialize;
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::shared::AppError;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// A rendered transactional email
#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Outbound transactional email
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), AppError>;
}

/// Sends through the Resend HTTP API
pub struct ResendEmailSender {
    http: reqwest::Client,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct ResendPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

impl ResendEmailSender {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            from,
        }
    }
}

#[async_trait]
impl EmailSender for ResendEmailSender {
    #[instrument(skip(self, email), fields(subject = %email.subject))]
    async fn send(&self, email: &Email) -> Result<(), AppError> {
        let payload = ResendPayload {
            from: &self.from,
            to: [email.to.as_str()],
            subject: &email.subject,
            text: &email.text,
        };

        self.http
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::External(format!("resend: {e}")))?;

        debug!("Email accepted by Resend");
        Ok(())
    }
}

/// Writes emails to the log instead of sending them (no API key configured)
pub struct LoggingEmailSender;

#[async_trait]
impl EmailSender for LoggingEmailSender {
    async fn send(&self, email: &Email) -> Result<(), AppError> {
        info!(to = %email.to, subject = %email.subject, "Email not sent (no email API key configured)");
        Ok(())
    }
}

/// Keeps every email in memory so tests can assert on notifications
#[derive(Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<Email>>,
}

impl RecordingEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, address: &str) -> Vec<Email> {
        self.sent()
            .into_iter()
            .filter(|e| e.to == address)
            .collect()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, email: &Email) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Sends an email without letting a delivery failure fail the request
pub async fn notify(sender: &dyn EmailSender, email: Email) {
    if let Err(e) = sender.send(&email).await {
        warn!(error = %e, subject = %email.subject, "Failed to send notification email");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingEmailSender;

    #[async_trait]
    impl EmailSender for FailingEmailSender {
        async fn send(&self, _email: &Email) -> Result<(), AppError> {
            Err(AppError::External("down".to_string()))
        }
    }

    fn email() -> Email {
        Email {
            to: "a@example.jp".to_string(),
            subject: "件名".to_string(),
            text: "本文".to_string(),
        }
    }

    #[tokio::test]
    async fn test_notify_swallows_failures() {
        notify(&FailingEmailSender, email()).await;
    }

    #[tokio::test]
    async fn test_recording_sender() {
        let sender = RecordingEmailSender::new();
        notify(&sender, email()).await;
        assert_eq!(sender.sent_to("a@example.jp"), vec![email()]);
        assert!(sender.sent_to("b@example.jp").is_empty());
    }

    #[test]
    fn test_resend_payload_shape() {
        let payload = ResendPayload {
            from: "noreply@example.jp",
            to: ["a@example.jp"],
            subject: "s",
            text: "t",
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["to"][0], "a@example.jp");
        assert_eq!(json["from"], "noreply@example.jp");
    }
}
