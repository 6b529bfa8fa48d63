use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    models::{InterestType, PreRegistrationModel},
    repository::PreRegistrationRepository,
    types::PreRegisterRequest,
};
use crate::notification::{notify, templates, EmailSender};
use crate::session::service::is_plausible_email;
use crate::shared::AppError;
use crate::user::models::normalize_email;

/// Service for pre-launch sign-ups
pub struct PreRegistrationService {
    repository: Arc<dyn PreRegistrationRepository + Send + Sync>,
    email_sender: Arc<dyn EmailSender>,
}

impl PreRegistrationService {
    pub fn new(
        repository: Arc<dyn PreRegistrationRepository + Send + Sync>,
        email_sender: Arc<dyn EmailSender>,
    ) -> Self {
        Self {
            repository,
            email_sender,
        }
    }

    #[instrument(skip(self, request), fields(user_type = %request.user_type))]
    pub async fn register(
        &self,
        request: PreRegisterRequest,
    ) -> Result<PreRegistrationModel, AppError> {
        if !is_plausible_email(&request.email) {
            return Err(AppError::BadRequest(
                "有効なメールアドレスを入力してください".to_string(),
            ));
        }
        let interest = InterestType::from_str(request.user_type.trim()).map_err(|_| {
            AppError::BadRequest("登録種別が正しくありません".to_string())
        })?;
        let name = request
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let registration =
            PreRegistrationModel::new(normalize_email(&request.email), name, interest);
        self.repository.create(&registration).await?;
        info!(registration_id = %registration.id, "Pre-registration received");

        notify(
            self.email_sender.as_ref(),
            templates::pre_registration_received(
                &registration.email,
                registration.name.as_deref(),
                interest.label(),
            ),
        )
        .await;

        Ok(registration)
    }

    pub async fn list(&self) -> Result<Vec<PreRegistrationModel>, AppError> {
        self.repository.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::RecordingEmailSender;
    use crate::pre_registration::repository::InMemoryPreRegistrationRepository;
    use rstest::rstest;

    fn service(emails: Arc<RecordingEmailSender>) -> PreRegistrationService {
        PreRegistrationService::new(Arc::new(InMemoryPreRegistrationRepository::new()), emails)
    }

    fn request(email: &str, user_type: &str) -> PreRegisterRequest {
        PreRegisterRequest {
            email: email.to_string(),
            name: Some("山田".to_string()),
            user_type: user_type.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_sends_confirmation() {
        let emails = Arc::new(RecordingEmailSender::new());
        let service = service(emails.clone());

        let registration = service
            .register(request("Early@Example.JP", "both"))
            .await
            .unwrap();
        assert_eq!(registration.email, "early@example.jp");
        assert_eq!(registration.user_type, "both");

        let sent = emails.sent_to("early@example.jp");
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.contains("出店者・スペースオーナー"));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts_case_insensitively() {
        let service = service(Arc::new(RecordingEmailSender::new()));
        service.register(request("a@example.jp", "vendor")).await.unwrap();
        assert!(matches!(
            service.register(request("A@example.jp", "owner")).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[rstest]
    #[case("not-an-email", "vendor")]
    #[case("a@example.jp", "admin")]
    #[case("a@example.jp", "")]
    #[tokio::test]
    async fn test_invalid_input(#[case] email: &str, #[case] user_type: &str) {
        let service = service(Arc::new(RecordingEmailSender::new()));
        assert!(matches!(
            service.register(request(email, user_type)).await,
            Err(AppError::BadRequest(_))
        ));
    }
}
