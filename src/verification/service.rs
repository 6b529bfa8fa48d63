use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    models::{VerificationRequestModel, VerificationStatus},
    repository::VerificationRepository,
    types::{ReviewVerificationRequest, SubmitVerificationRequest},
};
use crate::notification::{notify, templates, EmailSender};
use crate::shared::AppError;
use crate::user::repository::UserRepository;

const MAX_DOCUMENT_TYPE_CHARS: usize = 50;

/// Service for identity verification requests
pub struct VerificationService {
    repository: Arc<dyn VerificationRepository + Send + Sync>,
    user_repository: Arc<dyn UserRepository + Send + Sync>,
    email_sender: Arc<dyn EmailSender>,
    base_url: String,
}

impl VerificationService {
    pub fn new(
        repository: Arc<dyn VerificationRepository + Send + Sync>,
        user_repository: Arc<dyn UserRepository + Send + Sync>,
        email_sender: Arc<dyn EmailSender>,
        base_url: String,
    ) -> Self {
        Self {
            repository,
            user_repository,
            email_sender,
            base_url,
        }
    }

    #[instrument(skip(self, request))]
    pub async fn submit(
        &self,
        user_id: &str,
        request: SubmitVerificationRequest,
    ) -> Result<VerificationRequestModel, AppError> {
        let user = self
            .user_repository
            .get_user(user_id)
            .await?
            .ok_or_else(AppError::unauthenticated)?;
        if user.is_verified {
            return Err(AppError::BadRequest(
                "既に本人確認が完了しています".to_string(),
            ));
        }

        let document_type = request.document_type.trim();
        if document_type.is_empty() || document_type.chars().count() > MAX_DOCUMENT_TYPE_CHARS {
            return Err(AppError::BadRequest(
                "書類の種類を選択してください".to_string(),
            ));
        }
        let document_url = request.document_url.trim();
        if !(document_url.starts_with("https://") || document_url.starts_with("http://")) {
            return Err(AppError::BadRequest(
                "書類画像のURLが正しくありません".to_string(),
            ));
        }

        if self.repository.has_pending(user_id).await? {
            return Err(AppError::Conflict(
                "審査中の本人確認申請があります".to_string(),
            ));
        }

        let request = VerificationRequestModel::new(
            user_id,
            document_type.to_string(),
            document_url.to_string(),
        );
        self.repository.create_request(&request).await?;
        info!(request_id = %request.id, user_id = %user_id, "Verification requested");
        Ok(request)
    }

    pub async fn latest(
        &self,
        user_id: &str,
    ) -> Result<Option<VerificationRequestModel>, AppError> {
        self.repository.latest_for_user(user_id).await
    }

    pub async fn list(
        &self,
        status: Option<VerificationStatus>,
    ) -> Result<Vec<VerificationRequestModel>, AppError> {
        self.repository.list_requests(status).await
    }

    /// Approves or rejects a pending request. Approval marks the user verified.
    /// The user is told the outcome by email.
    #[instrument(skip(self, decision), fields(status = %decision.status))]
    pub async fn review(
        &self,
        request_id: &str,
        decision: ReviewVerificationRequest,
    ) -> Result<VerificationRequestModel, AppError> {
        if decision.status == VerificationStatus::Pending {
            return Err(AppError::BadRequest(
                "承認または却下を選択してください".to_string(),
            ));
        }

        let mut request = self
            .repository
            .get_request(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound("本人確認申請が見つかりません".to_string()))?;
        if !request.is_pending() {
            warn!(request_id = %request_id, status = %request.status, "Verification already reviewed");
            return Err(AppError::BadRequest(
                "この申請は既に審査済みです".to_string(),
            ));
        }

        let note = decision
            .note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        request.decide(decision.status, note);
        self.repository.update_request(&request).await?;

        let approved = decision.status == VerificationStatus::Approved;
        if let Some(mut user) = self.user_repository.get_user(&request.user_id).await? {
            if approved {
                user.is_verified = true;
                user.touch();
                self.user_repository.update_user(&user).await?;
            }
            notify(
                self.email_sender.as_ref(),
                templates::verification_decided(
                    &user.email,
                    &user.name,
                    approved,
                    request.admin_note.as_deref(),
                    &self.base_url,
                ),
            )
            .await;
        }

        info!(request_id = %request_id, user_id = %request.user_id, approved, "Verification reviewed");
        Ok(request)
    }
}
