use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{
    models::SessionModel,
    password::{hash_password, validate_new_password, verify_password},
    repository::SessionRepository,
    token::TokenConfig,
    types::{ChangePasswordRequest, LoginRequest, RegisterRequest, SessionClaims},
};
use crate::shared::AppError;
use crate::user::{
    models::UserModel, repository::UserRepository, service::validate_name,
};

const INVALID_CREDENTIALS: &str = "メールアドレスまたはパスワードが正しくありません";

/// Service for sign-in sessions and password credentials
pub struct SessionService {
    token_config: TokenConfig,
    repository: Arc<dyn SessionRepository + Send + Sync>,
    user_repository: Arc<dyn UserRepository + Send + Sync>,
}

impl SessionService {
    pub fn new(
        token_config: TokenConfig,
        repository: Arc<dyn SessionRepository + Send + Sync>,
        user_repository: Arc<dyn UserRepository + Send + Sync>,
    ) -> Self {
        Self {
            token_config,
            repository,
            user_repository,
        }
    }

    /// Stores a new session row for the user and returns its signed token
    #[instrument(skip(self))]
    pub async fn issue_session(&self, user_id: &str) -> Result<String, AppError> {
        let session = SessionModel::new(user_id.to_string(), self.token_config.expiration_days);
        self.repository.create_session(&session).await?;

        let token = self
            .token_config
            .create_token(session.id.clone(), user_id.to_string())?;

        info!(user_id = %user_id, session_id = %session.id, "Session issued");
        Ok(token)
    }

    /// Creates a password user and signs them in
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(
        &self,
        request: RegisterRequest,
    ) -> Result<(UserModel, String), AppError> {
        if !is_plausible_email(&request.email) {
            return Err(AppError::BadRequest(
                "有効なメールアドレスを入力してください".to_string(),
            ));
        }
        validate_new_password(&request.password)?;
        let name = validate_name(&request.name)?;

        let mut user = UserModel::new(&request.email, name, &request.roles);
        user.password_hash = Some(hash_password(&request.password)?);
        self.user_repository.create_user(&user).await?;

        info!(user_id = %user.id, user_type = %user.user_type, "User registered");
        let token = self.issue_session(&user.id).await?;
        Ok((user, token))
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<(UserModel, String), AppError> {
        let user = self
            .user_repository
            .get_user_by_email(&request.email)
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        let Some(stored_hash) = user.password_hash.as_deref() else {
            warn!(user_id = %user.id, "Password login attempted for OAuth-only user");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(&request.password, stored_hash) {
            warn!(user_id = %user.id, "Password verification failed");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let token = self.issue_session(&user.id).await?;
        Ok((user, token))
    }

    /// Validates a session token and returns the claims if valid
    #[instrument(skip(self, token))]
    pub async fn validate_session(&self, token: &str) -> Result<SessionClaims, AppError> {
        let claims = self
            .token_config
            .validate_token(token)
            .map_err(|_| AppError::unauthenticated())?;

        // The token signature alone is not enough: revoked sessions have no row
        match self.repository.get_session(&claims.session_id).await? {
            Some(session) if session.is_expired() => {
                warn!(session_id = %claims.session_id, "Session found but has expired");
                Err(AppError::Unauthorized(
                    "セッションの有効期限が切れました".to_string(),
                ))
            }
            Some(session) => {
                let now = Utc::now();
                if session.needs_touch(now) {
                    self.repository
                        .touch_session(&session.id, now)
                        .await
                        .map_err(|e| match e {
                            AppError::NotFound(_) => AppError::unauthenticated(),
                            other => other,
                        })?;
                    debug!(session_id = %session.id, "Session activity recorded");
                }
                Ok(claims)
            }
            None => {
                warn!(
                    session_id = %claims.session_id,
                    "Session not found in database - may have been revoked"
                );
                Err(AppError::unauthenticated())
            }
        }
    }

    /// Revokes a session by removing it from the database
    #[instrument(skip(self))]
    pub async fn revoke_session(&self, session_id: &str) -> Result<(), AppError> {
        match self.repository.delete_session(session_id).await {
            Ok(()) | Err(AppError::NotFound(_)) => {
                info!(session_id = %session_id, "Session revoked");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Sets or changes the user's password. OAuth-only users may set one without a current password.
    #[instrument(skip(self, request))]
    pub async fn change_password(
        &self,
        user_id: &str,
        request: ChangePasswordRequest,
    ) -> Result<(), AppError> {
        let mut user = self
            .user_repository
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("ユーザーが見つかりません".to_string()))?;

        if let Some(stored_hash) = user.password_hash.as_deref() {
            let current = request.current_password.as_deref().unwrap_or_default();
            if !verify_password(current, stored_hash) {
                return Err(AppError::Unauthorized(
                    "現在のパスワードが正しくありません".to_string(),
                ));
            }
        }

        validate_new_password(&request.new_password)?;
        user.password_hash = Some(hash_password(&request.new_password)?);
        user.touch();
        self.user_repository.update_user(&user).await?;

        info!(user_id = %user_id, "Password updated");
        Ok(())
    }

    /// Cleans up expired sessions from the database
    #[instrument(skip(self))]
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, AppError> {
        let removed_count = self.repository.cleanup_expired_sessions().await?;
        info!(removed_sessions = removed_count, "Expired sessions cleanup completed");
        Ok(removed_count)
    }
}

pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !email.contains(' '),
        None => false,
    }
}
