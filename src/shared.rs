use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::booking::repository::{BookingRepository, InMemoryBookingRepository};
use crate::config::AppConfig;
use crate::favorite::repository::{FavoriteRepository, InMemoryFavoriteRepository};
use crate::message::repository::{InMemoryMessageRepository, MessageRepository};
use crate::notification::EmailSender;
use crate::oauth::provider::OAuthProviders;
use crate::oauth::repository::{AccountRepository, InMemoryAccountRepository};
use crate::pre_registration::repository::{
    InMemoryPreRegistrationRepository, PreRegistrationRepository,
};
use crate::review::repository::{InMemoryReviewRepository, ReviewRepository};
use crate::session::repository::{InMemorySessionRepository, SessionRepository};
use crate::session::service::SessionService;
use crate::session::token::TokenConfig;
use crate::space::repository::{InMemorySpaceRepository, SpaceRepository};
use crate::store::repository::{InMemoryStoreRepository, StoreRepository};
use crate::user::repository::{InMemoryUserRepository, UserRepository};
use crate::verification::repository::{InMemoryVerificationRepository, VerificationRepository};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub token_config: TokenConfig,
    pub user_repository: Arc<dyn UserRepository + Send + Sync>,
    pub account_repository: Arc<dyn AccountRepository + Send + Sync>,
    pub session_repository: Arc<dyn SessionRepository + Send + Sync>,
    pub space_repository: Arc<dyn SpaceRepository + Send + Sync>,
    pub store_repository: Arc<dyn StoreRepository + Send + Sync>,
    pub booking_repository: Arc<dyn BookingRepository + Send + Sync>,
    pub message_repository: Arc<dyn MessageRepository + Send + Sync>,
    pub review_repository: Arc<dyn ReviewRepository + Send + Sync>,
    pub favorite_repository: Arc<dyn FavoriteRepository + Send + Sync>,
    pub verification_repository: Arc<dyn VerificationRepository + Send + Sync>,
    pub pre_registration_repository: Arc<dyn PreRegistrationRepository + Send + Sync>,
    pub email_sender: Arc<dyn EmailSender>,
    pub oauth_providers: Arc<OAuthProviders>,
    pub session_service: Arc<SessionService>,
}

impl AppState {
    /// State backed entirely by in-memory repositories (development and tests)
    pub fn in_memory(
        config: AppConfig,
        email_sender: Arc<dyn EmailSender>,
        oauth_providers: OAuthProviders,
    ) -> Self {
        let token_config = TokenConfig::from_config(&config);
        let user_repository: Arc<dyn UserRepository + Send + Sync> =
            Arc::new(InMemoryUserRepository::new());
        let session_repository: Arc<dyn SessionRepository + Send + Sync> =
            Arc::new(InMemorySessionRepository::new());
        Self {
            config: Arc::new(config),
            session_service: session_service(&token_config, &session_repository, &user_repository),
            token_config,
            user_repository,
            account_repository: Arc::new(InMemoryAccountRepository::new()),
            session_repository,
            space_repository: Arc::new(InMemorySpaceRepository::new()),
            store_repository: Arc::new(InMemoryStoreRepository::new()),
            booking_repository: Arc::new(InMemoryBookingRepository::new()),
            message_repository: Arc::new(InMemoryMessageRepository::new()),
            review_repository: Arc::new(InMemoryReviewRepository::new()),
            favorite_repository: Arc::new(InMemoryFavoriteRepository::new()),
            verification_repository: Arc::new(InMemoryVerificationRepository::new()),
            pre_registration_repository: Arc::new(InMemoryPreRegistrationRepository::new()),
            email_sender,
            oauth_providers: Arc::new(oauth_providers),
        }
    }

    /// State backed by PostgreSQL repositories sharing one pool
    pub fn postgres(
        config: AppConfig,
        pool: sqlx::PgPool,
        email_sender: Arc<dyn EmailSender>,
        oauth_providers: OAuthProviders,
    ) -> Self {
        use crate::booking::repository::PostgresBookingRepository;
        use crate::favorite::repository::PostgresFavoriteRepository;
        use crate::message::repository::PostgresMessageRepository;
        use crate::oauth::repository::PostgresAccountRepository;
        use crate::pre_registration::repository::PostgresPreRegistrationRepository;
        use crate::review::repository::PostgresReviewRepository;
        use crate::session::repository::PostgresSessionRepository;
        use crate::space::repository::PostgresSpaceRepository;
        use crate::store::repository::PostgresStoreRepository;
        use crate::user::repository::PostgresUserRepository;
        use crate::verification::repository::PostgresVerificationRepository;

        let token_config = TokenConfig::from_config(&config);
        let user_repository: Arc<dyn UserRepository + Send + Sync> =
            Arc::new(PostgresUserRepository::new(pool.clone()));
        let session_repository: Arc<dyn SessionRepository + Send + Sync> =
            Arc::new(PostgresSessionRepository::new(pool.clone()));
        Self {
            config: Arc::new(config),
            session_service: session_service(&token_config, &session_repository, &user_repository),
            token_config,
            user_repository,
            account_repository: Arc::new(PostgresAccountRepository::new(pool.clone())),
            session_repository,
            space_repository: Arc::new(PostgresSpaceRepository::new(pool.clone())),
            store_repository: Arc::new(PostgresStoreRepository::new(pool.clone())),
            booking_repository: Arc::new(PostgresBookingRepository::new(pool.clone())),
            message_repository: Arc::new(PostgresMessageRepository::new(pool.clone())),
            review_repository: Arc::new(PostgresReviewRepository::new(pool.clone())),
            favorite_repository: Arc::new(PostgresFavoriteRepository::new(pool.clone())),
            verification_repository: Arc::new(PostgresVerificationRepository::new(pool.clone())),
            pre_registration_repository: Arc::new(PostgresPreRegistrationRepository::new(pool)),
            email_sender,
            oauth_providers: Arc::new(oauth_providers),
        }
    }
}

/// Session service over the state's own repositories
fn session_service(
    token_config: &TokenConfig,
    session_repository: &Arc<dyn SessionRepository + Send + Sync>,
    user_repository: &Arc<dyn UserRepository + Send + Sync>,
) -> Arc<SessionService> {
    Arc::new(SessionService::new(
        token_config.clone(),
        Arc::clone(session_repository),
        Arc::clone(user_repository),
    ))
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("External service error: {0}")]
    External(String),

    #[error("Internal server error")]
    Internal,
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::DatabaseError(e.to_string())
    }
}

impl AppError {
    pub fn unauthenticated() -> Self {
        AppError::Unauthorized("ログインが必要です".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::JwtError(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::External(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseError(_) | AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match self {
            AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::JwtError(msg) => msg,
            AppError::DatabaseError(msg) => {
                tracing::error!(error = %msg, "Database error while handling request");
                "サーバーエラーが発生しました".to_string()
            }
            AppError::External(msg) => {
                tracing::error!(error = %msg, "External service error while handling request");
                "外部サービスとの通信に失敗しました".to_string()
            }
            AppError::Internal => "サーバーエラーが発生しました".to_string(),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::notification::RecordingEmailSender;
    use crate::oauth::provider::{OAuthProviders, StaticOAuthClient};
    use crate::space::repository::SpaceRepository;
    use crate::user::repository::UserRepository;

    /// Builder for creating AppState with overrides for testing
    pub struct AppStateBuilder {
        config: AppConfig,
        email_sender: Arc<RecordingEmailSender>,
        oauth_providers: OAuthProviders,
        user_repository: Option<Arc<dyn UserRepository + Send + Sync>>,
        space_repository: Option<Arc<dyn SpaceRepository + Send + Sync>>,
    }

    impl AppStateBuilder {
        pub fn new() -> Self {
            Self {
                config: AppConfig::default(),
                email_sender: Arc::new(RecordingEmailSender::new()),
                oauth_providers: OAuthProviders::new(),
                user_repository: None,
                space_repository: None,
            }
        }

        pub fn with_oauth_client(mut self, client: StaticOAuthClient) -> Self {
            self.oauth_providers.register(Arc::new(client));
            self
        }

        pub fn with_user_repository(
            mut self,
            repo: Arc<dyn UserRepository + Send + Sync>,
        ) -> Self {
            self.user_repository = Some(repo);
            self
        }

        pub fn with_space_repository(
            mut self,
            repo: Arc<dyn SpaceRepository + Send + Sync>,
        ) -> Self {
            self.space_repository = Some(repo);
            self
        }

        pub fn build(self) -> AppState {
            let mut state =
                AppState::in_memory(self.config, self.email_sender, self.oauth_providers);
            if let Some(repo) = self.user_repository {
                state.user_repository = repo;
                state.session_service = session_service(
                    &state.token_config,
                    &state.session_repository,
                    &state.user_repository,
                );
            }
            if let Some(repo) = self.space_repository {
                state.space_repository = repo;
            }
            state
        }
    }

    impl Default for AppStateBuilder {
        fn default() -> Self {
            Self::new()
        }
    }
}
