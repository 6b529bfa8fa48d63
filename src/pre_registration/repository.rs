use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Mutex;
use tracing::{instrument, warn};

use super::models::PreRegistrationModel;
use crate::shared::AppError;

const ALREADY_REGISTERED: &str = "このメールアドレスは既に事前登録されています";

/// Trait for pre-registration repository operations
#[async_trait]
pub trait PreRegistrationRepository {
    /// Conflict when the email is already registered
    async fn create(&self, registration: &PreRegistrationModel) -> Result<(), AppError>;
    /// All registrations, newest first
    async fn list(&self) -> Result<Vec<PreRegistrationModel>, AppError>;
}

/// In-memory implementation of PreRegistrationRepository for development and testing
pub struct InMemoryPreRegistrationRepository {
    registrations: Mutex<Vec<PreRegistrationModel>>,
}

impl Default for InMemoryPreRegistrationRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPreRegistrationRepository {
    pub fn new() -> Self {
        Self {
            registrations: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PreRegistrationRepository for InMemoryPreRegistrationRepository {
    #[instrument(skip(self, registration))]
    async fn create(&self, registration: &PreRegistrationModel) -> Result<(), AppError> {
        let mut registrations = self.registrations.lock().unwrap();
        if registrations.iter().any(|r| r.email == registration.email) {
            return Err(AppError::Conflict(ALREADY_REGISTERED.to_string()));
        }
        registrations.push(registration.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<PreRegistrationModel>, AppError> {
        let mut registrations = self.registrations.lock().unwrap().clone();
        registrations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(registrations)
    }
}

/// PostgreSQL implementation of pre-registration repository
pub struct PostgresPreRegistrationRepository {
    pool: PgPool,
}

impl PostgresPreRegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreRegistrationRepository for PostgresPreRegistrationRepository {
    #[instrument(skip(self, registration))]
    async fn create(&self, registration: &PreRegistrationModel) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO pre_registrations (id, email, name, user_type, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&registration.id)
        .bind(&registration.email)
        .bind(&registration.name)
        .bind(&registration.user_type)
        .bind(registration.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict(ALREADY_REGISTERED.to_string())
            }
            other => {
                warn!(error = %other, "Failed to store pre-registration in database");
                AppError::from(other)
            }
        })?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<PreRegistrationModel>, AppError> {
        let registrations = sqlx::query_as::<_, PreRegistrationModel>(
            "SELECT id, email, name, user_type, created_at FROM pre_registrations ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(registrations)
    }
}
