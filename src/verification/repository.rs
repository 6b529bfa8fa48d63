use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::{VerificationRequestModel, VerificationStatus};
use crate::shared::AppError;

/// Trait for verification request repository operations
#[async_trait]
pub trait VerificationRepository {
    async fn create_request(&self, request: &VerificationRequestModel) -> Result<(), AppError>;
    async fn get_request(&self, request_id: &str) -> Result<Option<VerificationRequestModel>, AppError>;
    /// The user's most recent request, whatever its status
    async fn latest_for_user(&self, user_id: &str) -> Result<Option<VerificationRequestModel>, AppError>;
    async fn has_pending(&self, user_id: &str) -> Result<bool, AppError>;
    /// Requests newest first, optionally filtered by status
    async fn list_requests(
        &self,
        status: Option<VerificationStatus>,
    ) -> Result<Vec<VerificationRequestModel>, AppError>;
    async fn update_request(&self, request: &VerificationRequestModel) -> Result<(), AppError>;
    async fn count_pending(&self) -> Result<i64, AppError>;
}

/// In-memory implementation of VerificationRepository for development and testing
pub struct InMemoryVerificationRepository {
    requests: Mutex<HashMap<String, VerificationRequestModel>>,
}

impl Default for InMemoryVerificationRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryVerificationRepository {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl VerificationRepository for InMemoryVerificationRepository {
    #[instrument(skip(self, request))]
    async fn create_request(&self, request: &VerificationRequestModel) -> Result<(), AppError> {
        debug!(request_id = %request.id, user_id = %request.user_id, "Storing verification request in memory");
        self.requests
            .lock()
            .unwrap()
            .insert(request.id.clone(), request.clone());
        Ok(())
    }

    async fn get_request(&self, request_id: &str) -> Result<Option<VerificationRequestModel>, AppError> {
        Ok(self.requests.lock().unwrap().get(request_id).cloned())
    }

    async fn latest_for_user(&self, user_id: &str) -> Result<Option<VerificationRequestModel>, AppError> {
        let requests = self.requests.lock().unwrap();
        Ok(requests
            .values()
            .filter(|r| r.user_id == user_id)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn has_pending(&self, user_id: &str) -> Result<bool, AppError> {
        let requests = self.requests.lock().unwrap();
        Ok(requests
            .values()
            .any(|r| r.user_id == user_id && r.is_pending()))
    }

    async fn list_requests(
        &self,
        status: Option<VerificationStatus>,
    ) -> Result<Vec<VerificationRequestModel>, AppError> {
        let requests = self.requests.lock().unwrap();
        let mut matching: Vec<VerificationRequestModel> = requests
            .values()
            .filter(|r| status.map_or(true, |s| r.status() == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    #[instrument(skip(self, request))]
    async fn update_request(&self, request: &VerificationRequestModel) -> Result<(), AppError> {
        let mut requests = self.requests.lock().unwrap();
        if !requests.contains_key(&request.id) {
            warn!(request_id = %request.id, "Verification request not found for update in memory");
            return Err(AppError::NotFound("本人確認申請が見つかりません".to_string()));
        }
        requests.insert(request.id.clone(), request.clone());
        Ok(())
    }

    async fn count_pending(&self) -> Result<i64, AppError> {
        let requests = self.requests.lock().unwrap();
        Ok(requests.values().filter(|r| r.is_pending()).count() as i64)
    }
}

/// PostgreSQL implementation of verification request repository
pub struct PostgresVerificationRepository {
    pool: PgPool,
}

impl PostgresVerificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const REQUEST_COLUMNS: &str =
    "id, user_id, document_type, document_url, status, admin_note, created_at, reviewed_at";

#[async_trait]
impl VerificationRepository for PostgresVerificationRepository {
    #[instrument(skip(self, request))]
    async fn create_request(&self, request: &VerificationRequestModel) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO verification_requests (id, user_id, document_type, document_url, status, admin_note, created_at, reviewed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&request.id)
        .bind(&request.user_id)
        .bind(&request.document_type)
        .bind(&request.document_url)
        .bind(&request.status)
        .bind(&request.admin_note)
        .bind(request.created_at)
        .bind(request.reviewed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::Conflict(
                "審査中の本人確認申請があります".to_string(),
            ),
            other => {
                warn!(error = %other, "Failed to store verification request in database");
                AppError::from(other)
            }
        })?;
        Ok(())
    }

    async fn get_request(&self, request_id: &str) -> Result<Option<VerificationRequestModel>, AppError> {
        let request = sqlx::query_as::<_, VerificationRequestModel>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM verification_requests WHERE id = $1"
        ))
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(request)
    }

    async fn latest_for_user(&self, user_id: &str) -> Result<Option<VerificationRequestModel>, AppError> {
        let request = sqlx::query_as::<_, VerificationRequestModel>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM verification_requests \
             WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(request)
    }

    async fn has_pending(&self, user_id: &str) -> Result<bool, AppError> {
        let pending: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM verification_requests WHERE user_id = $1 AND status = 'pending')",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(pending)
    }

    #[instrument(skip(self))]
    async fn list_requests(
        &self,
        status: Option<VerificationStatus>,
    ) -> Result<Vec<VerificationRequestModel>, AppError> {
        let requests = sqlx::query_as::<_, VerificationRequestModel>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM verification_requests \
             WHERE ($1::text IS NULL OR status = $1) ORDER BY created_at DESC"
        ))
        .bind(status.map(|s| s.to_string()))
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    #[instrument(skip(self, request))]
    async fn update_request(&self, request: &VerificationRequestModel) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE verification_requests SET status = $2, admin_note = $3, reviewed_at = $4 WHERE id = $1",
        )
        .bind(&request.id)
        .bind(&request.status)
        .bind(&request.admin_note)
        .bind(request.reviewed_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("本人確認申請が見つかりません".to_string()));
        }
        Ok(())
    }

    async fn count_pending(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM verification_requests WHERE status = 'pending'",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_latest_and_pending() {
        let repo = InMemoryVerificationRepository::new();
        let mut old = VerificationRequestModel::new(
            "u",
            "drivers_license".to_string(),
            "https://files.example.jp/a.png".to_string(),
        );
        old.created_at = Utc::now() - Duration::days(3);
        old.decide(VerificationStatus::Rejected, Some("不鮮明".to_string()));
        repo.create_request(&old).await.unwrap();
        assert!(!repo.has_pending("u").await.unwrap());

        let new = VerificationRequestModel::new(
            "u",
            "drivers_license".to_string(),
            "https://files.example.jp/b.png".to_string(),
        );
        repo.create_request(&new).await.unwrap();

        assert!(repo.has_pending("u").await.unwrap());
        assert_eq!(repo.latest_for_user("u").await.unwrap().unwrap().id, new.id);
        assert_eq!(repo.count_pending().await.unwrap(), 1);
        assert_eq!(
            repo.list_requests(Some(VerificationStatus::Rejected))
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(repo.list_requests(None).await.unwrap().len(), 2);
    }
}
