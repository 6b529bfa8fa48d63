use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::SessionModel;
use crate::shared::AppError;

const SESSION_NOT_FOUND: &str = "セッションが見つかりません";

/// Trait for session repository operations
#[async_trait]
pub trait SessionRepository {
    async fn create_session(&self, session: &SessionModel) -> Result<(), AppError>;
    async fn get_session(&self, session_id: &str) -> Result<Option<SessionModel>, AppError>;
    /// Records activity on a session. NotFound when the session is gone.
    async fn touch_session(&self, session_id: &str, at: DateTime<Utc>) -> Result<(), AppError>;
    async fn delete_session(&self, session_id: &str) -> Result<(), AppError>;
    async fn cleanup_expired_sessions(&self) -> Result<u64, AppError>;
}

/// In-memory implementation of SessionRepository for development and testing
///
/// Data is stored in memory and will be lost when the application restarts.
pub struct InMemorySessionRepository {
    sessions: Mutex<HashMap<String, SessionModel>>,
}

impl Default for InMemorySessionRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    #[instrument(skip(self, session))]
    async fn create_session(&self, session: &SessionModel) -> Result<(), AppError> {
        debug!(session_id = %session.id, user_id = %session.user_id, "Creating session in memory");

        let mut sessions = self.sessions.lock().unwrap();
        if sessions.contains_key(&session.id) {
            warn!(session_id = %session.id, "Session id collision in memory");
            return Err(AppError::DatabaseError(
                "Session already exists".to_string(),
            ));
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionModel>, AppError> {
        Ok(self.sessions.lock().unwrap().get(session_id).cloned())
    }

    async fn touch_session(&self, session_id: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        match self.sessions.lock().unwrap().get_mut(session_id) {
            Some(session) => {
                session.last_accessed = at;
                Ok(())
            }
            None => Err(AppError::NotFound(SESSION_NOT_FOUND.to_string())),
        }
    }

    #[instrument(skip(self))]
    async fn delete_session(&self, session_id: &str) -> Result<(), AppError> {
        if self.sessions.lock().unwrap().remove(session_id).is_none() {
            return Err(AppError::NotFound(SESSION_NOT_FOUND.to_string()));
        }
        debug!(session_id = %session_id, "Session deleted from memory");
        Ok(())
    }

    async fn cleanup_expired_sessions(&self) -> Result<u64, AppError> {
        let mut sessions = self.sessions.lock().unwrap();
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, session| session.expires_at > now);
        Ok((before - sessions.len()) as u64)
    }
}

/// PostgreSQL implementation of session repository
pub struct PostgresSessionRepository {
    pool: PgPool,
}

impl PostgresSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    #[instrument(skip(self, session))]
    async fn create_session(&self, session: &SessionModel) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO sessions (id, user_id, created_at, expires_at, last_accessed) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(session.created_at)
        .bind(session.expires_at)
        .bind(session.last_accessed)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = %session.user_id, "Failed to create session in database");
            AppError::from(e)
        })?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_session(&self, session_id: &str) -> Result<Option<SessionModel>, AppError> {
        let session = sqlx::query_as::<_, SessionModel>(
            "SELECT id, user_id, created_at, expires_at, last_accessed FROM sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn touch_session(&self, session_id: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE sessions SET last_accessed = $2 WHERE id = $1")
            .bind(session_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(SESSION_NOT_FOUND.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_session(&self, session_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(SESSION_NOT_FOUND.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn cleanup_expired_sessions(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn expired_session(user_id: &str) -> SessionModel {
        let mut session = SessionModel::new(user_id.to_string(), 7);
        session.expires_at = Utc::now() - Duration::hours(1);
        session
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let repo = InMemorySessionRepository::new();
        let session = SessionModel::new("user-1".to_string(), 7);

        repo.create_session(&session).await.unwrap();

        let retrieved = repo.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(retrieved.user_id, "user-1");
        assert!(matches!(
            repo.create_session(&session).await,
            Err(AppError::DatabaseError(_))
        ));
    }

    #[tokio::test]
    async fn test_touch_session() {
        let repo = InMemorySessionRepository::new();
        let session = SessionModel::new("user-1".to_string(), 7);
        repo.create_session(&session).await.unwrap();

        let later = session.last_accessed + Duration::minutes(30);
        repo.touch_session(&session.id, later).await.unwrap();
        let touched = repo.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(touched.last_accessed, later);

        assert!(matches!(
            repo.touch_session("missing", later).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_session() {
        let repo = InMemorySessionRepository::new();
        let session = SessionModel::new("user-1".to_string(), 7);

        repo.create_session(&session).await.unwrap();
        repo.delete_session(&session.id).await.unwrap();

        assert!(repo.get_session(&session.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete_session(&session.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cleanup_expired_sessions() {
        let repo = InMemorySessionRepository::new();
        let expired = expired_session("expired-user");
        let valid = SessionModel::new("valid-user".to_string(), 7);
        repo.create_session(&expired).await.unwrap();
        repo.create_session(&valid).await.unwrap();

        assert_eq!(repo.cleanup_expired_sessions().await.unwrap(), 1);

        assert!(repo.get_session(&expired.id).await.unwrap().is_none());
        assert!(repo.get_session(&valid.id).await.unwrap().is_some());
    }
}
