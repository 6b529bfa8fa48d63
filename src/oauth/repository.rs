use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::AccountModel;
use crate::shared::AppError;

const ACCOUNT_TAKEN: &str = "このアカウントは既に別のユーザーに連携されています";

/// Trait for linked OAuth account persistence
#[async_trait]
pub trait AccountRepository {
    async fn create_account(&self, account: &AccountModel) -> Result<(), AppError>;
    async fn find_by_provider_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<AccountModel>, AppError>;
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<AccountModel>, AppError>;
    async fn delete_for_user(&self, user_id: &str, provider: &str) -> Result<(), AppError>;
}

/// In-memory implementation of AccountRepository for development and testing
pub struct InMemoryAccountRepository {
    accounts: Mutex<HashMap<String, AccountModel>>,
}

impl Default for InMemoryAccountRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    #[instrument(skip(self, account))]
    async fn create_account(&self, account: &AccountModel) -> Result<(), AppError> {
        let mut accounts = self.accounts.lock().unwrap();
        let taken = accounts.values().any(|a| {
            a.provider == account.provider && a.provider_account_id == account.provider_account_id
        });
        let duplicate_provider = accounts
            .values()
            .any(|a| a.user_id == account.user_id && a.provider == account.provider);
        if taken || duplicate_provider {
            warn!(provider = %account.provider, user_id = %account.user_id, "Account link conflicts in memory");
            return Err(AppError::Conflict(ACCOUNT_TAKEN.to_string()));
        }

        debug!(provider = %account.provider, user_id = %account.user_id, "Linking account in memory");
        accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_provider_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<AccountModel>, AppError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.provider == provider && a.provider_account_id == provider_account_id)
            .cloned())
    }

    #[instrument(skip(self))]
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<AccountModel>, AppError> {
        let mut accounts: Vec<AccountModel> = self
            .accounts
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(accounts)
    }

    #[instrument(skip(self))]
    async fn delete_for_user(&self, user_id: &str, provider: &str) -> Result<(), AppError> {
        let mut accounts = self.accounts.lock().unwrap();
        let before = accounts.len();
        accounts.retain(|_, a| !(a.user_id == user_id && a.provider == provider));
        if accounts.len() == before {
            return Err(AppError::NotFound("連携が見つかりません".to_string()));
        }
        Ok(())
    }
}

/// PostgreSQL implementation of account repository
pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    #[instrument(skip(self, account))]
    async fn create_account(&self, account: &AccountModel) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO accounts (id, user_id, provider, provider_account_id, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&account.id)
        .bind(&account.user_id)
        .bind(&account.provider)
        .bind(&account.provider_account_id)
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict(ACCOUNT_TAKEN.to_string())
            }
            other => {
                warn!(error = %other, "Failed to link account in database");
                AppError::from(other)
            }
        })?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_provider_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<AccountModel>, AppError> {
        let account = sqlx::query_as::<_, AccountModel>(
            "SELECT id, user_id, provider, provider_account_id, created_at FROM accounts \
             WHERE provider = $1 AND provider_account_id = $2",
        )
        .bind(provider)
        .bind(provider_account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    #[instrument(skip(self))]
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<AccountModel>, AppError> {
        let accounts = sqlx::query_as::<_, AccountModel>(
            "SELECT id, user_id, provider, provider_account_id, created_at FROM accounts \
             WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(accounts)
    }

    #[instrument(skip(self))]
    async fn delete_for_user(&self, user_id: &str, provider: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM accounts WHERE user_id = $1 AND provider = $2")
            .bind(user_id)
            .bind(provider)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("連携が見つかりません".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_provider_identity_cannot_link_twice() {
        let repo = InMemoryAccountRepository::new();
        repo.create_account(&AccountModel::new("user-1", "google", "sub-1"))
            .await
            .unwrap();

        let result = repo
            .create_account(&AccountModel::new("user-2", "google", "sub-1"))
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_user_cannot_hold_two_accounts_of_one_provider() {
        let repo = InMemoryAccountRepository::new();
        repo.create_account(&AccountModel::new("user-1", "line", "a"))
            .await
            .unwrap();

        let result = repo
            .create_account(&AccountModel::new("user-1", "line", "b"))
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_delete_for_user() {
        let repo = InMemoryAccountRepository::new();
        repo.create_account(&AccountModel::new("user-1", "google", "sub-1"))
            .await
            .unwrap();

        repo.delete_for_user("user-1", "google").await.unwrap();
        assert!(repo.list_for_user("user-1").await.unwrap().is_empty());
        assert!(matches!(
            repo.delete_for_user("user-1", "google").await,
            Err(AppError::NotFound(_))
        ));
    }
}
