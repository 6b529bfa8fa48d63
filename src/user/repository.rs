use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::{normalize_email, ProfileModel, UserModel};
use crate::shared::AppError;

/// Trait for user and profile persistence
#[async_trait]
pub trait UserRepository {
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError>;
    async fn get_user(&self, user_id: &str) -> Result<Option<UserModel>, AppError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError>;
    async fn update_user(&self, user: &UserModel) -> Result<(), AppError>;
    async fn list_users(&self) -> Result<Vec<UserModel>, AppError>;
    async fn count_users(&self) -> Result<i64, AppError>;
    async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileModel>, AppError>;
    async fn upsert_profile(&self, profile: &ProfileModel) -> Result<(), AppError>;
}

/// In-memory implementation of UserRepository for development and testing
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<String, UserModel>>,
    profiles: Mutex<HashMap<String, ProfileModel>>,
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            profiles: Mutex::new(HashMap::new()),
        }
    }

    /// Creates an in-memory repository with pre-populated users
    pub fn with_users(users: Vec<UserModel>) -> Self {
        let repo = Self::new();
        {
            let mut map = repo.users.lock().unwrap();
            for user in users {
                map.insert(user.id.clone(), user);
            }
        }
        repo
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self, user))]
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError> {
        debug!(user_id = %user.id, "Creating user in memory");

        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == user.email) {
            warn!(user_id = %user.id, "Email already registered in memory");
            return Err(AppError::Conflict(
                "このメールアドレスは既に登録されています".to_string(),
            ));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: &str) -> Result<Option<UserModel>, AppError> {
        Ok(self.users.lock().unwrap().get(user_id).cloned())
    }

    #[instrument(skip(self))]
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError> {
        let email = normalize_email(email);
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    #[instrument(skip(self, user))]
    async fn update_user(&self, user: &UserModel) -> Result<(), AppError> {
        let mut users = self.users.lock().unwrap();
        if !users.contains_key(&user.id) {
            warn!(user_id = %user.id, "User not found for update in memory");
            return Err(AppError::NotFound("ユーザーが見つかりません".to_string()));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<UserModel>, AppError> {
        let mut users: Vec<UserModel> = self.users.lock().unwrap().values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn count_users(&self) -> Result<i64, AppError> {
        Ok(self.users.lock().unwrap().len() as i64)
    }

    #[instrument(skip(self))]
    async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileModel>, AppError> {
        Ok(self.profiles.lock().unwrap().get(user_id).cloned())
    }

    #[instrument(skip(self, profile))]
    async fn upsert_profile(&self, profile: &ProfileModel) -> Result<(), AppError> {
        debug!(user_id = %profile.user_id, "Upserting profile in memory");
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }
}

/// PostgreSQL implementation of user repository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, email, name, image, password_hash, user_type, is_admin, is_verified, created_at, updated_at";

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self, user))]
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError> {
        debug!(user_id = %user.id, "Creating user in database");

        sqlx::query(
            "INSERT INTO users (id, email, name, image, password_hash, user_type, is_admin, is_verified, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.image)
        .bind(&user.password_hash)
        .bind(&user.user_type)
        .bind(user.is_admin)
        .bind(user.is_verified)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::Conflict(
                "このメールアドレスは既に登録されています".to_string(),
            ),
            other => {
                warn!(error = %other, "Failed to create user in database");
                AppError::from(other)
            }
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: &str) -> Result<Option<UserModel>, AppError> {
        let user = sqlx::query_as::<_, UserModel>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError> {
        let user = sqlx::query_as::<_, UserModel>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    #[instrument(skip(self, user))]
    async fn update_user(&self, user: &UserModel) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE users SET name = $2, image = $3, password_hash = $4, user_type = $5, \
             is_admin = $6, is_verified = $7, updated_at = $8 WHERE id = $1",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.image)
        .bind(&user.password_hash)
        .bind(&user.user_type)
        .bind(user.is_admin)
        .bind(user.is_verified)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(user_id = %user.id, "User not found for update");
            return Err(AppError::NotFound("ユーザーが見つかりません".to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<UserModel>, AppError> {
        let users = sqlx::query_as::<_, UserModel>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn count_users(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn get_profile(&self, user_id: &str) -> Result<Option<ProfileModel>, AppError> {
        let profile = sqlx::query_as::<_, ProfileModel>(
            "SELECT user_id, bio, phone, company_name, website, prefecture, updated_at \
             FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    #[instrument(skip(self, profile))]
    async fn upsert_profile(&self, profile: &ProfileModel) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO profiles (user_id, bio, phone, company_name, website, prefecture, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (user_id) DO UPDATE SET bio = $2, phone = $3, company_name = $4, \
             website = $5, prefecture = $6, updated_at = $7",
        )
        .bind(&profile.user_id)
        .bind(&profile.bio)
        .bind(&profile.phone)
        .bind(&profile.company_name)
        .bind(&profile.website)
        .bind(&profile.prefecture)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
