use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Mutex;
use tracing::{instrument, warn};

use super::models::FavoriteModel;
use crate::shared::AppError;

const ALREADY_FAVORITED: &str = "既にお気に入りに追加されています";
const NOT_FAVORITED: &str = "お気に入りに登録されていません";

/// Trait for favorite repository operations
#[async_trait]
pub trait FavoriteRepository {
    /// Conflict when the space is already a favorite of the user
    async fn add_favorite(&self, favorite: &FavoriteModel) -> Result<(), AppError>;
    /// NotFound when the space was not a favorite
    async fn remove_favorite(&self, user_id: &str, space_id: &str) -> Result<(), AppError>;
    /// The user's favorites, newest first
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<FavoriteModel>, AppError>;
    /// Drops every favorite of a deleted space
    async fn delete_for_space(&self, space_id: &str) -> Result<u64, AppError>;
}

/// In-memory implementation of FavoriteRepository for development and testing
pub struct InMemoryFavoriteRepository {
    favorites: Mutex<Vec<FavoriteModel>>,
}

impl Default for InMemoryFavoriteRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryFavoriteRepository {
    pub fn new() -> Self {
        Self {
            favorites: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl FavoriteRepository for InMemoryFavoriteRepository {
    #[instrument(skip(self, favorite))]
    async fn add_favorite(&self, favorite: &FavoriteModel) -> Result<(), AppError> {
        let mut favorites = self.favorites.lock().unwrap();
        if favorites
            .iter()
            .any(|f| f.user_id == favorite.user_id && f.space_id == favorite.space_id)
        {
            return Err(AppError::Conflict(ALREADY_FAVORITED.to_string()));
        }
        favorites.push(favorite.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_favorite(&self, user_id: &str, space_id: &str) -> Result<(), AppError> {
        let mut favorites = self.favorites.lock().unwrap();
        let before = favorites.len();
        favorites.retain(|f| !(f.user_id == user_id && f.space_id == space_id));
        if favorites.len() == before {
            return Err(AppError::NotFound(NOT_FAVORITED.to_string()));
        }
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<FavoriteModel>, AppError> {
        let favorites = self.favorites.lock().unwrap();
        let mut mine: Vec<FavoriteModel> = favorites
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }

    async fn delete_for_space(&self, space_id: &str) -> Result<u64, AppError> {
        let mut favorites = self.favorites.lock().unwrap();
        let before = favorites.len();
        favorites.retain(|f| f.space_id != space_id);
        Ok((before - favorites.len()) as u64)
    }
}

/// PostgreSQL implementation of favorite repository
pub struct PostgresFavoriteRepository {
    pool: PgPool,
}

impl PostgresFavoriteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FavoriteRepository for PostgresFavoriteRepository {
    #[instrument(skip(self, favorite))]
    async fn add_favorite(&self, favorite: &FavoriteModel) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO favorites (id, user_id, space_id, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&favorite.id)
        .bind(&favorite.user_id)
        .bind(&favorite.space_id)
        .bind(favorite.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict(ALREADY_FAVORITED.to_string())
            }
            other => {
                warn!(error = %other, "Failed to add favorite in database");
                AppError::from(other)
            }
        })?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_favorite(&self, user_id: &str, space_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND space_id = $2")
            .bind(user_id)
            .bind(space_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(NOT_FAVORITED.to_string()));
        }
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<FavoriteModel>, AppError> {
        let favorites = sqlx::query_as::<_, FavoriteModel>(
            "SELECT id, user_id, space_id, created_at FROM favorites \
             WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(favorites)
    }

    async fn delete_for_space(&self, space_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM favorites WHERE space_id = $1")
            .bind(space_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
