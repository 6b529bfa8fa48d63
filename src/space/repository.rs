use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::{models::SpaceModel, types::SpaceQuery};
use crate::shared::AppError;

/// Trait for space repository operations
#[async_trait]
pub trait SpaceRepository {
    async fn create_space(&self, space: &SpaceModel) -> Result<(), AppError>;
    async fn get_space(&self, space_id: &str) -> Result<Option<SpaceModel>, AppError>;
    /// Active spaces matching the filters, newest first
    async fn search_spaces(&self, query: &SpaceQuery) -> Result<Vec<SpaceModel>, AppError>;
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<SpaceModel>, AppError>;
    async fn get_spaces(&self, space_ids: &[String]) -> Result<Vec<SpaceModel>, AppError>;
    async fn update_space(&self, space: &SpaceModel) -> Result<(), AppError>;
    async fn delete_space(&self, space_id: &str) -> Result<(), AppError>;
    async fn count_spaces(&self) -> Result<i64, AppError>;
}

/// In-memory implementation of SpaceRepository for development and testing
pub struct InMemorySpaceRepository {
    spaces: Mutex<HashMap<String, SpaceModel>>,
}

impl Default for InMemorySpaceRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySpaceRepository {
    pub fn new() -> Self {
        Self {
            spaces: Mutex::new(HashMap::new()),
        }
    }

    fn newest_first(mut spaces: Vec<SpaceModel>) -> Vec<SpaceModel> {
        spaces.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        spaces
    }
}

#[async_trait]
impl SpaceRepository for InMemorySpaceRepository {
    #[instrument(skip(self, space))]
    async fn create_space(&self, space: &SpaceModel) -> Result<(), AppError> {
        debug!(space_id = %space.id, owner_id = %space.owner_id, "Creating space in memory");

        let mut spaces = self.spaces.lock().unwrap();
        if spaces.contains_key(&space.id) {
            warn!(space_id = %space.id, "Space already exists in memory");
            return Err(AppError::DatabaseError("Space already exists".to_string()));
        }
        spaces.insert(space.id.clone(), space.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_space(&self, space_id: &str) -> Result<Option<SpaceModel>, AppError> {
        Ok(self.spaces.lock().unwrap().get(space_id).cloned())
    }

    #[instrument(skip(self))]
    async fn search_spaces(&self, query: &SpaceQuery) -> Result<Vec<SpaceModel>, AppError> {
        let spaces = self.spaces.lock().unwrap();
        let matching = spaces
            .values()
            .filter(|s| s.is_active)
            .filter(|s| match &query.prefecture {
                Some(p) => s.prefecture.as_deref() == Some(p.as_str()),
                None => true,
            })
            .filter(|s| match &query.keyword {
                Some(k) => s.matches_keyword(k),
                None => true,
            })
            .filter(|s| match query.max_price {
                Some(max) => s.price_per_day <= max,
                None => true,
            })
            .cloned()
            .collect();
        Ok(Self::newest_first(matching))
    }

    #[instrument(skip(self))]
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<SpaceModel>, AppError> {
        let spaces = self.spaces.lock().unwrap();
        let owned = spaces
            .values()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect();
        Ok(Self::newest_first(owned))
    }

    async fn get_spaces(&self, space_ids: &[String]) -> Result<Vec<SpaceModel>, AppError> {
        let spaces = self.spaces.lock().unwrap();
        Ok(space_ids
            .iter()
            .filter_map(|id| spaces.get(id).cloned())
            .collect())
    }

    #[instrument(skip(self, space))]
    async fn update_space(&self, space: &SpaceModel) -> Result<(), AppError> {
        let mut spaces = self.spaces.lock().unwrap();
        if !spaces.contains_key(&space.id) {
            warn!(space_id = %space.id, "Space not found for update in memory");
            return Err(AppError::NotFound("スペースが見つかりません".to_string()));
        }
        spaces.insert(space.id.clone(), space.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_space(&self, space_id: &str) -> Result<(), AppError> {
        if self.spaces.lock().unwrap().remove(space_id).is_none() {
            return Err(AppError::NotFound("スペースが見つかりません".to_string()));
        }
        Ok(())
    }

    async fn count_spaces(&self) -> Result<i64, AppError> {
        Ok(self.spaces.lock().unwrap().len() as i64)
    }
}

/// PostgreSQL implementation of space repository
pub struct PostgresSpaceRepository {
    pool: PgPool,
}

impl PostgresSpaceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SPACE_COLUMNS: &str = "id, owner_id, title, description, address, prefecture, price_per_day, capacity, is_active, created_at, updated_at";

#[async_trait]
impl SpaceRepository for PostgresSpaceRepository {
    #[instrument(skip(self, space))]
    async fn create_space(&self, space: &SpaceModel) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO spaces (id, owner_id, title, description, address, prefecture, price_per_day, capacity, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&space.id)
        .bind(&space.owner_id)
        .bind(&space.title)
        .bind(&space.description)
        .bind(&space.address)
        .bind(&space.prefecture)
        .bind(space.price_per_day)
        .bind(space.capacity)
        .bind(space.is_active)
        .bind(space.created_at)
        .bind(space.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create space in database");
            AppError::from(e)
        })?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_space(&self, space_id: &str) -> Result<Option<SpaceModel>, AppError> {
        let space = sqlx::query_as::<_, SpaceModel>(&format!(
            "SELECT {SPACE_COLUMNS} FROM spaces WHERE id = $1"
        ))
        .bind(space_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(space)
    }

    #[instrument(skip(self))]
    async fn search_spaces(&self, query: &SpaceQuery) -> Result<Vec<SpaceModel>, AppError> {
        let spaces = sqlx::query_as::<_, SpaceModel>(&format!(
            "SELECT {SPACE_COLUMNS} FROM spaces \
             WHERE is_active \
             AND ($1::text IS NULL OR prefecture = $1) \
             AND ($2::text IS NULL OR title ILIKE '%' || $2 || '%' \
                  OR address ILIKE '%' || $2 || '%' OR description ILIKE '%' || $2 || '%') \
             AND ($3::int IS NULL OR price_per_day <= $3) \
             ORDER BY created_at DESC"
        ))
        .bind(&query.prefecture)
        .bind(&query.keyword)
        .bind(query.max_price)
        .fetch_all(&self.pool)
        .await?;
        Ok(spaces)
    }

    #[instrument(skip(self))]
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<SpaceModel>, AppError> {
        let spaces = sqlx::query_as::<_, SpaceModel>(&format!(
            "SELECT {SPACE_COLUMNS} FROM spaces WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(spaces)
    }

    async fn get_spaces(&self, space_ids: &[String]) -> Result<Vec<SpaceModel>, AppError> {
        let spaces = sqlx::query_as::<_, SpaceModel>(&format!(
            "SELECT {SPACE_COLUMNS} FROM spaces WHERE id = ANY($1)"
        ))
        .bind(space_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(spaces)
    }

    #[instrument(skip(self, space))]
    async fn update_space(&self, space: &SpaceModel) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE spaces SET title = $2, description = $3, address = $4, prefecture = $5, \
             price_per_day = $6, capacity = $7, is_active = $8, updated_at = $9 WHERE id = $1",
        )
        .bind(&space.id)
        .bind(&space.title)
        .bind(&space.description)
        .bind(&space.address)
        .bind(&space.prefecture)
        .bind(space.price_per_day)
        .bind(space.capacity)
        .bind(space.is_active)
        .bind(space.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("スペースが見つかりません".to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_space(&self, space_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM spaces WHERE id = $1")
            .bind(space_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("スペースが見つかりません".to_string()));
        }
        Ok(())
    }

    async fn count_spaces(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM spaces")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn space(owner: &str, title: &str, prefecture: &str, price: i32) -> SpaceModel {
        let mut space = SpaceModel::new(owner, title.to_string(), "東京都渋谷区1-1".to_string());
        space.prefecture = Some(prefecture.to_string());
        space.price_per_day = price;
        space
    }

    #[tokio::test]
    async fn test_search_filters_and_order() {
        let repo = InMemorySpaceRepository::new();
        let mut old = space("o1", "駅前広場", "東京都", 5000);
        old.created_at = Utc::now() - Duration::days(1);
        let new = space("o1", "商店街の空き地", "東京都", 3000);
        let osaka = space("o2", "駅前ロータリー", "大阪府", 3000);
        let mut inactive = space("o2", "駅前駐車場", "東京都", 1000);
        inactive.is_active = false;
        for s in [&old, &new, &osaka, &inactive] {
            repo.create_space(s).await.unwrap();
        }

        let tokyo = repo
            .search_spaces(&SpaceQuery {
                prefecture: Some("東京都".to_string()),
                ..SpaceQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(
            tokyo.iter().map(|s| s.id.clone()).collect::<Vec<_>>(),
            vec![new.id.clone(), old.id.clone()]
        );

        let cheap_station = repo
            .search_spaces(&SpaceQuery {
                keyword: Some("駅前".to_string()),
                max_price: Some(4000),
                ..SpaceQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(cheap_station.len(), 1);
        assert_eq!(cheap_station[0].id, osaka.id);
    }

    #[tokio::test]
    async fn test_list_by_owner_includes_inactive() {
        let repo = InMemorySpaceRepository::new();
        let mut inactive = space("o1", "休止中", "東京都", 1000);
        inactive.is_active = false;
        repo.create_space(&inactive).await.unwrap();

        assert_eq!(repo.list_by_owner("o1").await.unwrap().len(), 1);
        assert!(repo.list_by_owner("o2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_space() {
        let repo = InMemorySpaceRepository::new();
        assert!(matches!(
            repo.delete_space("nope").await,
            Err(AppError::NotFound(_))
        ));
    }
}
