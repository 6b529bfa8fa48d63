use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::StoreModel;
use crate::shared::AppError;

/// Trait for store repository operations
#[async_trait]
pub trait StoreRepository {
    async fn create_store(&self, store: &StoreModel) -> Result<(), AppError>;
    async fn get_store(&self, store_id: &str) -> Result<Option<StoreModel>, AppError>;
    /// All stores, optionally restricted to one category, newest first
    async fn list_stores(&self, category: Option<&str>) -> Result<Vec<StoreModel>, AppError>;
    async fn list_by_vendor(&self, vendor_id: &str) -> Result<Vec<StoreModel>, AppError>;
    async fn update_store(&self, store: &StoreModel) -> Result<(), AppError>;
    async fn delete_store(&self, store_id: &str) -> Result<(), AppError>;
    async fn count_stores(&self) -> Result<i64, AppError>;
}

/// In-memory implementation of StoreRepository for development and testing
pub struct InMemoryStoreRepository {
    stores: Mutex<HashMap<String, StoreModel>>,
}

impl Default for InMemoryStoreRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStoreRepository {
    pub fn new() -> Self {
        Self {
            stores: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl StoreRepository for InMemoryStoreRepository {
    #[instrument(skip(self, store))]
    async fn create_store(&self, store: &StoreModel) -> Result<(), AppError> {
        debug!(store_id = %store.id, vendor_id = %store.vendor_id, "Creating store in memory");
        self.stores
            .lock()
            .unwrap()
            .insert(store.id.clone(), store.clone());
        Ok(())
    }

    async fn get_store(&self, store_id: &str) -> Result<Option<StoreModel>, AppError> {
        Ok(self.stores.lock().unwrap().get(store_id).cloned())
    }

    #[instrument(skip(self))]
    async fn list_stores(&self, category: Option<&str>) -> Result<Vec<StoreModel>, AppError> {
        let stores = self.stores.lock().unwrap();
        let mut matching: Vec<StoreModel> = stores
            .values()
            .filter(|s| category.is_none() || s.category.as_deref() == category)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn list_by_vendor(&self, vendor_id: &str) -> Result<Vec<StoreModel>, AppError> {
        let stores = self.stores.lock().unwrap();
        let mut owned: Vec<StoreModel> = stores
            .values()
            .filter(|s| s.vendor_id == vendor_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    #[instrument(skip(self, store))]
    async fn update_store(&self, store: &StoreModel) -> Result<(), AppError> {
        let mut stores = self.stores.lock().unwrap();
        if !stores.contains_key(&store.id) {
            warn!(store_id = %store.id, "Store not found for update in memory");
            return Err(AppError::NotFound("店舗が見つかりません".to_string()));
        }
        stores.insert(store.id.clone(), store.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_store(&self, store_id: &str) -> Result<(), AppError> {
        if self.stores.lock().unwrap().remove(store_id).is_none() {
            return Err(AppError::NotFound("店舗が見つかりません".to_string()));
        }
        Ok(())
    }

    async fn count_stores(&self) -> Result<i64, AppError> {
        Ok(self.stores.lock().unwrap().len() as i64)
    }
}

/// PostgreSQL implementation of store repository
pub struct PostgresStoreRepository {
    pool: PgPool,
}

impl PostgresStoreRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const STORE_COLUMNS: &str =
    "id, vendor_id, name, description, category, image_url, created_at, updated_at";

#[async_trait]
impl StoreRepository for PostgresStoreRepository {
    #[instrument(skip(self, store))]
    async fn create_store(&self, store: &StoreModel) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO stores (id, vendor_id, name, description, category, image_url, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&store.id)
        .bind(&store.vendor_id)
        .bind(&store.name)
        .bind(&store.description)
        .bind(&store.category)
        .bind(&store.image_url)
        .bind(store.created_at)
        .bind(store.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create store in database");
            AppError::from(e)
        })?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_store(&self, store_id: &str) -> Result<Option<StoreModel>, AppError> {
        let store = sqlx::query_as::<_, StoreModel>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE id = $1"
        ))
        .bind(store_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(store)
    }

    #[instrument(skip(self))]
    async fn list_stores(&self, category: Option<&str>) -> Result<Vec<StoreModel>, AppError> {
        let stores = sqlx::query_as::<_, StoreModel>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores \
             WHERE ($1::text IS NULL OR category = $1) ORDER BY created_at DESC"
        ))
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        Ok(stores)
    }

    #[instrument(skip(self))]
    async fn list_by_vendor(&self, vendor_id: &str) -> Result<Vec<StoreModel>, AppError> {
        let stores = sqlx::query_as::<_, StoreModel>(&format!(
            "SELECT {STORE_COLUMNS} FROM stores WHERE vendor_id = $1 ORDER BY created_at DESC"
        ))
        .bind(vendor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(stores)
    }

    #[instrument(skip(self, store))]
    async fn update_store(&self, store: &StoreModel) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE stores SET name = $2, description = $3, category = $4, image_url = $5, updated_at = $6 \
             WHERE id = $1",
        )
        .bind(&store.id)
        .bind(&store.name)
        .bind(&store.description)
        .bind(&store.category)
        .bind(&store.image_url)
        .bind(store.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("店舗が見つかりません".to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_store(&self, store_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM stores WHERE id = $1")
            .bind(store_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("店舗が見つかりません".to_string()));
        }
        Ok(())
    }

    async fn count_stores(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stores")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_stores_by_category() {
        let repo = InMemoryStoreRepository::new();
        let mut curry = StoreModel::new("v1", "カレー号".to_string());
        curry.category = Some("food".to_string());
        let mut pottery = StoreModel::new("v2", "陶器の店".to_string());
        pottery.category = Some("craft".to_string());
        repo.create_store(&curry).await.unwrap();
        repo.create_store(&pottery).await.unwrap();

        assert_eq!(repo.list_stores(None).await.unwrap().len(), 2);
        let food = repo.list_stores(Some("food")).await.unwrap();
        assert_eq!(food.len(), 1);
        assert_eq!(food[0].id, curry.id);
        assert_eq!(repo.list_by_vendor("v2").await.unwrap()[0].id, pottery.id);
    }

    #[tokio::test]
    async fn test_update_missing_store() {
        let repo = InMemoryStoreRepository::new();
        let store = StoreModel::new("v1", "カレー号".to_string());
        assert!(matches!(
            repo.update_store(&store).await,
            Err(AppError::NotFound(_))
        ));
    }
}
