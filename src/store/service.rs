use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    models::StoreModel,
    repository::StoreRepository,
    types::{CreateStoreRequest, UpdateStoreRequest},
};
use crate::booking::repository::BookingRepository;
use crate::shared::AppError;
use crate::user::{repository::UserRepository, roles::UserRole, service::require_role};

const MAX_NAME_CHARS: usize = 100;

/// Service for vendor stores
pub struct StoreService {
    repository: Arc<dyn StoreRepository + Send + Sync>,
    user_repository: Arc<dyn UserRepository + Send + Sync>,
    booking_repository: Arc<dyn BookingRepository + Send + Sync>,
}

impl StoreService {
    pub fn new(
        repository: Arc<dyn StoreRepository + Send + Sync>,
        user_repository: Arc<dyn UserRepository + Send + Sync>,
        booking_repository: Arc<dyn BookingRepository + Send + Sync>,
    ) -> Self {
        Self {
            repository,
            user_repository,
            booking_repository,
        }
    }

    pub async fn require_store(&self, store_id: &str) -> Result<StoreModel, AppError> {
        self.repository
            .get_store(store_id)
            .await?
            .ok_or_else(|| AppError::NotFound("店舗が見つかりません".to_string()))
    }

    async fn require_owned_store(
        &self,
        store_id: &str,
        user_id: &str,
    ) -> Result<StoreModel, AppError> {
        let store = self.require_store(store_id).await?;
        if !store.is_owned_by(user_id) {
            warn!(store_id = %store_id, user_id = %user_id, "Store modification by non-owner");
            return Err(AppError::Forbidden(
                "この店舗を編集する権限がありません".to_string(),
            ));
        }
        Ok(store)
    }

    pub async fn list(&self, category: Option<String>) -> Result<Vec<StoreModel>, AppError> {
        let category = non_blank(category);
        self.repository.list_stores(category.as_deref()).await
    }

    pub async fn list_mine(&self, user_id: &str) -> Result<Vec<StoreModel>, AppError> {
        self.repository.list_by_vendor(user_id).await
    }

    #[instrument(skip(self, request))]
    pub async fn create_store(
        &self,
        user_id: &str,
        request: CreateStoreRequest,
    ) -> Result<StoreModel, AppError> {
        let user = self
            .user_repository
            .get_user(user_id)
            .await?
            .ok_or_else(AppError::unauthenticated)?;
        require_role(&user, UserRole::Vendor)?;

        let mut store = StoreModel::new(user_id, validate_name(&request.name)?);
        store.description = non_blank(request.description);
        store.category = non_blank(request.category);
        store.image_url = non_blank(request.image_url);

        self.repository.create_store(&store).await?;
        info!(store_id = %store.id, vendor_id = %user_id, "Store created");
        Ok(store)
    }

    #[instrument(skip(self, request))]
    pub async fn update_store(
        &self,
        store_id: &str,
        user_id: &str,
        request: UpdateStoreRequest,
    ) -> Result<StoreModel, AppError> {
        let mut store = self.require_owned_store(store_id, user_id).await?;

        if let Some(name) = request.name {
            store.name = validate_name(&name)?;
        }
        if let Some(description) = request.description {
            store.description = non_blank(Some(description));
        }
        if let Some(category) = request.category {
            store.category = non_blank(Some(category));
        }
        if let Some(image_url) = request.image_url {
            store.image_url = non_blank(Some(image_url));
        }
        store.updated_at = Utc::now();

        self.repository.update_store(&store).await?;
        Ok(store)
    }

    #[instrument(skip(self))]
    pub async fn delete_store(&self, store_id: &str, user_id: &str) -> Result<(), AppError> {
        self.require_owned_store(store_id, user_id).await?;
        // Bookings outlive the store
        let detached = self.booking_repository.clear_store(store_id).await?;
        self.repository.delete_store(store_id).await?;
        info!(store_id = %store_id, bookings_detached = detached, "Store deleted");
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::BadRequest(format!(
            "店舗名は1〜{MAX_NAME_CHARS}文字で入力してください"
        )));
    }
    Ok(name.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
