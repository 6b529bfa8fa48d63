use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

use super::{models::FavoriteModel, repository::FavoriteRepository};
use crate::shared::AppError;
use crate::space::{models::SpaceModel, repository::SpaceRepository};

/// Service for a user's favorite spaces
pub struct FavoriteService {
    repository: Arc<dyn FavoriteRepository + Send + Sync>,
    space_repository: Arc<dyn SpaceRepository + Send + Sync>,
}

impl FavoriteService {
    pub fn new(
        repository: Arc<dyn FavoriteRepository + Send + Sync>,
        space_repository: Arc<dyn SpaceRepository + Send + Sync>,
    ) -> Self {
        Self {
            repository,
            space_repository,
        }
    }

    /// Favorited spaces, most recently added first. Deleted spaces are skipped.
    #[instrument(skip(self))]
    pub async fn list(&self, user_id: &str) -> Result<Vec<SpaceModel>, AppError> {
        let favorites = self.repository.list_for_user(user_id).await?;
        let ids: Vec<String> = favorites.iter().map(|f| f.space_id.clone()).collect();

        let mut spaces: HashMap<String, SpaceModel> = self
            .space_repository
            .get_spaces(&ids)
            .await?
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();

        Ok(ids.iter().filter_map(|id| spaces.remove(id)).collect())
    }

    #[instrument(skip(self))]
    pub async fn add(&self, user_id: &str, space_id: &str) -> Result<FavoriteModel, AppError> {
        if self.space_repository.get_space(space_id).await?.is_none() {
            return Err(AppError::NotFound("スペースが見つかりません".to_string()));
        }

        let favorite = FavoriteModel::new(user_id, space_id);
        self.repository.add_favorite(&favorite).await?;
        info!(user_id = %user_id, space_id = %space_id, "Favorite added");
        Ok(favorite)
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, user_id: &str, space_id: &str) -> Result<(), AppError> {
        self.repository.remove_favorite(user_id, space_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::favorite::repository::InMemoryFavoriteRepository;
    use crate::space::repository::InMemorySpaceRepository;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_favorites_flow() {
        let spaces = Arc::new(InMemorySpaceRepository::new());
        let first = SpaceModel::new("o", "駅前広場".to_string(), "東京都".to_string());
        let second = SpaceModel::new("o", "公園横".to_string(), "東京都".to_string());
        spaces.create_space(&first).await.unwrap();
        spaces.create_space(&second).await.unwrap();
        let favorites = Arc::new(InMemoryFavoriteRepository::new());
        let service = FavoriteService::new(favorites.clone(), spaces);

        assert!(matches!(
            service.add("u", "missing").await,
            Err(AppError::NotFound(_))
        ));

        let mut older = FavoriteModel::new("u", &first.id);
        older.created_at = Utc::now() - Duration::hours(1);
        favorites.add_favorite(&older).await.unwrap();
        service.add("u", &second.id).await.unwrap();
        assert!(matches!(
            service.add("u", &second.id).await,
            Err(AppError::Conflict(_))
        ));

        let listed = service.list("u").await.unwrap();
        assert_eq!(
            listed.iter().map(|s| s.id.clone()).collect::<Vec<_>>(),
            vec![second.id.clone(), first.id.clone()]
        );

        service.remove("u", &first.id).await.unwrap();
        assert_eq!(service.list("u").await.unwrap().len(), 1);
    }
}
