use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    models::SpaceModel,
    repository::SpaceRepository,
    types::{CreateSpaceRequest, SpaceQuery, UpdateSpaceRequest},
};
use crate::booking::repository::BookingRepository;
use crate::favorite::repository::FavoriteRepository;
use crate::message::repository::MessageRepository;
use crate::review::repository::ReviewRepository;
use crate::shared::AppError;
use crate::user::{
    models::UserModel, repository::UserRepository, roles::UserRole, service::require_role,
};

const MAX_TITLE_CHARS: usize = 100;

/// Service for listing and managing spaces
pub struct SpaceService {
    repository: Arc<dyn SpaceRepository + Send + Sync>,
    user_repository: Arc<dyn UserRepository + Send + Sync>,
    dependents: SpaceDependents,
}

/// Rows that belong to a space and go away with it
pub struct SpaceDependents {
    pub bookings: Arc<dyn BookingRepository + Send + Sync>,
    pub favorites: Arc<dyn FavoriteRepository + Send + Sync>,
    pub messages: Arc<dyn MessageRepository + Send + Sync>,
    pub reviews: Arc<dyn ReviewRepository + Send + Sync>,
}

impl SpaceService {
    pub fn new(
        repository: Arc<dyn SpaceRepository + Send + Sync>,
        user_repository: Arc<dyn UserRepository + Send + Sync>,
        dependents: SpaceDependents,
    ) -> Self {
        Self {
            repository,
            user_repository,
            dependents,
        }
    }

    async fn require_user(&self, user_id: &str) -> Result<UserModel, AppError> {
        self.user_repository
            .get_user(user_id)
            .await?
            .ok_or_else(AppError::unauthenticated)
    }

    /// Loads a space or fails with 404
    pub async fn require_space(&self, space_id: &str) -> Result<SpaceModel, AppError> {
        self.repository
            .get_space(space_id)
            .await?
            .ok_or_else(|| AppError::NotFound("スペースが見つかりません".to_string()))
    }

    /// Loads a space the caller owns: 404 when missing, 403 when someone else's
    async fn require_owned_space(
        &self,
        space_id: &str,
        user_id: &str,
    ) -> Result<SpaceModel, AppError> {
        let space = self.require_space(space_id).await?;
        if !space.is_owned_by(user_id) {
            warn!(space_id = %space_id, user_id = %user_id, "Space modification by non-owner");
            return Err(AppError::Forbidden(
                "このスペースを編集する権限がありません".to_string(),
            ));
        }
        Ok(space)
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: SpaceQuery) -> Result<Vec<SpaceModel>, AppError> {
        let query = SpaceQuery {
            prefecture: non_blank(query.prefecture),
            keyword: non_blank(query.keyword),
            max_price: query.max_price,
        };
        self.repository.search_spaces(&query).await
    }

    pub async fn list_mine(&self, user_id: &str) -> Result<Vec<SpaceModel>, AppError> {
        self.repository.list_by_owner(user_id).await
    }

    #[instrument(skip(self, request))]
    pub async fn create_space(
        &self,
        user_id: &str,
        request: CreateSpaceRequest,
    ) -> Result<SpaceModel, AppError> {
        let user = self.require_user(user_id).await?;
        require_role(&user, UserRole::Owner)?;

        let mut space = SpaceModel::new(
            user_id,
            validate_title(&request.title)?,
            validate_address(&request.address)?,
        );
        space.description = non_blank(request.description);
        space.prefecture = non_blank(request.prefecture);
        space.price_per_day = validate_price(request.price_per_day)?;
        space.capacity = validate_capacity(request.capacity)?;

        self.repository.create_space(&space).await?;
        info!(space_id = %space.id, owner_id = %user_id, "Space created");
        Ok(space)
    }

    #[instrument(skip(self, request))]
    pub async fn update_space(
        &self,
        space_id: &str,
        user_id: &str,
        request: UpdateSpaceRequest,
    ) -> Result<SpaceModel, AppError> {
        let mut space = self.require_owned_space(space_id, user_id).await?;

        if let Some(title) = request.title {
            space.title = validate_title(&title)?;
        }
        if let Some(address) = request.address {
            space.address = validate_address(&address)?;
        }
        if let Some(description) = request.description {
            space.description = non_blank(Some(description));
        }
        if let Some(prefecture) = request.prefecture {
            space.prefecture = non_blank(Some(prefecture));
        }
        if let Some(price) = request.price_per_day {
            space.price_per_day = validate_price(price)?;
        }
        if let Some(capacity) = request.capacity {
            space.capacity = validate_capacity(capacity)?;
        }
        if let Some(is_active) = request.is_active {
            space.is_active = is_active;
        }
        space.updated_at = Utc::now();

        self.repository.update_space(&space).await?;
        info!(space_id = %space_id, "Space updated");
        Ok(space)
    }

    #[instrument(skip(self))]
    pub async fn delete_space(&self, space_id: &str, user_id: &str) -> Result<(), AppError> {
        self.require_owned_space(space_id, user_id).await?;

        // Bookings and favorites go with the space; messages and reviews only lose the link
        let removed = self.dependents.bookings.delete_for_space(space_id).await?;
        if !removed.is_empty() {
            self.dependents.messages.detach_bookings(&removed).await?;
            self.dependents.reviews.detach_bookings(&removed).await?;
        }
        let favorites = self.dependents.favorites.delete_for_space(space_id).await?;
        self.repository.delete_space(space_id).await?;

        info!(
            space_id = %space_id,
            bookings_removed = removed.len(),
            favorites_removed = favorites,
            "Space deleted"
        );
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::BadRequest(format!(
            "タイトルは1〜{MAX_TITLE_CHARS}文字で入力してください"
        )));
    }
    Ok(title.to_string())
}

fn validate_address(address: &str) -> Result<String, AppError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(AppError::BadRequest("住所を入力してください".to_string()));
    }
    Ok(address.to_string())
}

fn validate_price(price: i32) -> Result<i32, AppError> {
    if price < 0 {
        return Err(AppError::BadRequest(
            "料金は0円以上で入力してください".to_string(),
        ));
    }
    Ok(price)
}

fn validate_capacity(capacity: i32) -> Result<i32, AppError> {
    if capacity < 1 {
        return Err(AppError::BadRequest(
            "受け入れ台数は1以上で入力してください".to_string(),
        ));
    }
    Ok(capacity)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{models::BookingModel, repository::InMemoryBookingRepository};
    use crate::favorite::{models::FavoriteModel, repository::InMemoryFavoriteRepository};
    use crate::message::{models::MessageModel, repository::InMemoryMessageRepository};
    use crate::review::repository::InMemoryReviewRepository;
    use crate::space::repository::InMemorySpaceRepository;
    use crate::user::repository::InMemoryUserRepository;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn request(title: &str, price: i32, capacity: i32) -> CreateSpaceRequest {
        CreateSpaceRequest {
            title: title.to_string(),
            description: None,
            address: "東京都渋谷区1-1".to_string(),
            prefecture: Some("東京都".to_string()),
            price_per_day: price,
            capacity,
        }
    }

    struct Dependents {
        bookings: Arc<InMemoryBookingRepository>,
        favorites: Arc<InMemoryFavoriteRepository>,
        messages: Arc<InMemoryMessageRepository>,
    }

    fn setup_with_dependents() -> (SpaceService, UserModel, UserModel, Dependents) {
        let owner = UserModel::new("o@example.jp", "owner".to_string(), &[UserRole::Owner]);
        let vendor = UserModel::new("v@example.jp", "vendor".to_string(), &[UserRole::Vendor]);
        let dependents = Dependents {
            bookings: Arc::new(InMemoryBookingRepository::new()),
            favorites: Arc::new(InMemoryFavoriteRepository::new()),
            messages: Arc::new(InMemoryMessageRepository::new()),
        };
        let service = SpaceService::new(
            Arc::new(InMemorySpaceRepository::new()),
            Arc::new(InMemoryUserRepository::with_users(vec![
                owner.clone(),
                vendor.clone(),
            ])),
            SpaceDependents {
                bookings: dependents.bookings.clone(),
                favorites: dependents.favorites.clone(),
                messages: dependents.messages.clone(),
                reviews: Arc::new(InMemoryReviewRepository::new()),
            },
        );
        (service, owner, vendor, dependents)
    }

    fn setup() -> (SpaceService, UserModel, UserModel) {
        let (service, owner, vendor, _) = setup_with_dependents();
        (service, owner, vendor)
    }

    #[tokio::test]
    async fn test_create_space_requires_owner_role() {
        let (service, _, vendor) = setup();

        let result = service
            .create_space(&vendor.id, request("駅前広場", 3000, 2))
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[rstest]
    #[case("", 3000, 1)]
    #[case(&"a".repeat(101), 3000, 1)]
    #[case("駅前広場", -1, 1)]
    #[case("駅前広場", 3000, 0)]
    #[tokio::test]
    async fn test_create_space_validation(
        #[case] title: &str,
        #[case] price: i32,
        #[case] capacity: i32,
    ) {
        let (service, owner, _) = setup();

        let result = service
            .create_space(&owner.id, request(title, price, capacity))
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_only_owner_can_update_or_delete() {
        let (service, owner, vendor) = setup();
        let space = service
            .create_space(&owner.id, request("駅前広場", 3000, 2))
            .await
            .unwrap();

        let update = service
            .update_space(
                &space.id,
                &vendor.id,
                UpdateSpaceRequest {
                    title: Some("乗っ取り".to_string()),
                    ..UpdateSpaceRequest::default()
                },
            )
            .await;
        assert!(matches!(update, Err(AppError::Forbidden(_))));
        assert!(matches!(
            service.delete_space(&space.id, &vendor.id).await,
            Err(AppError::Forbidden(_))
        ));

        let updated = service
            .update_space(
                &space.id,
                &owner.id,
                UpdateSpaceRequest {
                    is_active: Some(false),
                    price_per_day: Some(0),
                    ..UpdateSpaceRequest::default()
                },
            )
            .await
            .unwrap();
        assert!(!updated.is_active);
        assert_eq!(updated.price_per_day, 0);
        assert!(service.search(SpaceQuery::default()).await.unwrap().is_empty());

        service.delete_space(&space.id, &owner.id).await.unwrap();
        assert!(matches!(
            service.require_space(&space.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_space_removes_its_bookings_and_favorites() {
        let (service, owner, vendor, deps) = setup_with_dependents();
        let space = service
            .create_space(&owner.id, request("駅前広場", 3000, 2))
            .await
            .unwrap();
        let kept = service
            .create_space(&owner.id, request("公園横", 1000, 1))
            .await
            .unwrap();

        let date = NaiveDate::from_ymd_opt(2030, 5, 1).unwrap();
        let booking = BookingModel::new(&space.id, &vendor.id, &owner.id, date);
        deps.bookings.create_booking(&booking).await.unwrap();
        deps.bookings
            .create_booking(&BookingModel::new(&kept.id, &vendor.id, &owner.id, date))
            .await
            .unwrap();
        deps.favorites
            .add_favorite(&FavoriteModel::new(&vendor.id, &space.id))
            .await
            .unwrap();
        let mut message = MessageModel::new(&vendor.id, &owner.id, "よろしく".to_string());
        message.booking_id = Some(booking.id.clone());
        deps.messages.create_message(&message).await.unwrap();

        service.delete_space(&space.id, &owner.id).await.unwrap();

        assert!(deps.bookings.get_booking(&booking.id).await.unwrap().is_none());
        assert_eq!(deps.bookings.list_for_owner(&owner.id).await.unwrap().len(), 1);
        assert!(deps.favorites.list_for_user(&vendor.id).await.unwrap().is_empty());
        let thread = deps.messages.list_thread(&vendor.id, &owner.id).await.unwrap();
        assert_eq!(thread.len(), 1);
        assert!(thread[0].booking_id.is_none());
    }

    #[tokio::test]
    async fn test_blank_filters_are_ignored() {
        let (service, owner, _) = setup();
        service
            .create_space(&owner.id, request("駅前広場", 3000, 2))
            .await
            .unwrap();

        let found = service
            .search(SpaceQuery {
                prefecture: Some("".to_string()),
                keyword: Some("  ".to_string()),
                max_price: None,
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
