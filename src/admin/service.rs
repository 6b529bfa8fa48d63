use std::sync::Arc;
use tracing::instrument;

use super::types::AdminStats;
use crate::booking::repository::BookingRepository;
use crate::shared::AppError;
use crate::space::repository::SpaceRepository;
use crate::store::repository::StoreRepository;
use crate::user::{repository::UserRepository, types::UserResponse};
use crate::verification::repository::VerificationRepository;

/// Read-only views over the whole platform for administrators
pub struct AdminService {
    user_repository: Arc<dyn UserRepository + Send + Sync>,
    space_repository: Arc<dyn SpaceRepository + Send + Sync>,
    store_repository: Arc<dyn StoreRepository + Send + Sync>,
    booking_repository: Arc<dyn BookingRepository + Send + Sync>,
    verification_repository: Arc<dyn VerificationRepository + Send + Sync>,
}

impl AdminService {
    pub fn new(
        user_repository: Arc<dyn UserRepository + Send + Sync>,
        space_repository: Arc<dyn SpaceRepository + Send + Sync>,
        store_repository: Arc<dyn StoreRepository + Send + Sync>,
        booking_repository: Arc<dyn BookingRepository + Send + Sync>,
        verification_repository: Arc<dyn VerificationRepository + Send + Sync>,
    ) -> Self {
        Self {
            user_repository,
            space_repository,
            store_repository,
            booking_repository,
            verification_repository,
        }
    }

    pub async fn list_users(&self) -> Result<Vec<UserResponse>, AppError> {
        let users = self.user_repository.list_users().await?;
        Ok(users.iter().map(UserResponse::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<AdminStats, AppError> {
        Ok(AdminStats {
            users: self.user_repository.count_users().await?,
            spaces: self.space_repository.count_spaces().await?,
            stores: self.store_repository.count_stores().await?,
            bookings: self.booking_repository.count_bookings().await?,
            pending_verifications: self.verification_repository.count_pending().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::repository::InMemoryBookingRepository;
    use crate::space::{models::SpaceModel, repository::InMemorySpaceRepository};
    use crate::store::repository::InMemoryStoreRepository;
    use crate::user::{models::UserModel, repository::InMemoryUserRepository};
    use crate::verification::{
        models::VerificationRequestModel, repository::InMemoryVerificationRepository,
    };

    #[tokio::test]
    async fn test_stats_counts_everything() {
        let users = Arc::new(InMemoryUserRepository::with_users(vec![
            UserModel::new("a@example.jp", "a".to_string(), &[]),
            UserModel::new("b@example.jp", "b".to_string(), &[]),
        ]));
        let spaces = Arc::new(InMemorySpaceRepository::new());
        spaces
            .create_space(&SpaceModel::new("a", "広場".to_string(), "東京都".to_string()))
            .await
            .unwrap();
        let verifications = Arc::new(InMemoryVerificationRepository::new());
        verifications
            .create_request(&VerificationRequestModel::new(
                "a",
                "passport".to_string(),
                "https://files.example.jp/p.png".to_string(),
            ))
            .await
            .unwrap();

        let service = AdminService::new(
            users,
            spaces,
            Arc::new(InMemoryStoreRepository::new()),
            Arc::new(InMemoryBookingRepository::new()),
            verifications,
        );

        assert_eq!(
            service.stats().await.unwrap(),
            AdminStats {
                users: 2,
                spaces: 1,
                stores: 0,
                bookings: 0,
                pending_verifications: 1,
            }
        );
        assert_eq!(service.list_users().await.unwrap().len(), 2);
    }
}
