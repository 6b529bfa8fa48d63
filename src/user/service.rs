use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    models::{ProfileModel, UserModel},
    repository::UserRepository,
    roles::UserRole,
    types::{
        MeResponse, PublicUserResponse, UpdateProfileRequest, UpdateRolesRequest,
        UpdateUserRequest, UserResponse,
    },
};
use crate::review::repository::ReviewRepository;
use crate::review::service::round_rating;
use crate::shared::AppError;

const MAX_NAME_CHARS: usize = 50;
const MAX_BIO_CHARS: usize = 1000;

/// Service for account and profile operations
pub struct UserService {
    repository: Arc<dyn UserRepository + Send + Sync>,
    review_repository: Arc<dyn ReviewRepository + Send + Sync>,
}

impl UserService {
    pub fn new(
        repository: Arc<dyn UserRepository + Send + Sync>,
        review_repository: Arc<dyn ReviewRepository + Send + Sync>,
    ) -> Self {
        Self {
            repository,
            review_repository,
        }
    }

    /// Loads a user or fails with 404
    pub async fn require_user(&self, user_id: &str) -> Result<UserModel, AppError> {
        self.repository
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("ユーザーが見つかりません".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn get_me(&self, user_id: &str) -> Result<MeResponse, AppError> {
        let user = self.require_user(user_id).await?;
        let profile = self
            .repository
            .get_profile(user_id)
            .await?
            .unwrap_or_else(|| ProfileModel::empty(user_id));

        Ok(MeResponse {
            user: UserResponse::from(&user),
            profile,
        })
    }

    #[instrument(skip(self, request))]
    pub async fn update_me(
        &self,
        user_id: &str,
        request: UpdateUserRequest,
    ) -> Result<UserResponse, AppError> {
        let mut user = self.require_user(user_id).await?;

        if let Some(name) = request.name {
            user.name = validate_name(&name)?;
        }
        if let Some(image) = request.image {
            user.image = Some(image).filter(|s| !s.trim().is_empty());
        }
        user.touch();

        self.repository.update_user(&user).await?;
        info!(user_id = %user_id, "User updated");
        Ok(UserResponse::from(&user))
    }

    /// Replaces the caller's roles. At least one role is required.
    #[instrument(skip(self))]
    pub async fn update_roles(
        &self,
        user_id: &str,
        request: UpdateRolesRequest,
    ) -> Result<UserResponse, AppError> {
        if request.roles.is_empty() {
            return Err(AppError::BadRequest(
                "ユーザータイプを1つ以上選択してください".to_string(),
            ));
        }

        let mut user = self.require_user(user_id).await?;
        user.set_roles(&request.roles);
        self.repository.update_user(&user).await?;

        info!(user_id = %user_id, user_type = %user.user_type, "User roles updated");
        Ok(UserResponse::from(&user))
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<ProfileModel, AppError> {
        Ok(self
            .repository
            .get_profile(user_id)
            .await?
            .unwrap_or_else(|| ProfileModel::empty(user_id)))
    }

    #[instrument(skip(self, request))]
    pub async fn update_profile(
        &self,
        user_id: &str,
        request: UpdateProfileRequest,
    ) -> Result<ProfileModel, AppError> {
        if request
            .bio
            .as_ref()
            .is_some_and(|bio| bio.chars().count() > MAX_BIO_CHARS)
        {
            return Err(AppError::BadRequest(format!(
                "自己紹介は{MAX_BIO_CHARS}文字以内で入力してください"
            )));
        }

        let profile = ProfileModel {
            user_id: user_id.to_string(),
            bio: non_blank(request.bio),
            phone: non_blank(request.phone),
            company_name: non_blank(request.company_name),
            website: non_blank(request.website),
            prefecture: non_blank(request.prefecture),
            updated_at: Some(Utc::now()),
        };
        self.repository.upsert_profile(&profile).await?;
        Ok(profile)
    }

    #[instrument(skip(self))]
    pub async fn get_public_user(&self, user_id: &str) -> Result<PublicUserResponse, AppError> {
        let user = self.require_user(user_id).await?;
        let profile = self.get_profile(user_id).await?;
        let summary = self.review_repository.rating_summary(user_id).await?;

        Ok(PublicUserResponse {
            id: user.id.clone(),
            name: user.name.clone(),
            image: user.image.clone(),
            roles: user.roles(),
            is_verified: user.is_verified,
            profile: profile.into(),
            average_rating: summary.average.map(round_rating),
            review_count: summary.count,
        })
    }
}

/// Fails with 403 unless the user holds the given role
pub fn require_role(user: &UserModel, role: UserRole) -> Result<(), AppError> {
    if user.has_role(role) {
        return Ok(());
    }
    let message = match role {
        UserRole::Vendor => "出店者として登録されたユーザーのみ利用できます",
        UserRole::Owner => "スペースオーナーとして登録されたユーザーのみ利用できます",
    };
    Err(AppError::Forbidden(message.to_string()))
}

pub fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::BadRequest(format!(
            "名前は1〜{MAX_NAME_CHARS}文字で入力してください"
        )));
    }
    Ok(name.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::repository::InMemoryReviewRepository;
    use crate::user::repository::InMemoryUserRepository;

    fn service_with(user: UserModel) -> UserService {
        UserService::new(
            Arc::new(InMemoryUserRepository::with_users(vec![user])),
            Arc::new(InMemoryReviewRepository::new()),
        )
    }

    #[tokio::test]
    async fn test_update_roles_requires_at_least_one() {
        let user = UserModel::new("a@example.jp", "a".to_string(), &[UserRole::Vendor]);
        let service = service_with(user.clone());

        let result = service
            .update_roles(&user.id, UpdateRolesRequest { roles: vec![] })
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_update_roles_to_both() {
        let user = UserModel::new("a@example.jp", "a".to_string(), &[UserRole::Vendor]);
        let service = service_with(user.clone());

        let updated = service
            .update_roles(
                &user.id,
                UpdateRolesRequest {
                    roles: vec![UserRole::Owner, UserRole::Vendor],
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.roles, vec![UserRole::Vendor, UserRole::Owner]);
    }

    #[tokio::test]
    async fn test_update_profile_rejects_long_bio() {
        let user = UserModel::new("a@example.jp", "a".to_string(), &[]);
        let service = service_with(user.clone());

        let result = service
            .update_profile(
                &user.id,
                UpdateProfileRequest {
                    bio: Some("あ".repeat(MAX_BIO_CHARS + 1)),
                    phone: None,
                    company_name: None,
                    website: None,
                    prefecture: None,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_public_user_without_reviews() {
        let user = UserModel::new("a@example.jp", "a".to_string(), &[UserRole::Owner]);
        let service = service_with(user.clone());

        let public = service.get_public_user(&user.id).await.unwrap();
        assert_eq!(public.review_count, 0);
        assert!(public.average_rating.is_none());
    }

    #[test]
    fn test_require_role() {
        let vendor = UserModel::new("v@example.jp", "v".to_string(), &[UserRole::Vendor]);
        assert!(require_role(&vendor, UserRole::Vendor).is_ok());
        assert!(matches!(
            require_role(&vendor, UserRole::Owner),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  山田  ").unwrap(), "山田");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"a".repeat(51)).is_err());
    }
}
