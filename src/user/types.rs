use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::{ProfileModel, UserModel};
use super::roles::UserRole;

/// The signed-in user's own view of their account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub image: Option<String>,
    pub roles: Vec<UserRole>,
    pub is_admin: bool,
    pub is_verified: bool,
    pub has_password: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&UserModel> for UserResponse {
    fn from(user: &UserModel) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            image: user.image.clone(),
            roles: user.roles(),
            is_admin: user.is_admin,
            is_verified: user.is_verified,
            has_password: user.has_password(),
            created_at: user.created_at,
        }
    }
}

/// Response for GET /api/users/me
#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: UserResponse,
    pub profile: ProfileModel,
}

/// What other users see on a public profile page
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicUserResponse {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub roles: Vec<UserRole>,
    pub is_verified: bool,
    pub profile: PublicProfile,
    pub average_rating: Option<f64>,
    pub review_count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublicProfile {
    pub bio: Option<String>,
    pub company_name: Option<String>,
    pub website: Option<String>,
    pub prefecture: Option<String>,
}

impl From<ProfileModel> for PublicProfile {
    fn from(profile: ProfileModel) -> Self {
        Self {
            bio: profile.bio,
            company_name: profile.company_name,
            website: profile.website,
            prefecture: profile.prefecture,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRolesRequest {
    pub roles: Vec<UserRole>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub website: Option<String>,
    pub prefecture: Option<String>,
}
