use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for favorites table: a space bookmarked by a user
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct FavoriteModel {
    pub id: String,
    pub user_id: String,
    pub space_id: String,
    pub created_at: DateTime<Utc>,
}

impl FavoriteModel {
    pub fn new(user_id: &str, space_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            space_id: space_id.to_string(),
            created_at: Utc::now(),
        }
    }
}
