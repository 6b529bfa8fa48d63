use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for spaces table: a place an owner rents out to vendors by the day
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct SpaceModel {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub address: String,
    pub prefecture: Option<String>,
    pub price_per_day: i32, // Yen
    pub capacity: i32,      // Number of vehicles/stalls per day
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SpaceModel {
    pub fn new(owner_id: &str, title: String, address: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            title,
            description: None,
            address,
            prefecture: None,
            price_per_day: 0,
            capacity: 1,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    /// Case-insensitive match against title, description and address
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        self.title.to_lowercase().contains(&keyword)
            || self.address.to_lowercase().contains(&keyword)
            || self
                .description
                .as_ref()
                .is_some_and(|d| d.to_lowercase().contains(&keyword))
    }
}
