use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for stores table: a vendor's food truck or craft stall
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct StoreModel {
    pub id: String,
    pub vendor_id: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoreModel {
    pub fn new(vendor_id: &str, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            vendor_id: vendor_id.to_string(),
            name,
            description: None,
            category: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.vendor_id == user_id
    }
}
