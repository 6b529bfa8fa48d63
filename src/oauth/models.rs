use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for the accounts table: one row per linked identity provider login
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AccountModel {
    pub id: String,
    pub user_id: String,
    pub provider: String,            // "google", "line"
    pub provider_account_id: String, // Subject id issued by the provider
    pub created_at: DateTime<Utc>,
}

impl AccountModel {
    pub fn new(user_id: &str, provider: &str, provider_account_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            provider: provider.to_string(),
            provider_account_id: provider_account_id.to_string(),
            created_at: Utc::now(),
        }
    }
}
