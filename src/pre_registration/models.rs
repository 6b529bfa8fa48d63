use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Which side of the marketplace a pre-registrant is interested in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InterestType {
    Vendor,
    Owner,
    Both,
}

impl InterestType {
    pub fn label(self) -> &'static str {
        match self {
            InterestType::Vendor => "出店者",
            InterestType::Owner => "スペースオーナー",
            InterestType::Both => "出店者・スペースオーナー",
        }
    }
}

/// Database model for pre_registrations table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct PreRegistrationModel {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub user_type: String,
    pub created_at: DateTime<Utc>,
}

impl PreRegistrationModel {
    pub fn new(email: String, name: Option<String>, interest: InterestType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            name,
            user_type: interest.to_string(),
            created_at: Utc::now(),
        }
    }
}
