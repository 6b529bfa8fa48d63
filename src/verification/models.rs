use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Approved,
    Rejected,
}

/// Database model for verification_requests table: an identity document
/// submitted for review by an administrator
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct VerificationRequestModel {
    pub id: String,
    pub user_id: String,
    pub document_type: String,
    pub document_url: String,
    pub status: String, // VerificationStatus in lowercase
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl VerificationRequestModel {
    pub fn new(user_id: &str, document_type: String, document_url: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            document_type,
            document_url,
            status: VerificationStatus::Pending.to_string(),
            admin_note: None,
            created_at: Utc::now(),
            reviewed_at: None,
        }
    }

    pub fn status(&self) -> VerificationStatus {
        VerificationStatus::from_str(&self.status).unwrap_or(VerificationStatus::Pending)
    }

    pub fn is_pending(&self) -> bool {
        self.status() == VerificationStatus::Pending
    }

    /// Records an administrator's decision
    pub fn decide(&mut self, status: VerificationStatus, note: Option<String>) {
        self.status = status.to_string();
        self.admin_note = note;
        self.reviewed_at = Some(Utc::now());
    }
}
