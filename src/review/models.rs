use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for reviews table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct ReviewModel {
    pub id: String,
    pub reviewer_id: String,
    pub reviewee_id: String,
    pub booking_id: Option<String>,
    pub rating: i32, // 1..=5
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ReviewModel {
    pub fn new(reviewer_id: &str, reviewee_id: &str, rating: i32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            reviewer_id: reviewer_id.to_string(),
            reviewee_id: reviewee_id.to_string(),
            booking_id: None,
            rating,
            comment: None,
            created_at: Utc::now(),
        }
    }
}

/// Unrounded mean rating and number of reviews a user has received
#[derive(Debug, Clone, Copy, PartialEq, FromRow)]
pub struct RatingSummary {
    pub average: Option<f64>,
    pub count: i64,
}
