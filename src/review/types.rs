use serde::{Deserialize, Serialize};

use super::models::ReviewModel;

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub reviewee_id: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub booking_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewResponse {
    #[serde(flatten)]
    pub review: ReviewModel,
    pub reviewer_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserReviewsResponse {
    pub reviews: Vec<ReviewResponse>,
    pub average_rating: Option<f64>,
    pub count: i64,
}
