use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::{RatingSummary, ReviewModel};
use crate::shared::AppError;

const ALREADY_REVIEWED: &str = "この予約は既にレビュー済みです";

/// Trait for review repository operations
#[async_trait]
pub trait ReviewRepository {
    /// Conflict when the reviewer already reviewed the same booking
    async fn create_review(&self, review: &ReviewModel) -> Result<(), AppError>;
    /// Reviews a user received, newest first
    async fn list_for_reviewee(&self, reviewee_id: &str) -> Result<Vec<ReviewModel>, AppError>;
    async fn rating_summary(&self, reviewee_id: &str) -> Result<RatingSummary, AppError>;
    /// Clears references to deleted bookings. The reviews themselves stay.
    async fn detach_bookings(&self, booking_ids: &[String]) -> Result<u64, AppError>;
}

/// In-memory implementation of ReviewRepository for development and testing
pub struct InMemoryReviewRepository {
    reviews: Mutex<Vec<ReviewModel>>,
}

impl Default for InMemoryReviewRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryReviewRepository {
    pub fn new() -> Self {
        Self {
            reviews: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ReviewRepository for InMemoryReviewRepository {
    #[instrument(skip(self, review))]
    async fn create_review(&self, review: &ReviewModel) -> Result<(), AppError> {
        debug!(review_id = %review.id, reviewee_id = %review.reviewee_id, "Storing review in memory");

        let mut reviews = self.reviews.lock().unwrap();
        let duplicate = review.booking_id.is_some()
            && reviews.iter().any(|r| {
                r.reviewer_id == review.reviewer_id && r.booking_id == review.booking_id
            });
        if duplicate {
            return Err(AppError::Conflict(ALREADY_REVIEWED.to_string()));
        }
        reviews.push(review.clone());
        Ok(())
    }

    async fn list_for_reviewee(&self, reviewee_id: &str) -> Result<Vec<ReviewModel>, AppError> {
        let reviews = self.reviews.lock().unwrap();
        let mut received: Vec<ReviewModel> = reviews
            .iter()
            .filter(|r| r.reviewee_id == reviewee_id)
            .cloned()
            .collect();
        received.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(received)
    }

    async fn rating_summary(&self, reviewee_id: &str) -> Result<RatingSummary, AppError> {
        let reviews = self.reviews.lock().unwrap();
        let ratings: Vec<i32> = reviews
            .iter()
            .filter(|r| r.reviewee_id == reviewee_id)
            .map(|r| r.rating)
            .collect();
        let count = ratings.len() as i64;
        let average = if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().sum::<i32>() as f64 / count as f64)
        };
        Ok(RatingSummary { average, count })
    }

    async fn detach_bookings(&self, booking_ids: &[String]) -> Result<u64, AppError> {
        let mut detached = 0;
        for review in self.reviews.lock().unwrap().iter_mut() {
            if review
                .booking_id
                .as_ref()
                .is_some_and(|id| booking_ids.contains(id))
            {
                review.booking_id = None;
                detached += 1;
            }
        }
        Ok(detached)
    }
}

/// PostgreSQL implementation of review repository
pub struct PostgresReviewRepository {
    pool: PgPool,
}

impl PostgresReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for PostgresReviewRepository {
    #[instrument(skip(self, review))]
    async fn create_review(&self, review: &ReviewModel) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO reviews (id, reviewer_id, reviewee_id, booking_id, rating, comment, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&review.id)
        .bind(&review.reviewer_id)
        .bind(&review.reviewee_id)
        .bind(&review.booking_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict(ALREADY_REVIEWED.to_string())
            }
            other => {
                warn!(error = %other, "Failed to store review in database");
                AppError::from(other)
            }
        })?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_for_reviewee(&self, reviewee_id: &str) -> Result<Vec<ReviewModel>, AppError> {
        let reviews = sqlx::query_as::<_, ReviewModel>(
            "SELECT id, reviewer_id, reviewee_id, booking_id, rating, comment, created_at \
             FROM reviews WHERE reviewee_id = $1 ORDER BY created_at DESC",
        )
        .bind(reviewee_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }

    async fn rating_summary(&self, reviewee_id: &str) -> Result<RatingSummary, AppError> {
        let summary = sqlx::query_as::<_, RatingSummary>(
            "SELECT AVG(rating)::float8 AS average, COUNT(*) AS count FROM reviews WHERE reviewee_id = $1",
        )
        .bind(reviewee_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(summary)
    }

    async fn detach_bookings(&self, booking_ids: &[String]) -> Result<u64, AppError> {
        let result = sqlx::query("UPDATE reviews SET booking_id = NULL WHERE booking_id = ANY($1)")
            .bind(booking_ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
