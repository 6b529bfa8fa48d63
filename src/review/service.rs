use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    models::ReviewModel,
    repository::ReviewRepository,
    types::{CreateReviewRequest, ReviewResponse, UserReviewsResponse},
};
use crate::booking::{models::BookingStatus, repository::BookingRepository};
use crate::shared::AppError;
use crate::user::repository::UserRepository;

const MAX_COMMENT_CHARS: usize = 1000;

/// Rounds a mean rating to one decimal place
pub fn round_rating(average: f64) -> f64 {
    (average * 10.0).round() / 10.0
}

/// Service for reviews users leave each other
pub struct ReviewService {
    repository: Arc<dyn ReviewRepository + Send + Sync>,
    user_repository: Arc<dyn UserRepository + Send + Sync>,
    booking_repository: Arc<dyn BookingRepository + Send + Sync>,
}

impl ReviewService {
    pub fn new(
        repository: Arc<dyn ReviewRepository + Send + Sync>,
        user_repository: Arc<dyn UserRepository + Send + Sync>,
        booking_repository: Arc<dyn BookingRepository + Send + Sync>,
    ) -> Self {
        Self {
            repository,
            user_repository,
            booking_repository,
        }
    }

    #[instrument(skip(self, request), fields(reviewee_id = %request.reviewee_id, rating = request.rating))]
    pub async fn create_review(
        &self,
        reviewer_id: &str,
        request: CreateReviewRequest,
    ) -> Result<ReviewModel, AppError> {
        if request.reviewee_id == reviewer_id {
            return Err(AppError::BadRequest(
                "自分自身はレビューできません".to_string(),
            ));
        }
        if !(1..=5).contains(&request.rating) {
            return Err(AppError::BadRequest(
                "評価は1〜5で入力してください".to_string(),
            ));
        }
        let comment = request
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if comment
            .as_ref()
            .is_some_and(|c| c.chars().count() > MAX_COMMENT_CHARS)
        {
            return Err(AppError::BadRequest(format!(
                "コメントは{MAX_COMMENT_CHARS}文字以内で入力してください"
            )));
        }

        if self
            .user_repository
            .get_user(&request.reviewee_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound("ユーザーが見つかりません".to_string()));
        }

        if let Some(booking_id) = &request.booking_id {
            let booking = self
                .booking_repository
                .get_booking(booking_id)
                .await?
                .ok_or_else(|| AppError::NotFound("予約が見つかりません".to_string()))?;
            if !booking.involves_pair(reviewer_id, &request.reviewee_id) {
                warn!(booking_id = %booking_id, "Review references a booking between other users");
                return Err(AppError::Forbidden(
                    "この予約のレビューは投稿できません".to_string(),
                ));
            }
            if booking.status() != BookingStatus::Completed {
                return Err(AppError::BadRequest(
                    "完了した予約のみレビューできます".to_string(),
                ));
            }
        }

        let mut review = ReviewModel::new(reviewer_id, &request.reviewee_id, request.rating);
        review.booking_id = request.booking_id;
        review.comment = comment;
        self.repository.create_review(&review).await?;

        info!(review_id = %review.id, reviewer_id = %reviewer_id, "Review created");
        Ok(review)
    }

    #[instrument(skip(self))]
    pub async fn reviews_for_user(&self, user_id: &str) -> Result<UserReviewsResponse, AppError> {
        if self.user_repository.get_user(user_id).await?.is_none() {
            return Err(AppError::NotFound("ユーザーが見つかりません".to_string()));
        }

        let summary = self.repository.rating_summary(user_id).await?;
        let mut reviews = Vec::new();
        for review in self.repository.list_for_reviewee(user_id).await? {
            let reviewer_name = self
                .user_repository
                .get_user(&review.reviewer_id)
                .await?
                .map(|u| u.name);
            reviews.push(ReviewResponse {
                review,
                reviewer_name,
            });
        }

        Ok(UserReviewsResponse {
            reviews,
            average_rating: summary.average.map(round_rating),
            count: summary.count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{models::BookingModel, repository::InMemoryBookingRepository};
    use crate::review::repository::InMemoryReviewRepository;
    use crate::user::{models::UserModel, repository::InMemoryUserRepository};
    use chrono::NaiveDate;
    use rstest::rstest;

    struct Fixture {
        service: ReviewService,
        bookings: Arc<InMemoryBookingRepository>,
        vendor: UserModel,
        owner: UserModel,
    }

    fn fixture() -> Fixture {
        let vendor = UserModel::new("v@example.jp", "出店者".to_string(), &[]);
        let owner = UserModel::new("o@example.jp", "オーナー".to_string(), &[]);
        let bookings = Arc::new(InMemoryBookingRepository::new());
        let service = ReviewService::new(
            Arc::new(InMemoryReviewRepository::new()),
            Arc::new(InMemoryUserRepository::with_users(vec![
                vendor.clone(),
                owner.clone(),
            ])),
            bookings.clone(),
        );
        Fixture {
            service,
            bookings,
            vendor,
            owner,
        }
    }

    fn request(reviewee: &str, rating: i32, booking_id: Option<&str>) -> CreateReviewRequest {
        CreateReviewRequest {
            reviewee_id: reviewee.to_string(),
            rating,
            comment: Some("また利用したいです".to_string()),
            booking_id: booking_id.map(str::to_string),
        }
    }

    async fn booking(f: &Fixture, status: BookingStatus) -> BookingModel {
        let mut booking = BookingModel::new(
            "s",
            &f.vendor.id,
            &f.owner.id,
            NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
        );
        booking.set_status(status);
        f.bookings.create_booking(&booking).await.unwrap();
        booking
    }

    #[rstest]
    #[case(4.0, 4.0)]
    #[case(13.0 / 3.0, 4.3)]
    #[case(4.25, 4.3)]
    #[case(4.75, 4.8)]
    fn test_round_rating(#[case] average: f64, #[case] expected: f64) {
        assert!((round_rating(average) - expected).abs() < 1e-9);
    }

    #[rstest]
    #[case(0)]
    #[case(6)]
    #[tokio::test]
    async fn test_rating_out_of_range(#[case] rating: i32) {
        let f = fixture();
        let result = f
            .service
            .create_review(&f.vendor.id, request(&f.owner.id, rating, None))
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_cannot_review_self_or_missing_user() {
        let f = fixture();
        assert!(matches!(
            f.service
                .create_review(&f.vendor.id, request(&f.vendor.id, 5, None))
                .await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            f.service
                .create_review(&f.vendor.id, request("ghost", 5, None))
                .await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_booking_must_be_completed() {
        let f = fixture();
        let confirmed = booking(&f, BookingStatus::Confirmed).await;

        let result = f
            .service
            .create_review(&f.vendor.id, request(&f.owner.id, 5, Some(&confirmed.id)))
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_duplicate_review_for_booking() {
        let f = fixture();
        let completed = booking(&f, BookingStatus::Completed).await;

        f.service
            .create_review(&f.vendor.id, request(&f.owner.id, 5, Some(&completed.id)))
            .await
            .unwrap();
        let again = f
            .service
            .create_review(&f.vendor.id, request(&f.owner.id, 3, Some(&completed.id)))
            .await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_reviews_for_user_average() {
        let f = fixture();
        let empty = f.service.reviews_for_user(&f.owner.id).await.unwrap();
        assert_eq!(empty.count, 0);
        assert!(empty.average_rating.is_none());

        for rating in [5, 4, 4] {
            f.service
                .create_review(&f.vendor.id, request(&f.owner.id, rating, None))
                .await
                .unwrap();
        }
        let reviews = f.service.reviews_for_user(&f.owner.id).await.unwrap();
        assert_eq!(reviews.count, 3);
        assert_eq!(reviews.average_rating, Some(4.3));
        assert_eq!(reviews.reviews[0].reviewer_name.as_deref(), Some("出店者"));
    }
}
