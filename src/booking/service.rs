use chrono::{FixedOffset, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    models::{BookingModel, BookingStatus},
    repository::BookingRepository,
    types::{BookingResponse, BookingSide, CreateBookingRequest, UpdateBookingRequest},
};
use crate::notification::{notify, templates, EmailSender};
use crate::shared::AppError;
use crate::space::repository::SpaceRepository;
use crate::store::repository::StoreRepository;
use crate::user::{repository::UserRepository, roles::UserRole, service::require_role};

const MAX_MESSAGE_CHARS: usize = 1000;
const JST_OFFSET_SECS: i32 = 9 * 3600;

/// Today's date in Japan, where every space is located
pub fn today_in_japan() -> NaiveDate {
    match FixedOffset::east_opt(JST_OFFSET_SECS) {
        Some(jst) => Utc::now().with_timezone(&jst).date_naive(),
        None => Utc::now().date_naive(),
    }
}

/// Service for booking requests between vendors and space owners
pub struct BookingService {
    repository: Arc<dyn BookingRepository + Send + Sync>,
    space_repository: Arc<dyn SpaceRepository + Send + Sync>,
    store_repository: Arc<dyn StoreRepository + Send + Sync>,
    user_repository: Arc<dyn UserRepository + Send + Sync>,
    email_sender: Arc<dyn EmailSender>,
    base_url: String,
}

impl BookingService {
    pub fn new(
        repository: Arc<dyn BookingRepository + Send + Sync>,
        space_repository: Arc<dyn SpaceRepository + Send + Sync>,
        store_repository: Arc<dyn StoreRepository + Send + Sync>,
        user_repository: Arc<dyn UserRepository + Send + Sync>,
        email_sender: Arc<dyn EmailSender>,
        base_url: String,
    ) -> Self {
        Self {
            repository,
            space_repository,
            store_repository,
            user_repository,
            email_sender,
            base_url,
        }
    }

    /// Creates a pending booking and notifies the space owner
    #[instrument(skip(self, request), fields(space_id = %request.space_id, date = %request.date))]
    pub async fn create_booking(
        &self,
        user_id: &str,
        request: CreateBookingRequest,
    ) -> Result<BookingModel, AppError> {
        let vendor = self
            .user_repository
            .get_user(user_id)
            .await?
            .ok_or_else(AppError::unauthenticated)?;
        require_role(&vendor, UserRole::Vendor)?;

        let space = self
            .space_repository
            .get_space(&request.space_id)
            .await?
            .ok_or_else(|| AppError::NotFound("スペースが見つかりません".to_string()))?;
        if !space.is_active {
            return Err(AppError::BadRequest(
                "このスペースは現在予約を受け付けていません".to_string(),
            ));
        }
        if space.is_owned_by(user_id) {
            return Err(AppError::BadRequest(
                "自分のスペースは予約できません".to_string(),
            ));
        }
        if request.date < today_in_japan() {
            return Err(AppError::BadRequest(
                "過去の日付は予約できません".to_string(),
            ));
        }

        if let Some(store_id) = &request.store_id {
            let store = self
                .store_repository
                .get_store(store_id)
                .await?
                .ok_or_else(|| AppError::NotFound("店舗が見つかりません".to_string()))?;
            if !store.is_owned_by(user_id) {
                warn!(store_id = %store_id, user_id = %user_id, "Booking with someone else's store");
                return Err(AppError::Forbidden(
                    "この店舗で予約する権限がありません".to_string(),
                ));
            }
        }

        let message = request
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        if message
            .as_ref()
            .is_some_and(|m| m.chars().count() > MAX_MESSAGE_CHARS)
        {
            return Err(AppError::BadRequest(format!(
                "メッセージは{MAX_MESSAGE_CHARS}文字以内で入力してください"
            )));
        }

        if self
            .repository
            .find_active_booking(&space.id, request.date)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "この日程は既に予約されています".to_string(),
            ));
        }

        let mut booking = BookingModel::new(&space.id, user_id, &space.owner_id, request.date);
        booking.store_id = request.store_id;
        booking.message = message;
        self.repository.create_booking(&booking).await?;
        info!(booking_id = %booking.id, vendor_id = %user_id, owner_id = %space.owner_id, "Booking requested");

        if let Some(owner) = self.user_repository.get_user(&space.owner_id).await? {
            notify(
                self.email_sender.as_ref(),
                templates::booking_requested(
                    &owner.email,
                    &owner.name,
                    &vendor.name,
                    &space.title,
                    booking.date,
                    &self.base_url,
                ),
            )
            .await;
        }

        Ok(booking)
    }

    #[instrument(skip(self))]
    pub async fn list_bookings(
        &self,
        user_id: &str,
        side: Option<BookingSide>,
    ) -> Result<Vec<BookingResponse>, AppError> {
        let bookings = match side {
            Some(BookingSide::Vendor) => self.repository.list_for_vendor(user_id).await?,
            Some(BookingSide::Owner) => self.repository.list_for_owner(user_id).await?,
            None => self.repository.list_for_user(user_id).await?,
        };

        let mut space_ids: Vec<String> = bookings.iter().map(|b| b.space_id.clone()).collect();
        space_ids.sort();
        space_ids.dedup();
        let titles: HashMap<String, String> = self
            .space_repository
            .get_spaces(&space_ids)
            .await?
            .into_iter()
            .map(|s| (s.id, s.title))
            .collect();

        Ok(bookings
            .into_iter()
            .map(|booking| BookingResponse {
                space_title: titles.get(&booking.space_id).cloned(),
                booking,
            })
            .collect())
    }

    /// Loads a booking the caller takes part in: 404 when missing, 403 otherwise
    pub async fn get_booking(
        &self,
        booking_id: &str,
        user_id: &str,
    ) -> Result<BookingResponse, AppError> {
        let booking = self.require_participant(booking_id, user_id).await?;
        let space_title = self
            .space_repository
            .get_space(&booking.space_id)
            .await?
            .map(|s| s.title);
        Ok(BookingResponse {
            booking,
            space_title,
        })
    }

    async fn require_participant(
        &self,
        booking_id: &str,
        user_id: &str,
    ) -> Result<BookingModel, AppError> {
        let booking = self
            .repository
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("予約が見つかりません".to_string()))?;
        if !booking.is_participant(user_id) {
            warn!(booking_id = %booking_id, user_id = %user_id, "Booking access by non-participant");
            return Err(AppError::Forbidden(
                "この予約を閲覧する権限がありません".to_string(),
            ));
        }
        Ok(booking)
    }

    /// Changes a booking's status. The vendor may only cancel; the space owner
    /// may set any status. The other party is notified.
    #[instrument(skip(self, request), fields(status = %request.status))]
    pub async fn update_status(
        &self,
        booking_id: &str,
        user_id: &str,
        request: UpdateBookingRequest,
    ) -> Result<BookingModel, AppError> {
        let mut booking = self
            .repository
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("予約が見つかりません".to_string()))?;

        let acting_as_owner = booking.owner_id == user_id;
        let acting_as_vendor = booking.vendor_id == user_id;
        if !acting_as_owner && !acting_as_vendor {
            return Err(AppError::Forbidden(
                "この予約を変更する権限がありません".to_string(),
            ));
        }
        if !acting_as_owner && request.status != BookingStatus::Cancelled {
            return Err(AppError::Forbidden(
                "出店者は予約のキャンセルのみ行えます".to_string(),
            ));
        }

        booking.set_status(request.status);
        self.repository.update_booking(&booking).await?;
        info!(booking_id = %booking_id, status = %booking.status, "Booking status updated");

        let recipient_id = if acting_as_owner {
            &booking.vendor_id
        } else {
            &booking.owner_id
        };
        self.notify_status_change(&booking, recipient_id).await?;

        Ok(booking)
    }

    async fn notify_status_change(
        &self,
        booking: &BookingModel,
        recipient_id: &str,
    ) -> Result<(), AppError> {
        let Some(recipient) = self.user_repository.get_user(recipient_id).await? else {
            return Ok(());
        };
        let space_title = self
            .space_repository
            .get_space(&booking.space_id)
            .await?
            .map(|s| s.title)
            .unwrap_or_default();

        notify(
            self.email_sender.as_ref(),
            templates::booking_status_changed(
                &recipient.email,
                &recipient.name,
                &space_title,
                booking.date,
                booking.status().label(),
                &self.base_url,
            ),
        )
        .await;
        Ok(())
    }
}
