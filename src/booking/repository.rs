use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::BookingModel;
use crate::shared::AppError;

const DATE_TAKEN: &str = "この日程は既に予約されています";

/// Trait for booking repository operations
#[async_trait]
pub trait BookingRepository {
    /// Inserts a booking. Conflict when another pending or confirmed booking
    /// already holds the same space and date.
    async fn create_booking(&self, booking: &BookingModel) -> Result<(), AppError>;
    async fn get_booking(&self, booking_id: &str) -> Result<Option<BookingModel>, AppError>;
    async fn find_active_booking(
        &self,
        space_id: &str,
        date: NaiveDate,
    ) -> Result<Option<BookingModel>, AppError>;
    async fn list_for_vendor(&self, vendor_id: &str) -> Result<Vec<BookingModel>, AppError>;
    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<BookingModel>, AppError>;
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<BookingModel>, AppError>;
    async fn update_booking(&self, booking: &BookingModel) -> Result<(), AppError>;
    async fn count_bookings(&self) -> Result<i64, AppError>;
    /// Removes every booking of a deleted space and returns their ids
    async fn delete_for_space(&self, space_id: &str) -> Result<Vec<String>, AppError>;
    /// Detaches a deleted store from its bookings
    async fn clear_store(&self, store_id: &str) -> Result<u64, AppError>;
}

/// In-memory implementation of BookingRepository for development and testing
pub struct InMemoryBookingRepository {
    bookings: Mutex<HashMap<String, BookingModel>>,
}

impl Default for InMemoryBookingRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self {
            bookings: Mutex::new(HashMap::new()),
        }
    }

    fn collect_sorted<F>(&self, predicate: F) -> Vec<BookingModel>
    where
        F: Fn(&BookingModel) -> bool,
    {
        let bookings = self.bookings.lock().unwrap();
        let mut matching: Vec<BookingModel> =
            bookings.values().filter(|b| predicate(b)).cloned().collect();
        matching.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        matching
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    #[instrument(skip(self, booking))]
    async fn create_booking(&self, booking: &BookingModel) -> Result<(), AppError> {
        debug!(booking_id = %booking.id, space_id = %booking.space_id, date = %booking.date, "Creating booking in memory");

        let mut bookings = self.bookings.lock().unwrap();
        let taken = bookings.values().any(|b| {
            b.space_id == booking.space_id && b.date == booking.date && b.status().holds_date()
        });
        if taken && booking.status().holds_date() {
            warn!(space_id = %booking.space_id, date = %booking.date, "Space already booked for date");
            return Err(AppError::Conflict(DATE_TAKEN.to_string()));
        }
        bookings.insert(booking.id.clone(), booking.clone());
        Ok(())
    }

    async fn get_booking(&self, booking_id: &str) -> Result<Option<BookingModel>, AppError> {
        Ok(self.bookings.lock().unwrap().get(booking_id).cloned())
    }

    async fn find_active_booking(
        &self,
        space_id: &str,
        date: NaiveDate,
    ) -> Result<Option<BookingModel>, AppError> {
        let bookings = self.bookings.lock().unwrap();
        Ok(bookings
            .values()
            .find(|b| b.space_id == space_id && b.date == date && b.status().holds_date())
            .cloned())
    }

    async fn list_for_vendor(&self, vendor_id: &str) -> Result<Vec<BookingModel>, AppError> {
        Ok(self.collect_sorted(|b| b.vendor_id == vendor_id))
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<BookingModel>, AppError> {
        Ok(self.collect_sorted(|b| b.owner_id == owner_id))
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<BookingModel>, AppError> {
        Ok(self.collect_sorted(|b| b.is_participant(user_id)))
    }

    #[instrument(skip(self, booking))]
    async fn update_booking(&self, booking: &BookingModel) -> Result<(), AppError> {
        let mut bookings = self.bookings.lock().unwrap();
        if !bookings.contains_key(&booking.id) {
            return Err(AppError::NotFound("予約が見つかりません".to_string()));
        }
        if booking.status().holds_date() {
            let clash = bookings.values().any(|b| {
                b.id != booking.id
                    && b.space_id == booking.space_id
                    && b.date == booking.date
                    && b.status().holds_date()
            });
            if clash {
                return Err(AppError::Conflict(DATE_TAKEN.to_string()));
            }
        }
        bookings.insert(booking.id.clone(), booking.clone());
        Ok(())
    }

    async fn count_bookings(&self) -> Result<i64, AppError> {
        Ok(self.bookings.lock().unwrap().len() as i64)
    }

    #[instrument(skip(self))]
    async fn delete_for_space(&self, space_id: &str) -> Result<Vec<String>, AppError> {
        let mut bookings = self.bookings.lock().unwrap();
        let removed: Vec<String> = bookings
            .values()
            .filter(|b| b.space_id == space_id)
            .map(|b| b.id.clone())
            .collect();
        for id in &removed {
            bookings.remove(id);
        }
        debug!(space_id = %space_id, count = removed.len(), "Removed bookings of deleted space");
        Ok(removed)
    }

    async fn clear_store(&self, store_id: &str) -> Result<u64, AppError> {
        let mut cleared = 0;
        for booking in self.bookings.lock().unwrap().values_mut() {
            if booking.store_id.as_deref() == Some(store_id) {
                booking.store_id = None;
                cleared += 1;
            }
        }
        Ok(cleared)
    }
}

/// PostgreSQL implementation of booking repository. The partial unique index
/// `bookings_active_date` guards one active booking per space and date.
pub struct PostgresBookingRepository {
    pool: PgPool,
}

impl PostgresBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list_where(&self, clause: &str, user_id: &str) -> Result<Vec<BookingModel>, AppError> {
        let bookings = sqlx::query_as::<_, BookingModel>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE {clause} ORDER BY date DESC, created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(bookings)
    }
}

const BOOKING_COLUMNS: &str =
    "id, space_id, vendor_id, owner_id, store_id, date, status, message, created_at, updated_at";

fn map_write_error(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            AppError::Conflict(DATE_TAKEN.to_string())
        }
        other => {
            warn!(error = %other, "Failed to write booking to database");
            AppError::from(other)
        }
    }
}

#[async_trait]
impl BookingRepository for PostgresBookingRepository {
    #[instrument(skip(self, booking))]
    async fn create_booking(&self, booking: &BookingModel) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO bookings (id, space_id, vendor_id, owner_id, store_id, date, status, message, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(&booking.id)
        .bind(&booking.space_id)
        .bind(&booking.vendor_id)
        .bind(&booking.owner_id)
        .bind(&booking.store_id)
        .bind(booking.date)
        .bind(&booking.status)
        .bind(&booking.message)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_booking(&self, booking_id: &str) -> Result<Option<BookingModel>, AppError> {
        let booking = sqlx::query_as::<_, BookingModel>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn find_active_booking(
        &self,
        space_id: &str,
        date: NaiveDate,
    ) -> Result<Option<BookingModel>, AppError> {
        let booking = sqlx::query_as::<_, BookingModel>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             WHERE space_id = $1 AND date = $2 AND status IN ('pending', 'confirmed') LIMIT 1"
        ))
        .bind(space_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(booking)
    }

    async fn list_for_vendor(&self, vendor_id: &str) -> Result<Vec<BookingModel>, AppError> {
        self.list_where("vendor_id = $1", vendor_id).await
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<BookingModel>, AppError> {
        self.list_where("owner_id = $1", owner_id).await
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<BookingModel>, AppError> {
        self.list_where("vendor_id = $1 OR owner_id = $1", user_id)
            .await
    }

    #[instrument(skip(self, booking))]
    async fn update_booking(&self, booking: &BookingModel) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE bookings SET status = $2, message = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(&booking.id)
        .bind(&booking.status)
        .bind(&booking.message)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("予約が見つかりません".to_string()));
        }
        Ok(())
    }

    async fn count_bookings(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn delete_for_space(&self, space_id: &str) -> Result<Vec<String>, AppError> {
        let removed: Vec<String> =
            sqlx::query_scalar("DELETE FROM bookings WHERE space_id = $1 RETURNING id")
                .bind(space_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(removed)
    }

    async fn clear_store(&self, store_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("UPDATE bookings SET store_id = NULL WHERE store_id = $1")
            .bind(store_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
