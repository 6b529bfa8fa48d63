use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    /// Pending and confirmed bookings hold the space for their date
    pub fn holds_date(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    /// Label used in notification emails
    pub fn label(self) -> &'static str {
        match self {
            BookingStatus::Pending => "承認待ち",
            BookingStatus::Confirmed => "確定",
            BookingStatus::Cancelled => "キャンセル",
            BookingStatus::Completed => "完了",
        }
    }
}

/// Database model for bookings table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct BookingModel {
    pub id: String,
    pub space_id: String,
    pub vendor_id: String,
    pub owner_id: String, // Copied from the space at booking time
    pub store_id: Option<String>,
    pub date: NaiveDate,
    pub status: String, // BookingStatus in lowercase
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingModel {
    pub fn new(space_id: &str, vendor_id: &str, owner_id: &str, date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            space_id: space_id.to_string(),
            vendor_id: vendor_id.to_string(),
            owner_id: owner_id.to_string(),
            store_id: None,
            date,
            status: BookingStatus::Pending.to_string(),
            message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Unknown stored values read as pending
    pub fn status(&self) -> BookingStatus {
        BookingStatus::from_str(&self.status).unwrap_or(BookingStatus::Pending)
    }

    pub fn set_status(&mut self, status: BookingStatus) {
        self.status = status.to_string();
        self.updated_at = Utc::now();
    }

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.vendor_id == user_id || self.owner_id == user_id
    }

    /// True when the booking is between exactly these two users, in either direction
    pub fn involves_pair(&self, a: &str, b: &str) -> bool {
        (self.vendor_id == a && self.owner_id == b) || (self.vendor_id == b && self.owner_id == a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("pending", BookingStatus::Pending)]
    #[case("confirmed", BookingStatus::Confirmed)]
    #[case("cancelled", BookingStatus::Cancelled)]
    #[case("completed", BookingStatus::Completed)]
    #[case("garbage", BookingStatus::Pending)]
    fn test_status_column(#[case] raw: &str, #[case] expected: BookingStatus) {
        let mut booking = BookingModel::new("s", "v", "o", NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
        booking.status = raw.to_string();
        assert_eq!(booking.status(), expected);
    }

    #[test]
    fn test_involves_pair_either_direction() {
        let booking = BookingModel::new("s", "v", "o", NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
        assert!(booking.involves_pair("v", "o"));
        assert!(booking.involves_pair("o", "v"));
        assert!(!booking.involves_pair("v", "x"));
    }
}
