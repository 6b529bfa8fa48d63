use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::models::{BookingModel, BookingStatus};

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub space_id: String,
    pub store_id: Option<String>,
    pub date: NaiveDate,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookingRequest {
    pub status: BookingStatus,
}

/// Which side of the booking the caller is asking about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingSide {
    Vendor,
    Owner,
}

/// Query string for GET /api/bookings
#[derive(Debug, Default, Deserialize)]
pub struct BookingQuery {
    #[serde(rename = "as")]
    pub side: Option<BookingSide>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingResponse {
    #[serde(flatten)]
    pub booking: BookingModel,
    pub space_title: Option<String>,
}
