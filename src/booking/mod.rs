pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;

pub use handlers::{create_booking, get_booking, list_bookings, update_booking};
pub use models::{BookingModel, BookingStatus};
pub use service::BookingService;
