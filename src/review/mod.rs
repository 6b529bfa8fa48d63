pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;

pub use handlers::{create_review, list_user_reviews};
pub use models::ReviewModel;
pub use service::{round_rating, ReviewService};
