pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;

pub use handlers::{add_favorite, list_favorites, remove_favorite};
pub use service::FavoriteService;
