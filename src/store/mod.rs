pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;

pub use handlers::{create_store, delete_store, get_store, list_my_stores, list_stores, update_store};
pub use models::StoreModel;
pub use service::StoreService;
