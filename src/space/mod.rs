pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;

pub use handlers::{create_space, delete_space, get_space, list_my_spaces, list_spaces, update_space};
pub use models::SpaceModel;
pub use service::SpaceService;
