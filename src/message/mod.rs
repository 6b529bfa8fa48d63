pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;

pub use handlers::{get_thread, list_conversations, send_message, unread_count};
pub use models::MessageModel;
pub use service::MessageService;
