use serde::{Deserialize, Serialize};

use super::models::MessageModel;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: String,
    pub content: String,
    pub booking_id: Option<String>,
}

/// The other user in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counterpart {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
}

/// One entry of the conversation list
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub user: Counterpart,
    pub last_message: MessageModel,
    pub unread_count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}
