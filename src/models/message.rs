use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::helpers::{new_id, now_timestamp};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MessageWithSender {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub message: Message,
    pub sender_username: String,
}

impl Message {
    pub fn new(chat_id: String, sender_id: String, content: String) -> Self {
        Self {
            id: new_id(),
            chat_id,
            sender_id,
            content,
            created_at: now_timestamp(),
        }
    }
}
