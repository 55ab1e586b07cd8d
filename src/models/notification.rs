use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::helpers::{new_id, now_timestamp};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub message: String,
    pub chat_id: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ChatStarted,
    TradeCompleted,
    ChatCancelled,
    RatingReceived,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ChatStarted => "chat_started",
            NotificationKind::TradeCompleted => "trade_completed",
            NotificationKind::ChatCancelled => "chat_cancelled",
            NotificationKind::RatingReceived => "rating_received",
        }
    }
}

impl Notification {
    pub fn new(
        user_id: String,
        kind: NotificationKind,
        message: String,
        chat_id: Option<String>,
    ) -> Self {
        Self {
            id: new_id(),
            user_id,
            kind: kind.as_str().to_string(),
            message,
            chat_id,
            is_read: false,
            created_at: now_timestamp(),
        }
    }
}
