use serde::{Deserialize, Serialize};

use crate::models::chat::ChatView;
use crate::models::message::MessageWithSender;
use crate::models::notification::Notification;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    JoinChat { chat_id: String },
    LeaveChat { chat_id: String },
    SendMessage { chat_id: String, content: String },
    Heartbeat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    Connected { user_id: String },
    Joined { room: String },
    Left { room: String },
    ChatUpdated { chat: Box<ChatView> },
    NewMessage { message: MessageWithSender },
    NewNotification { notification: Notification },
    Error { message: String },
    Pong,
}

/// A server message addressed to every session in `room`.
#[derive(Debug, Clone)]
pub struct RoomEvent {
    pub room: String,
    pub message: ServerMessage,
}

pub fn chat_room(chat_id: &str) -> String {
    chat_id.to_string()
}

pub fn notification_room(user_id: &str) -> String {
    format!("notifications:{}", user_id)
}
