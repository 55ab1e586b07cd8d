use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::chat::Chat;
use crate::utils::helpers::{new_id, now_timestamp};

/// Completed trade, written together with the chat's COMPLETED transition.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trade {
    pub id: String,
    pub chat_id: String,
    pub listing_id: String,
    pub seller_id: String,
    pub buyer_id: String,
    pub completed_at: String,
}

impl Trade {
    pub fn from_chat(chat: &Chat) -> Self {
        Self {
            id: new_id(),
            chat_id: chat.id.clone(),
            listing_id: chat.listing_id.clone(),
            seller_id: chat.participant1_id.clone(),
            buyer_id: chat.participant2_id.clone(),
            completed_at: now_timestamp(),
        }
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.seller_id == user_id || self.buyer_id == user_id
    }

    pub fn counterpart_of(&self, user_id: &str) -> Option<&str> {
        if self.seller_id == user_id {
            Some(&self.buyer_id)
        } else if self.buyer_id == user_id {
            Some(&self.seller_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Rating {
    pub id: String,
    pub trade_id: String,
    pub rater_id: String,
    pub ratee_id: String,
    pub score: i64,
    pub comment: Option<String>,
    pub created_at: String,
}

impl Rating {
    pub fn new(
        trade_id: String,
        rater_id: String,
        ratee_id: String,
        score: i64,
        comment: Option<String>,
    ) -> Self {
        Self {
            id: new_id(),
            trade_id,
            rater_id,
            ratee_id,
            score,
            comment,
            created_at: now_timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RatingWithRater {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub rating: Rating,
    pub rater_username: String,
}
