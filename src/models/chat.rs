use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::listing::ListingView;
use crate::models::user::RatingSummary;
use crate::utils::helpers::{new_id, now_timestamp};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Chat {
    pub id: String,
    pub listing_id: String,
    /// Listing owner.
    pub participant1_id: String,
    /// Player who opened the chat.
    pub participant2_id: String,
    pub status: String,
    pub participant1_locked_in: bool,
    pub participant2_locked_in: bool,
    pub participant1_approved: bool,
    pub participant2_approved: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChatStatus {
    Active,
    Completed,
    Cancelled,
}

impl ChatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatStatus::Active => "ACTIVE",
            ChatStatus::Completed => "COMPLETED",
            ChatStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(ChatStatus::Active),
            "COMPLETED" => Some(ChatStatus::Completed),
            "CANCELLED" => Some(ChatStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChatStatus::Active)
    }
}

/// Which half of the bilateral flags a participant owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantSlot {
    First,
    Second,
}

impl ParticipantSlot {
    pub fn lock_in_column(&self) -> &'static str {
        match self {
            ParticipantSlot::First => "participant1_locked_in",
            ParticipantSlot::Second => "participant2_locked_in",
        }
    }

    pub fn approval_column(&self) -> &'static str {
        match self {
            ParticipantSlot::First => "participant1_approved",
            ParticipantSlot::Second => "participant2_approved",
        }
    }
}

impl Chat {
    pub fn new(listing_id: String, owner_id: String, initiator_id: String) -> Self {
        let now = now_timestamp();
        Self {
            id: new_id(),
            listing_id,
            participant1_id: owner_id,
            participant2_id: initiator_id,
            status: ChatStatus::Active.as_str().to_string(),
            participant1_locked_in: false,
            participant2_locked_in: false,
            participant1_approved: false,
            participant2_approved: false,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Unknown values are treated as cancelled so nothing can mutate a corrupt row.
    pub fn status(&self) -> ChatStatus {
        ChatStatus::parse(&self.status).unwrap_or(ChatStatus::Cancelled)
    }

    pub fn slot_of(&self, user_id: &str) -> Option<ParticipantSlot> {
        if self.participant1_id == user_id {
            Some(ParticipantSlot::First)
        } else if self.participant2_id == user_id {
            Some(ParticipantSlot::Second)
        } else {
            None
        }
    }

    pub fn counterpart_of(&self, slot: ParticipantSlot) -> &str {
        match slot {
            ParticipantSlot::First => &self.participant2_id,
            ParticipantSlot::Second => &self.participant1_id,
        }
    }

    pub fn both_locked_in(&self) -> bool {
        self.participant1_locked_in && self.participant2_locked_in
    }

    pub fn both_approved(&self) -> bool {
        self.participant1_approved && self.participant2_approved
    }
}

/// Participant row as loaded for a chat view, before redaction.
#[derive(Debug, Clone, FromRow)]
pub struct ParticipantRecord {
    pub id: String,
    pub username: String,
    pub embark_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantView {
    pub id: String,
    pub username: String,
    /// Embark ID, only present once both sides have locked in.
    pub contact: Option<String>,
    pub rating: RatingSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatView {
    pub id: String,
    pub status: ChatStatus,
    pub listing: ListingView,
    pub participant1: ParticipantView,
    pub participant2: ParticipantView,
    pub participant1_locked_in: bool,
    pub participant2_locked_in: bool,
    pub both_locked_in: bool,
    pub participant1_approved: bool,
    pub participant2_approved: bool,
    pub both_approved: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl ChatView {
    /// Assembles the read model. Contact handles are revealed for both
    /// participants at once, and only when both lock-in flags are set.
    pub fn assemble(
        chat: &Chat,
        listing: ListingView,
        participants: [(ParticipantRecord, RatingSummary); 2],
    ) -> Self {
        let reveal = chat.both_locked_in();
        let [first, second] = participants.map(|(record, rating)| ParticipantView {
            id: record.id,
            username: record.username,
            contact: if reveal { record.embark_id } else { None },
            rating,
        });

        Self {
            id: chat.id.clone(),
            status: chat.status(),
            listing,
            participant1: first,
            participant2: second,
            participant1_locked_in: chat.participant1_locked_in,
            participant2_locked_in: chat.participant2_locked_in,
            both_locked_in: reveal,
            participant1_approved: chat.participant1_approved,
            participant2_approved: chat.participant2_approved,
            both_approved: chat.both_approved(),
            created_at: chat.created_at.clone(),
            updated_at: chat.updated_at.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInOutcome {
    pub participant1_locked_in: bool,
    pub participant2_locked_in: bool,
    pub both_locked_in: bool,
    pub participant1: ParticipantView,
    pub participant2: ParticipantView,
}

impl From<ChatView> for LockInOutcome {
    fn from(view: ChatView) -> Self {
        Self {
            participant1_locked_in: view.participant1_locked_in,
            participant2_locked_in: view.participant2_locked_in,
            both_locked_in: view.both_locked_in,
            participant1: view.participant1,
            participant2: view.participant2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalOutcome {
    pub participant1_approved: bool,
    pub participant2_approved: bool,
    pub both_approved: bool,
    pub status: ChatStatus,
}

impl From<&Chat> for ApprovalOutcome {
    fn from(chat: &Chat) -> Self {
        Self {
            participant1_approved: chat.participant1_approved,
            participant2_approved: chat.participant2_approved,
            both_approved: chat.both_approved(),
            status: chat.status(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveOutcome {
    pub status: ChatStatus,
}
