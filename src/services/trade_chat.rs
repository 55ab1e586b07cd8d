//! Trade-chat negotiation: the lifecycle of one chat between a listing owner
//! and an interested player.
//!
//! Every operation runs the same participant guard, writes a single column (or
//! a guarded status transition) so concurrent actions of the two participants
//! never clobber each other, and publishes to the chat room only after the
//! write has committed.

use crate::database::DbPool;
use crate::middleware::auth::AuthUser;
use crate::models::chat::{
    ApprovalOutcome, Chat, ChatStatus, ChatView, LeaveOutcome, LockInOutcome, ParticipantRecord,
    ParticipantSlot,
};
use crate::models::message::{Message, MessageWithSender};
use crate::models::notification::NotificationKind;
use crate::models::trade::Trade;
use crate::services::listing::{find_listing, get_listing};
use crate::services::notification::notify_best_effort;
use crate::services::user::rating_summary;
use crate::utils::error::{AppError, AppResult};
use crate::utils::helpers::now_timestamp;
use crate::utils::validation::validate_message_content;
use crate::websocket::events::{ServerMessage, chat_room};
use crate::websocket::publisher::Broadcaster;

#[derive(Clone)]
pub struct TradeChatService {
    db: DbPool,
    events: Broadcaster,
}

/// A chat the caller may act on, and which half of it they own.
struct Participation {
    chat: Chat,
    slot: ParticipantSlot,
}

impl TradeChatService {
    pub fn new(db: DbPool, events: Broadcaster) -> Self {
        Self { db, events }
    }

    async fn load_chat(&self, chat_id: &str) -> AppResult<Option<Chat>> {
        let chat = sqlx::query_as::<_, Chat>("SELECT * FROM chats WHERE id = ?")
            .bind(chat_id)
            .fetch_optional(self.db.as_ref())
            .await?;
        Ok(chat)
    }

    async fn reload(&self, chat_id: &str) -> AppResult<Chat> {
        self.load_chat(chat_id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Chat {} vanished after update", chat_id)))
    }

    /// Identity, existence and membership checks shared by every chat operation.
    async fn authorize(
        &self,
        chat_id: &str,
        principal: Option<&AuthUser>,
    ) -> AppResult<(AuthUser, Participation)> {
        let user = principal
            .cloned()
            .ok_or_else(|| AppError::Auth("Sign in to access trade chats".to_string()))?;

        let chat = self
            .load_chat(chat_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Chat not found".to_string()))?;

        let slot = chat.slot_of(&user.id).ok_or_else(|| {
            AppError::Forbidden("You are not a participant in this chat".to_string())
        })?;

        Ok((user, Participation { chat, slot }))
    }

    fn require_active(chat: &Chat) -> AppResult<()> {
        let status = chat.status();
        if !status.is_terminal() {
            return Ok(());
        }

        match status {
            ChatStatus::Completed => Err(AppError::InvalidState(
                "This trade has already been completed".to_string(),
            )),
            _ => Err(AppError::InvalidState(
                "This trade chat has been cancelled".to_string(),
            )),
        }
    }

    async fn participant(&self, user_id: &str) -> AppResult<ParticipantRecord> {
        let record = sqlx::query_as::<_, ParticipantRecord>(
            "SELECT id, username, embark_id FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_one(self.db.as_ref())
        .await?;
        Ok(record)
    }

    /// Builds the redacted read model for a chat.
    pub async fn view(&self, chat: &Chat) -> AppResult<ChatView> {
        let listing = get_listing(&self.db, &chat.listing_id).await?;
        let first = self.participant(&chat.participant1_id).await?;
        let second = self.participant(&chat.participant2_id).await?;
        let first_rating = rating_summary(&self.db, &first.id).await?;
        let second_rating = rating_summary(&self.db, &second.id).await?;

        Ok(ChatView::assemble(
            chat,
            listing,
            [(first, first_rating), (second, second_rating)],
        ))
    }

    /// Pushes the current view to the chat room. A failure to build the view is
    /// logged; the mutation that triggered it has already been committed.
    async fn publish_chat(&self, chat: &Chat) -> Option<ChatView> {
        match self.view(chat).await {
            Ok(view) => {
                self.events.emit(
                    &chat_room(&chat.id),
                    ServerMessage::ChatUpdated {
                        chat: Box::new(view.clone()),
                    },
                );
                Some(view)
            }
            Err(e) => {
                tracing::warn!(chat_id = %chat.id, "Failed to build chat update: {}", e);
                None
            }
        }
    }

    async fn find_active(
        &self,
        listing_id: &str,
        owner_id: &str,
        initiator_id: &str,
    ) -> AppResult<Option<Chat>> {
        let chat = sqlx::query_as::<_, Chat>(
            "SELECT * FROM chats
             WHERE listing_id = ? AND participant1_id = ? AND participant2_id = ? AND status = ?",
        )
        .bind(listing_id)
        .bind(owner_id)
        .bind(initiator_id)
        .bind(ChatStatus::Active.as_str())
        .fetch_optional(self.db.as_ref())
        .await?;
        Ok(chat)
    }

    /// Returns the caller's active chat on the listing, opening one if needed.
    /// The boolean is true when a new chat was created.
    pub async fn find_or_create_chat(
        &self,
        principal: Option<&AuthUser>,
        listing_id: &str,
    ) -> AppResult<(Chat, bool)> {
        let user = principal
            .ok_or_else(|| AppError::Auth("Sign in to contact traders".to_string()))?;

        let listing = find_listing(&self.db, listing_id).await?;

        if listing.owner_id == user.id {
            return Err(AppError::Validation(
                "You cannot open a trade chat on your own listing".to_string(),
            ));
        }

        if let Some(chat) = self.find_active(&listing.id, &listing.owner_id, &user.id).await? {
            return Ok((chat, false));
        }

        if !listing.is_active() {
            return Err(AppError::InvalidState(
                "This listing is no longer accepting offers".to_string(),
            ));
        }

        let chat = Chat::new(listing.id.clone(), listing.owner_id.clone(), user.id.clone());

        // The partial unique index turns a concurrent duplicate into a no-op.
        let inserted = sqlx::query(
            "INSERT INTO chats (id, listing_id, participant1_id, participant2_id, status,
                participant1_locked_in, participant2_locked_in, participant1_approved, participant2_approved,
                created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, 0, 0, 0, 0, ?, ?)
             ON CONFLICT DO NOTHING",
        )
        .bind(&chat.id)
        .bind(&chat.listing_id)
        .bind(&chat.participant1_id)
        .bind(&chat.participant2_id)
        .bind(&chat.status)
        .bind(&chat.created_at)
        .bind(&chat.updated_at)
        .execute(self.db.as_ref())
        .await?
        .rows_affected();

        if inserted == 0 {
            let existing = self
                .find_active(&listing.id, &listing.owner_id, &user.id)
                .await?
                .ok_or_else(|| AppError::Internal("Concurrent chat creation lost".to_string()))?;
            return Ok((existing, false));
        }

        tracing::info!(chat_id = %chat.id, listing_id = %listing.id, initiator = %user.id, "Opened trade chat");

        notify_best_effort(
            &self.db,
            &self.events,
            &listing.owner_id,
            NotificationKind::ChatStarted,
            format!("{} wants to trade for your listing", user.username),
            Some(chat.id.clone()),
        )
        .await;

        Ok((chat, true))
    }

    /// Whether the user takes part in an ACTIVE chat on the listing, on either side.
    pub async fn has_active_chat(&self, user_id: &str, listing_id: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM chats
                WHERE listing_id = ? AND status = ? AND (participant1_id = ? OR participant2_id = ?)
             )",
        )
        .bind(listing_id)
        .bind(ChatStatus::Active.as_str())
        .bind(user_id)
        .bind(user_id)
        .fetch_one(self.db.as_ref())
        .await?;

        Ok(exists)
    }

    pub async fn get_chat(&self, chat_id: &str, principal: Option<&AuthUser>) -> AppResult<ChatView> {
        let (_, participation) = self.authorize(chat_id, principal).await?;
        self.view(&participation.chat).await
    }

    /// The caller's chats, most recently active first.
    pub async fn list_chats(&self, principal: Option<&AuthUser>) -> AppResult<Vec<ChatView>> {
        let user = principal.ok_or_else(|| AppError::Auth("Sign in to see your chats".to_string()))?;

        let chats = sqlx::query_as::<_, Chat>(
            "SELECT * FROM chats
             WHERE participant1_id = ? OR participant2_id = ?
             ORDER BY updated_at DESC",
        )
        .bind(&user.id)
        .bind(&user.id)
        .fetch_all(self.db.as_ref())
        .await?;

        let mut views = Vec::with_capacity(chats.len());
        for chat in &chats {
            views.push(self.view(chat).await?);
        }
        Ok(views)
    }

    pub async fn lock_in(
        &self,
        chat_id: &str,
        principal: Option<&AuthUser>,
    ) -> AppResult<LockInOutcome> {
        let (user, Participation { chat, slot }) = self.authorize(chat_id, principal).await?;
        Self::require_active(&chat)?;

        let contact = self.participant(&user.id).await?.embark_id;
        if contact.is_none() {
            return Err(AppError::Validation(
                "Add your Embark ID to your profile before locking in".to_string(),
            ));
        }

        let query = format!(
            "UPDATE chats SET {} = 1, updated_at = ? WHERE id = ? AND status = ?",
            slot.lock_in_column()
        );
        let updated = sqlx::query(&query)
            .bind(now_timestamp())
            .bind(&chat.id)
            .bind(ChatStatus::Active.as_str())
            .execute(self.db.as_ref())
            .await?
            .rows_affected();

        let fresh = self.reload(&chat.id).await?;
        if updated == 0 {
            return Err(Self::require_active(&fresh)
                .err()
                .unwrap_or_else(|| AppError::Internal("Lock-in update had no effect".to_string())));
        }

        tracing::info!(chat_id = %fresh.id, user_id = %user.id, both = fresh.both_locked_in(), "Participant locked in");

        // The flag is already committed. If the view cannot be built here either,
        // the caller gets an error but a re-read of the chat shows the lock-in.
        let view = match self.publish_chat(&fresh).await {
            Some(view) => view,
            None => self.view(&fresh).await?,
        };

        Ok(LockInOutcome::from(view))
    }

    pub async fn approve(
        &self,
        chat_id: &str,
        principal: Option<&AuthUser>,
    ) -> AppResult<ApprovalOutcome> {
        let (user, Participation { chat, slot }) = self.authorize(chat_id, principal).await?;
        Self::require_active(&chat)?;

        let now = now_timestamp();
        let mut tx = self.db.begin().await?;

        let query = format!(
            "UPDATE chats SET {} = 1, updated_at = ? WHERE id = ? AND status = ?",
            slot.approval_column()
        );
        let approved = sqlx::query(&query)
            .bind(&now)
            .bind(&chat.id)
            .bind(ChatStatus::Active.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if approved == 0 {
            tx.rollback().await?;
            let fresh = self.reload(&chat.id).await?;
            return Err(Self::require_active(&fresh)
                .err()
                .unwrap_or_else(|| AppError::Internal("Approval update had no effect".to_string())));
        }

        // Decided against the row as it is now, not against what this request read earlier,
        // so whichever approval lands second performs the transition exactly once.
        let completed = sqlx::query(
            "UPDATE chats SET status = ?, updated_at = ?
             WHERE id = ? AND status = ? AND participant1_approved = 1 AND participant2_approved = 1",
        )
        .bind(ChatStatus::Completed.as_str())
        .bind(&now)
        .bind(&chat.id)
        .bind(ChatStatus::Active.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if completed {
            let trade = Trade::from_chat(&chat);
            sqlx::query(
                "INSERT INTO trades (id, chat_id, listing_id, seller_id, buyer_id, completed_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&trade.id)
            .bind(&trade.chat_id)
            .bind(&trade.listing_id)
            .bind(&trade.seller_id)
            .bind(&trade.buyer_id)
            .bind(&trade.completed_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let fresh = self.reload(&chat.id).await?;
        tracing::info!(chat_id = %fresh.id, user_id = %user.id, completed, "Participant approved trade");

        if completed {
            notify_best_effort(
                &self.db,
                &self.events,
                fresh.counterpart_of(slot),
                NotificationKind::TradeCompleted,
                format!("{} confirmed the trade, it is now complete", user.username),
                Some(fresh.id.clone()),
            )
            .await;
        }

        self.publish_chat(&fresh).await;

        Ok(ApprovalOutcome::from(&fresh))
    }

    /// Cancels an active chat without needing the counterpart's consent.
    /// Leaving an already cancelled chat is a no-op; a completed trade stays completed.
    pub async fn leave(
        &self,
        chat_id: &str,
        principal: Option<&AuthUser>,
    ) -> AppResult<LeaveOutcome> {
        let (user, Participation { chat, slot }) = self.authorize(chat_id, principal).await?;

        let cancelled = sqlx::query(
            "UPDATE chats SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(ChatStatus::Cancelled.as_str())
        .bind(now_timestamp())
        .bind(&chat.id)
        .bind(ChatStatus::Active.as_str())
        .execute(self.db.as_ref())
        .await?
        .rows_affected()
            == 1;

        let fresh = self.reload(&chat.id).await?;

        if !cancelled {
            return match fresh.status() {
                ChatStatus::Cancelled => Ok(LeaveOutcome {
                    status: ChatStatus::Cancelled,
                }),
                _ => Err(AppError::InvalidState(
                    "A completed trade cannot be cancelled".to_string(),
                )),
            };
        }

        tracing::info!(chat_id = %fresh.id, user_id = %user.id, "Participant left trade chat");

        notify_best_effort(
            &self.db,
            &self.events,
            fresh.counterpart_of(slot),
            NotificationKind::ChatCancelled,
            format!("{} left the trade chat", user.username),
            Some(fresh.id.clone()),
        )
        .await;

        self.publish_chat(&fresh).await;

        Ok(LeaveOutcome {
            status: fresh.status(),
        })
    }

    /// Appends a message. Used by both the HTTP endpoint and the websocket
    /// `send-message` frame so both produce the same row and the same event.
    pub async fn send_message(
        &self,
        chat_id: &str,
        principal: Option<&AuthUser>,
        content: &str,
    ) -> AppResult<MessageWithSender> {
        let (user, Participation { chat, .. }) = self.authorize(chat_id, principal).await?;
        let content = validate_message_content(content)?;

        let message = Message::new(chat.id.clone(), user.id.clone(), content.to_string());

        let mut tx = self.db.begin().await?;

        sqlx::query(
            "INSERT INTO messages (id, chat_id, sender_id, content, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&message.id)
        .bind(&message.chat_id)
        .bind(&message.sender_id)
        .bind(&message.content)
        .bind(&message.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE chats SET updated_at = ? WHERE id = ?")
            .bind(&message.created_at)
            .bind(&chat.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let message = MessageWithSender {
            message,
            sender_username: user.username,
        };

        self.events.emit(
            &chat_room(&chat.id),
            ServerMessage::NewMessage {
                message: message.clone(),
            },
        );

        Ok(message)
    }

    /// All messages of the chat, oldest first.
    pub async fn list_messages(
        &self,
        chat_id: &str,
        principal: Option<&AuthUser>,
    ) -> AppResult<Vec<MessageWithSender>> {
        let (_, participation) = self.authorize(chat_id, principal).await?;

        let messages = sqlx::query_as::<_, MessageWithSender>(
            "SELECT m.*, u.username AS sender_username
             FROM messages m
             JOIN users u ON m.sender_id = u.id
             WHERE m.chat_id = ?
             ORDER BY m.created_at ASC, m.rowid ASC",
        )
        .bind(&participation.chat.id)
        .fetch_all(self.db.as_ref())
        .await?;

        Ok(messages)
    }

    /// Room key a session may join to follow this chat. Participants only;
    /// the chat's status does not matter.
    pub async fn authorize_room(
        &self,
        chat_id: &str,
        principal: Option<&AuthUser>,
    ) -> AppResult<String> {
        let (_, participation) = self.authorize(chat_id, principal).await?;
        Ok(chat_room(&participation.chat.id))
    }
}
