use crate::database::DbPool;
use crate::models::notification::{Notification, NotificationKind};
use crate::utils::error::{AppError, AppResult};
use crate::websocket::events::{ServerMessage, notification_room};
use crate::websocket::publisher::Broadcaster;

pub async fn notify(
    pool: &DbPool,
    events: &Broadcaster,
    user_id: &str,
    kind: NotificationKind,
    message: String,
    chat_id: Option<String>,
) -> AppResult<Notification> {
    let notification = Notification::new(user_id.to_string(), kind, message, chat_id);

    sqlx::query(
        "INSERT INTO notifications (id, user_id, kind, message, chat_id, is_read, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&notification.id)
    .bind(&notification.user_id)
    .bind(&notification.kind)
    .bind(&notification.message)
    .bind(&notification.chat_id)
    .bind(notification.is_read)
    .bind(&notification.created_at)
    .execute(pool.as_ref())
    .await?;

    events.emit(
        &notification_room(user_id),
        ServerMessage::NewNotification {
            notification: notification.clone(),
        },
    );

    Ok(notification)
}

/// Notifications follow an already committed change, so a failure here is
/// logged and never surfaced to the caller.
pub async fn notify_best_effort(
    pool: &DbPool,
    events: &Broadcaster,
    user_id: &str,
    kind: NotificationKind,
    message: String,
    chat_id: Option<String>,
) {
    if let Err(e) = notify(pool, events, user_id, kind, message, chat_id).await {
        tracing::warn!(user_id, kind = kind.as_str(), "Failed to store notification: {}", e);
    }
}

pub async fn list_notifications(
    pool: &DbPool,
    user_id: &str,
    unread_only: bool,
) -> AppResult<Vec<Notification>> {
    let notifications = sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications
         WHERE user_id = ? AND (? = 0 OR is_read = 0)
         ORDER BY created_at DESC LIMIT 100",
    )
    .bind(user_id)
    .bind(unread_only)
    .fetch_all(pool.as_ref())
    .await?;

    Ok(notifications)
}

pub async fn mark_read(
    pool: &DbPool,
    user_id: &str,
    notification_id: &str,
) -> AppResult<Notification> {
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
        .bind(notification_id)
        .bind(user_id)
        .execute(pool.as_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }

    let notification = sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = ?")
        .bind(notification_id)
        .fetch_one(pool.as_ref())
        .await?;

    Ok(notification)
}
