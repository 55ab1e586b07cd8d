use crate::database::DbPool;
use crate::middleware::auth::AuthUser;
use crate::models::user::AdminUserRow;
use crate::services::catalog::Page;
use crate::utils::error::{AppError, AppResult};

/// Bans or unbans a user. Banned users fail identity resolution on their next
/// request; their chats and listings are kept for the record.
pub async fn set_banned(
    pool: &DbPool,
    requester: &AuthUser,
    target_id: &str,
    banned: bool,
) -> AppResult<AdminUserRow> {
    requester.require_admin()?;

    if banned && target_id == requester.id {
        return Err(AppError::BadRequest("Cannot ban yourself".to_string()));
    }

    let result = sqlx::query("UPDATE users SET is_banned = ? WHERE id = ?")
        .bind(banned)
        .bind(target_id)
        .execute(pool.as_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!(target_id, admin_id = %requester.id, banned, "Updated user ban status");

    let row = sqlx::query_as::<_, AdminUserRow>(
        "SELECT id, username, role, is_banned, created_at FROM users WHERE id = ?",
    )
    .bind(target_id)
    .fetch_one(pool.as_ref())
    .await?;

    Ok(row)
}

pub async fn list_users(
    pool: &DbPool,
    requester: &AuthUser,
    search: Option<&str>,
    page: Page,
) -> AppResult<(Vec<AdminUserRow>, i64)> {
    requester.require_admin()?;

    let pattern = format!("%{}%", search.unwrap_or_default().trim());

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username LIKE ?")
        .bind(&pattern)
        .fetch_one(pool.as_ref())
        .await?;

    let users = sqlx::query_as::<_, AdminUserRow>(
        "SELECT id, username, role, is_banned, created_at FROM users
         WHERE username LIKE ?
         ORDER BY created_at DESC LIMIT ? OFFSET ?",
    )
    .bind(&pattern)
    .bind(page.limit)
    .bind(page.offset)
    .fetch_all(pool.as_ref())
    .await?;

    Ok((users, total))
}
