use serde::Deserialize;

use crate::database::DbPool;
use crate::middleware::auth::AuthUser;
use crate::models::notification::NotificationKind;
use crate::models::trade::{Rating, Trade};
use crate::services::notification::notify_best_effort;
use crate::utils::error::{AppError, AppResult, is_unique_violation};
use crate::utils::validation::{MAX_COMMENT_LENGTH, validate_score, validate_text_field};
use crate::websocket::publisher::Broadcaster;

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRatingRequest {
    pub score: i64,
    pub comment: Option<String>,
}

pub async fn list_user_trades(pool: &DbPool, user_id: &str) -> AppResult<Vec<Trade>> {
    let trades = sqlx::query_as::<_, Trade>(
        "SELECT * FROM trades WHERE seller_id = ? OR buyer_id = ? ORDER BY completed_at DESC",
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_all(pool.as_ref())
    .await?;

    Ok(trades)
}

/// A trade is visible to its two parties and to admins.
pub async fn get_trade(pool: &DbPool, requester: &AuthUser, trade_id: &str) -> AppResult<Trade> {
    let trade = sqlx::query_as::<_, Trade>("SELECT * FROM trades WHERE id = ?")
        .bind(trade_id)
        .fetch_optional(pool.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("Trade not found".to_string()))?;

    if !trade.involves(&requester.id) && !requester.is_admin() {
        return Err(AppError::Forbidden(
            "You were not part of this trade".to_string(),
        ));
    }

    Ok(trade)
}

pub async fn submit_rating(
    pool: &DbPool,
    events: &Broadcaster,
    rater: &AuthUser,
    trade_id: &str,
    request: SubmitRatingRequest,
) -> AppResult<Rating> {
    let trade = get_trade(pool, rater, trade_id).await?;
    let ratee_id = trade
        .counterpart_of(&rater.id)
        .ok_or_else(|| AppError::Forbidden("You were not part of this trade".to_string()))?
        .to_string();

    validate_score(request.score)?;
    let comment = request
        .comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if let Some(text) = &comment {
        validate_text_field("Comment", text, MAX_COMMENT_LENGTH)?;
    }

    let rating = Rating::new(
        trade.id.clone(),
        rater.id.clone(),
        ratee_id,
        request.score,
        comment,
    );

    sqlx::query(
        "INSERT INTO ratings (id, trade_id, rater_id, ratee_id, score, comment, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&rating.id)
    .bind(&rating.trade_id)
    .bind(&rating.rater_id)
    .bind(&rating.ratee_id)
    .bind(rating.score)
    .bind(&rating.comment)
    .bind(&rating.created_at)
    .execute(pool.as_ref())
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("You have already rated this trade".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    tracing::info!(trade_id = %trade.id, rater_id = %rater.id, score = rating.score, "Trade rated");

    notify_best_effort(
        pool,
        events,
        &rating.ratee_id,
        NotificationKind::RatingReceived,
        format!("{} rated your trade {}/5", rater.username, rating.score),
        Some(trade.chat_id.clone()),
    )
    .await;

    Ok(rating)
}
