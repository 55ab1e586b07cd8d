use crate::database::DbPool;
use crate::models::trade::RatingWithRater;
use crate::models::user::{PublicProfile, RatingSummary, User, UserResponse};
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::validate_embark_id;

async fn find_user(pool: &DbPool, user_id: &str) -> AppResult<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool.as_ref())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Average and count over every rating the user has ever received.
pub async fn rating_summary(pool: &DbPool, user_id: &str) -> AppResult<RatingSummary> {
    let summary = sqlx::query_as::<_, RatingSummary>(
        "SELECT AVG(score) AS average, COUNT(*) AS count FROM ratings WHERE ratee_id = ?",
    )
    .bind(user_id)
    .fetch_one(pool.as_ref())
    .await?;

    Ok(summary)
}

pub async fn get_account(pool: &DbPool, user_id: &str) -> AppResult<UserResponse> {
    Ok(UserResponse::from(find_user(pool, user_id).await?))
}

pub async fn get_public_profile(pool: &DbPool, user_id: &str) -> AppResult<PublicProfile> {
    let user = find_user(pool, user_id).await?;
    let rating = rating_summary(pool, &user.id).await?;

    Ok(PublicProfile {
        id: user.id,
        username: user.username,
        created_at: user.created_at,
        rating,
    })
}

/// Sets the contact handle revealed after a mutual lock-in. It can be changed
/// but not cleared, so a locked-in participant always has one.
pub async fn update_embark_id(
    pool: &DbPool,
    user_id: &str,
    embark_id: &str,
) -> AppResult<UserResponse> {
    let embark_id = embark_id.trim();
    validate_embark_id(embark_id)?;

    let result = sqlx::query("UPDATE users SET embark_id = ? WHERE id = ?")
        .bind(embark_id)
        .bind(user_id)
        .execute(pool.as_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    get_account(pool, user_id).await
}

pub async fn ratings_received(pool: &DbPool, user_id: &str) -> AppResult<Vec<RatingWithRater>> {
    find_user(pool, user_id).await?;

    let ratings = sqlx::query_as::<_, RatingWithRater>(
        "SELECT r.*, u.username AS rater_username
         FROM ratings r
         JOIN users u ON r.rater_id = u.id
         WHERE r.ratee_id = ?
         ORDER BY r.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool.as_ref())
    .await?;

    Ok(ratings)
}
