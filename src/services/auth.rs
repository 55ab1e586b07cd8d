use crate::database::DbPool;
use crate::middleware::auth::AuthUser;
use crate::models::user::{User, UserResponse, UserRole};
use crate::utils::crypto::{hash_password, verify_password};
use crate::utils::error::{AppError, AppResult, is_unique_violation};
use crate::utils::jwt::JwtService;
use crate::utils::validation::{validate_embark_id, validate_password, validate_username};
use serde::{Deserialize, Serialize};
use sqlx::Row;

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub embark_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

pub async fn register_user(
    pool: &DbPool,
    request: RegisterRequest,
    jwt_service: &JwtService,
) -> AppResult<AuthResponse> {
    let username = request.username.trim().to_string();
    validate_username(&username)?;
    validate_password(&request.password)?;

    let embark_id = request
        .embark_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());
    if let Some(id) = &embark_id {
        validate_embark_id(id)?;
    }

    let username_exists =
        sqlx::query("SELECT COUNT(*) as count FROM users WHERE LOWER(username) = LOWER(?)")
            .bind(&username)
            .fetch_one(pool.as_ref())
            .await?
            .get::<i64, _>("count");

    if username_exists > 0 {
        return Err(AppError::Conflict("Username already exists".to_string()));
    }

    let password_hash = hash_password(&request.password)?;
    let mut user = User::new(username, password_hash, embark_id, UserRole::User);

    // The role is decided by the insert itself, so only the very first account becomes admin
    // even when registrations race on an empty database.
    let role: String = sqlx::query_scalar(
        "INSERT INTO users (id, username, password_hash, embark_id, role, is_banned, created_at)
         SELECT ?, ?, ?, ?, CASE WHEN EXISTS (SELECT 1 FROM users) THEN ? ELSE ? END, ?, ?
         RETURNING role",
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(&user.embark_id)
    .bind(UserRole::User.as_str())
    .bind(UserRole::Admin.as_str())
    .bind(user.is_banned)
    .bind(&user.created_at)
    .fetch_one(pool.as_ref())
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Username already exists".to_string())
        } else {
            AppError::Database(e)
        }
    })?;
    user.role = role;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "Registered user {}", user.username);

    let token = jwt_service.generate_token(&user.id, &user.username)?;

    Ok(AuthResponse {
        user: UserResponse::from(user),
        token,
    })
}

pub async fn login_user(
    pool: &DbPool,
    request: LoginRequest,
    jwt_service: &JwtService,
) -> AppResult<AuthResponse> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(username) = LOWER(?)")
        .bind(request.username.trim())
        .fetch_optional(pool.as_ref())
        .await?
        .ok_or_else(|| AppError::Auth("Invalid credentials".to_string()))?;

    if !verify_password(&request.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Rejected login with wrong password");
        return Err(AppError::Auth("Invalid credentials".to_string()));
    }

    if user.is_banned {
        return Err(AppError::Forbidden(
            "This account has been banned".to_string(),
        ));
    }

    let token = jwt_service.generate_token(&user.id, &user.username)?;

    Ok(AuthResponse {
        user: UserResponse::from(user),
        token,
    })
}

/// Resolves a bearer token to the calling principal.
///
/// Unknown or deleted users are unauthenticated; banned users are forbidden.
pub async fn resolve_principal(
    pool: &DbPool,
    jwt_service: &JwtService,
    token: &str,
) -> AppResult<AuthUser> {
    let user_id = jwt_service.extract_user_id(token)?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(&user_id)
        .fetch_optional(pool.as_ref())
        .await?
        .ok_or_else(|| AppError::Auth("User no longer exists".to_string()))?;

    if user.is_banned {
        return Err(AppError::Forbidden(
            "This account has been banned".to_string(),
        ));
    }

    let role = user.role();
    Ok(AuthUser {
        id: user.id,
        username: user.username,
        role,
    })
}
