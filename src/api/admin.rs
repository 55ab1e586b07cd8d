use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::AppState;
use crate::middleware::auth::AuthUser;
use crate::models::user::AdminUserRow;
use crate::services::catalog::Page;
use crate::services::user_moderation::{list_users, set_banned};
use crate::utils::error::AppResult;
use crate::utils::helpers::{DataResponse, json_data};

#[derive(Deserialize)]
struct ListParams {
    limit: Option<i64>,
    offset: Option<i64>,
    q: Option<String>,
}

#[derive(Serialize)]
struct UserListResponse {
    users: Vec<AdminUserRow>,
    total: i64,
}

async fn list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<DataResponse<UserListResponse>>> {
    let page = Page::new(params.limit, params.offset)?;
    let (users, total) = list_users(&state.db, &user, params.q.as_deref(), page).await?;
    Ok(json_data(UserListResponse { users, total }))
}

async fn ban(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> AppResult<Json<DataResponse<AdminUserRow>>> {
    Ok(json_data(set_banned(&state.db, &user, &user_id, true).await?))
}

async fn unban(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> AppResult<Json<DataResponse<AdminUserRow>>> {
    Ok(json_data(set_banned(&state.db, &user, &user_id, false).await?))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/users", get(list))
        .route("/users/:user_id/ban", post(ban))
        .route("/users/:user_id/unban", post(unban))
        .with_state(state)
}
