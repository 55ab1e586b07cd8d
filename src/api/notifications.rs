use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::AppState;
use crate::middleware::auth::AuthUser;
use crate::models::notification::Notification;
use crate::services::notification::{list_notifications, mark_read};
use crate::utils::error::AppResult;
use crate::utils::helpers::{DataResponse, json_data};

#[derive(Deserialize)]
struct NotificationQuery {
    #[serde(default)]
    unread_only: bool,
}

async fn list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<NotificationQuery>,
) -> AppResult<Json<DataResponse<Vec<Notification>>>> {
    Ok(json_data(
        list_notifications(&state.db, &user.id, query.unread_only).await?,
    ))
}

async fn read(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(notification_id): Path<String>,
) -> AppResult<Json<DataResponse<Notification>>> {
    Ok(json_data(
        mark_read(&state.db, &user.id, &notification_id).await?,
    ))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(list))
        .route("/:notification_id/read", post(read))
        .with_state(state)
}
