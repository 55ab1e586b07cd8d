use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use std::sync::Arc;

use crate::api::AppState;
use crate::middleware::auth::{AuthUser, auth_middleware};
use crate::models::item::{CreateItemRequest, Item};
use crate::services::catalog::{ItemFilter, ItemQuery, create_item, get_item, list_items};
use crate::utils::error::AppResult;
use crate::utils::helpers::{DataResponse, json_data};

async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ItemQuery>,
) -> AppResult<Json<DataResponse<Vec<Item>>>> {
    let filter = ItemFilter::try_from(query)?;
    Ok(json_data(list_items(&state.db, &filter).await?))
}

async fn show(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
) -> AppResult<Json<DataResponse<Item>>> {
    Ok(json_data(get_item(&state.db, &item_id).await?))
}

async fn create(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateItemRequest>,
) -> AppResult<Json<DataResponse<Item>>> {
    user.require_admin()?;
    Ok(json_data(create_item(&state.db, req).await?))
}

/// Browsing is public; adding catalog entries needs an admin session.
pub fn routes(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/", post(create))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/", get(list))
        .route("/:item_id", get(show))
        .merge(protected)
        .with_state(state)
}
