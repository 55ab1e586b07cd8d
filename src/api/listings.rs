use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;

use crate::api::AppState;
use crate::middleware::auth::{AuthUser, auth_middleware};
use crate::models::listing::{CreateListingRequest, ListingView};
use crate::services::listing::{
    ListingFilter, ListingQuery, close_listing, create_listing, get_listing, list_listings,
};
use crate::utils::error::AppResult;
use crate::utils::helpers::{DataResponse, json_data};

#[derive(Serialize)]
struct ChatStatusResponse {
    has_active_chat: bool,
}

async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListingQuery>,
) -> AppResult<Json<DataResponse<Vec<ListingView>>>> {
    let filter = ListingFilter::try_from(query)?;
    Ok(json_data(list_listings(&state.db, &filter).await?))
}

async fn show(
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<String>,
) -> AppResult<Json<DataResponse<ListingView>>> {
    Ok(json_data(get_listing(&state.db, &listing_id).await?))
}

async fn create(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateListingRequest>,
) -> AppResult<Json<DataResponse<ListingView>>> {
    Ok(json_data(create_listing(&state.db, &user, req).await?))
}

async fn close(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(listing_id): Path<String>,
) -> AppResult<Json<DataResponse<ListingView>>> {
    Ok(json_data(close_listing(&state.db, &user, &listing_id).await?))
}

async fn chat_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(listing_id): Path<String>,
) -> AppResult<Json<DataResponse<ChatStatusResponse>>> {
    let has_active_chat = state.chats.has_active_chat(&user.id, &listing_id).await?;
    Ok(json_data(ChatStatusResponse { has_active_chat }))
}

/// The marketplace feed is readable without an account.
pub fn routes(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/", post(create))
        .route("/:listing_id/close", post(close))
        .route("/:listing_id/chat-status", get(chat_status))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/", get(list))
        .route("/:listing_id", get(show))
        .merge(protected)
        .with_state(state)
}
