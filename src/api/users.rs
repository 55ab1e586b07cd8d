use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::AppState;
use crate::middleware::auth::AuthUser;
use crate::models::trade::RatingWithRater;
use crate::models::user::{PublicProfile, UserResponse};
use crate::services::user::{get_account, get_public_profile, ratings_received, update_embark_id};
use crate::utils::error::AppResult;
use crate::utils::helpers::{DataResponse, json_data};

#[derive(Deserialize)]
struct UpdateProfileRequest {
    embark_id: String,
}

async fn me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    Ok(json_data(get_account(&state.db, &user.id).await?))
}

async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    Ok(json_data(
        update_embark_id(&state.db, &user.id, &req.embark_id).await?,
    ))
}

async fn profile(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<DataResponse<PublicProfile>>> {
    Ok(json_data(get_public_profile(&state.db, &user_id).await?))
}

async fn ratings(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<DataResponse<Vec<RatingWithRater>>>> {
    Ok(json_data(ratings_received(&state.db, &user_id).await?))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/me", get(me).patch(update_me))
        .route("/:user_id", get(profile))
        .route("/:user_id/ratings", get(ratings))
        .with_state(state)
}
