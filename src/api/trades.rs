use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;

use crate::api::AppState;
use crate::middleware::auth::AuthUser;
use crate::models::trade::{Rating, Trade};
use crate::services::trade::{SubmitRatingRequest, get_trade, list_user_trades, submit_rating};
use crate::utils::error::AppResult;
use crate::utils::helpers::{DataResponse, json_data};

async fn list(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<DataResponse<Vec<Trade>>>> {
    Ok(json_data(list_user_trades(&state.db, &user.id).await?))
}

async fn show(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(trade_id): Path<String>,
) -> AppResult<Json<DataResponse<Trade>>> {
    Ok(json_data(get_trade(&state.db, &user, &trade_id).await?))
}

async fn rate(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(trade_id): Path<String>,
    Json(req): Json<SubmitRatingRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Rating>>)> {
    let rating = submit_rating(&state.db, &state.events, &user, &trade_id, req).await?;
    Ok((StatusCode::CREATED, json_data(rating)))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(list))
        .route("/:trade_id", get(show))
        .route("/:trade_id/ratings", post(rate))
        .with_state(state)
}
