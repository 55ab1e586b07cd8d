use axum::{
    extract::{
        Query, State,
        ws::{WebSocket, WebSocketUpgrade},
    },
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::AppState;
use crate::middleware::auth::{AuthUser, bearer_token};
use crate::services::auth::resolve_principal;
use crate::utils::error::{AppError, AppResult};

#[derive(Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// Browsers cannot set headers on websocket upgrades, so the token may also
/// come as a query parameter.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let token = query
        .token
        .or_else(|| bearer_token(&headers).map(str::to_string))
        .ok_or_else(|| AppError::Auth("Missing token".to_string()))?;

    let user = resolve_principal(&state.db, &state.jwt_service, &token).await?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user)))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user: AuthUser) {
    state
        .ws_manager
        .handle_connection(socket, user, state.chats.clone())
        .await;
}
