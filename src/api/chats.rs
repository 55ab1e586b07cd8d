use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::AppState;
use crate::middleware::auth::AuthUser;
use crate::models::chat::{ApprovalOutcome, ChatView, LeaveOutcome, LockInOutcome};
use crate::models::message::MessageWithSender;
use crate::utils::error::AppResult;
use crate::utils::helpers::{DataResponse, json_data};

#[derive(Deserialize)]
struct CreateChatRequest {
    listing_id: String,
}

#[derive(Serialize)]
struct CreateChatResponse {
    chat_id: String,
    created: bool,
}

#[derive(Deserialize)]
struct SendMessageRequest {
    content: String,
}

async fn create_chat(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateChatRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<CreateChatResponse>>)> {
    let (chat, created) = state
        .chats
        .find_or_create_chat(Some(&user), &req.listing_id)
        .await?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        json_data(CreateChatResponse {
            chat_id: chat.id,
            created,
        }),
    ))
}

async fn list_chats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<DataResponse<Vec<ChatView>>>> {
    Ok(json_data(state.chats.list_chats(Some(&user)).await?))
}

async fn get_chat(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(chat_id): Path<String>,
) -> AppResult<Json<DataResponse<ChatView>>> {
    Ok(json_data(state.chats.get_chat(&chat_id, Some(&user)).await?))
}

async fn list_messages(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(chat_id): Path<String>,
) -> AppResult<Json<DataResponse<Vec<MessageWithSender>>>> {
    Ok(json_data(
        state.chats.list_messages(&chat_id, Some(&user)).await?,
    ))
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(chat_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<MessageWithSender>>)> {
    let message = state
        .chats
        .send_message(&chat_id, Some(&user), &req.content)
        .await?;
    Ok((StatusCode::CREATED, json_data(message)))
}

async fn lock_in(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(chat_id): Path<String>,
) -> AppResult<Json<DataResponse<LockInOutcome>>> {
    Ok(json_data(state.chats.lock_in(&chat_id, Some(&user)).await?))
}

async fn approve(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(chat_id): Path<String>,
) -> AppResult<Json<DataResponse<ApprovalOutcome>>> {
    Ok(json_data(state.chats.approve(&chat_id, Some(&user)).await?))
}

async fn leave(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(chat_id): Path<String>,
) -> AppResult<Json<DataResponse<LeaveOutcome>>> {
    Ok(json_data(state.chats.leave(&chat_id, Some(&user)).await?))
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(list_chats).post(create_chat))
        .route("/:chat_id", get(get_chat))
        .route("/:chat_id/messages", get(list_messages).post(send_message))
        .route("/:chat_id/lock-in", post(lock_in))
        .route("/:chat_id/approve", post(approve))
        .route("/:chat_id/leave", post(leave))
        .with_state(state)
}
