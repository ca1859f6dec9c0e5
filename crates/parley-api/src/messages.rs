use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;

use parley_db::models::MessageRow;
use parley_types::api::{MessageResponse, SendMessageRequest};

use crate::state::AppState;
use crate::time::parse_created_at;

pub async fn get_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<i64>,
) -> Result<impl IntoResponse, StatusCode> {
    // Run the blocking DB query off the async runtime
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.messages_for_conversation(conversation_id))
        .await
        .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })?
        .map_err(|e| { error!("Error fetching messages for conversation {}: {}", conversation_id, e); StatusCode::INTERNAL_SERVER_ERROR })?;

    let messages: Vec<MessageResponse> = rows.into_iter().map(to_response).collect();

    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<i64>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || {
        db.db.insert_message(req.sender_id, conversation_id, &req.content)
    })
    .await
    .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })?
    .map_err(|e| { error!("Error sending message to conversation {}: {}", conversation_id, e); StatusCode::INTERNAL_SERVER_ERROR })?;

    Ok((StatusCode::CREATED, Json(to_response(row))))
}

fn to_response(row: MessageRow) -> MessageResponse {
    MessageResponse {
        id: row.id,
        conversation_id: row.conversation_id,
        sender_id: row.sender_id,
        content: row.content,
        created_at: parse_created_at(&row.created_at),
    }
}
