use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;

use parley_types::api::{ConversationSummary, LastMessage};

use crate::state::AppState;
use crate::time::parse_created_at;

/// Title rendered for conversations that were created without one.
const UNTITLED: &str = "Untitled Conversation";

pub async fn list_conversations(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, StatusCode> {
    // Run the blocking DB queries off the async runtime
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.conversations_with_last_message(user_id))
        .await
        .map_err(|e| { error!("spawn_blocking join error: {}", e); StatusCode::INTERNAL_SERVER_ERROR })?
        .map_err(|e| { error!("Error fetching conversations for user {}: {}", user_id, e); StatusCode::INTERNAL_SERVER_ERROR })?;

    let conversations: Vec<ConversationSummary> = rows
        .into_iter()
        .map(|row| ConversationSummary {
            id: row.conversation_id,
            title: row.conversation_title.unwrap_or_else(|| UNTITLED.to_string()),
            last_message: LastMessage {
                content: row.last_message_content,
                created_at: parse_created_at(&row.last_message_created_at),
                sender_id: row.last_message_sender_id,
                author_name: row.last_message_author_name,
            },
        })
        .collect();

    Ok(Json(conversations))
}
