use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- Conversations --

/// One entry in a user's conversation list: the conversation plus a
/// preview of its most recent message. The list endpoint returns these
/// ordered by `last_message.created_at`, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub id: i64,
    pub title: String,
    pub last_message: LastMessage,
}

#[derive(Debug, Clone, Serialize)]
pub struct LastMessage {
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub sender_id: i64,
    pub author_name: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub sender_id: i64,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
