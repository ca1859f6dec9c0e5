/// Database row types — these map directly to SQLite rows.
/// Distinct from the parley-types API models to keep the DB layer independent.

pub struct MembershipRow {
    pub conversation_id: i64,
    pub conversation_title: Option<String>,
}

pub struct MessageRow {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub created_at: String,
}

/// The single most recent message of one conversation, joined to its
/// author's display name.
pub struct LatestMessageRow {
    pub conversation_id: i64,
    pub content: String,
    pub created_at: String,
    pub sender_id: i64,
    pub author_name: String,
}

/// Result row of the conversation-list query: one conversation the user
/// belongs to, annotated with its most recent message. Conversations
/// without any messages never produce a row.
pub struct ConversationSummaryRow {
    pub conversation_id: i64,
    pub conversation_title: Option<String>,
    pub last_message_content: String,
    pub last_message_created_at: String,
    pub last_message_sender_id: i64,
    pub last_message_author_name: String,
}
