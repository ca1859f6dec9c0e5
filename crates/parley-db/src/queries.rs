use std::collections::HashMap;

use crate::models::{ConversationSummaryRow, LatestMessageRow, MembershipRow, MessageRow};
use crate::Database;
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(&self, name: &str, phone_number: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let id = conn.query_row(
                "INSERT INTO users (name, phone_number) VALUES (?1, ?2) RETURNING id",
                (name, phone_number),
                |row| row.get(0),
            )?;
            Ok(id)
        })
    }

    // -- Conversations --

    pub fn create_conversation(&self, title: Option<&str>) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let id = conn.query_row(
                "INSERT INTO conversations (title) VALUES (?1) RETURNING id",
                [title],
                |row| row.get(0),
            )?;
            Ok(id)
        })
    }

    pub fn add_member(&self, conversation_id: i64, user_id: i64, is_admin: bool) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO conversation_users (conversation_id, user_id, is_admin) VALUES (?1, ?2, ?3)",
                rusqlite::params![conversation_id, user_id, is_admin],
            )?;
            Ok(())
        })
    }

    /// The conversations a user belongs to, each annotated with its most
    /// recent message and ordered by that message's timestamp, newest first.
    ///
    /// Conversations with no messages yet are dropped from the result. When
    /// two messages in a conversation share the same timestamp, which one is
    /// reported as "latest" is arbitrary.
    ///
    /// Two round trips total regardless of how many conversations the user
    /// is in: one membership fetch, then one windowed query ranking messages
    /// within each candidate conversation.
    pub fn conversations_with_last_message(&self, user_id: i64) -> Result<Vec<ConversationSummaryRow>> {
        self.with_conn(|conn| {
            let memberships = query_memberships(conn, user_id)?;
            if memberships.is_empty() {
                return Ok(vec![]);
            }

            let conversation_ids: Vec<i64> =
                memberships.iter().map(|m| m.conversation_id).collect();
            let titles: HashMap<i64, Option<String>> = memberships
                .into_iter()
                .map(|m| (m.conversation_id, m.conversation_title))
                .collect();

            // Rows arrive sorted by created_at descending, so the final list
            // order falls out of the association step.
            let latest = query_latest_messages(conn, &conversation_ids)?;

            Ok(latest
                .into_iter()
                .filter_map(|row| {
                    titles.get(&row.conversation_id).map(|title| ConversationSummaryRow {
                        conversation_id: row.conversation_id,
                        conversation_title: title.clone(),
                        last_message_content: row.content,
                        last_message_created_at: row.created_at,
                        last_message_sender_id: row.sender_id,
                        last_message_author_name: row.author_name,
                    })
                })
                .collect())
        })
    }

    // -- Messages --

    /// All messages of a conversation, in storage order. An unknown
    /// conversation id yields an empty list, not an error.
    pub fn messages_for_conversation(&self, conversation_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages(conn, conversation_id))
    }

    /// Insert one message and return the stored row, including the
    /// server-assigned id and creation timestamp. Sender and conversation
    /// are checked only by the foreign keys.
    pub fn insert_message(
        &self,
        sender_id: i64,
        conversation_id: i64,
        content: &str,
    ) -> Result<MessageRow> {
        self.with_conn_mut(|conn| {
            let row = conn.query_row(
                "INSERT INTO messages (sender_id, conversation_id, content)
                 VALUES (?1, ?2, ?3)
                 RETURNING id, conversation_id, sender_id, content, created_at",
                rusqlite::params![sender_id, conversation_id, content],
                |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        conversation_id: row.get(1)?,
                        sender_id: row.get(2)?,
                        content: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )?;
            Ok(row)
        })
    }
}

fn query_memberships(conn: &Connection, user_id: i64) -> Result<Vec<MembershipRow>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.title
         FROM conversations c
         JOIN conversation_users cu ON cu.conversation_id = c.id
         WHERE cu.user_id = ?1",
    )?;

    let rows = stmt
        .query_map([user_id], |row| {
            Ok(MembershipRow {
                conversation_id: row.get(0)?,
                conversation_title: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Rank messages within each conversation by recency and keep rank 1,
/// joining users for the author's display name. One query for the whole
/// candidate set (eliminates N+1).
fn query_latest_messages(conn: &Connection, conversation_ids: &[i64]) -> Result<Vec<LatestMessageRow>> {
    let placeholders: Vec<String> = (1..=conversation_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT conversation_id, content, created_at, sender_id, author_name
         FROM (
             SELECT m.conversation_id, m.content, m.created_at, m.sender_id,
                    u.name AS author_name,
                    ROW_NUMBER() OVER (
                        PARTITION BY m.conversation_id
                        ORDER BY m.created_at DESC
                    ) AS recency_rank
             FROM messages m
             JOIN users u ON u.id = m.sender_id
             WHERE m.conversation_id IN ({})
         )
         WHERE recency_rank = 1
         ORDER BY created_at DESC",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> = conversation_ids
        .iter()
        .map(|id| id as &dyn rusqlite::types::ToSql)
        .collect();

    let rows = stmt
        .query_map(params.as_slice(), |row| {
            Ok(LatestMessageRow {
                conversation_id: row.get(0)?,
                content: row.get(1)?,
                created_at: row.get(2)?,
                sender_id: row.get(3)?,
                author_name: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_messages(conn: &Connection, conversation_id: i64) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, conversation_id, sender_id, content, created_at
         FROM messages
         WHERE conversation_id = ?1",
    )?;

    let rows = stmt
        .query_map([conversation_id], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                conversation_id: row.get(1)?,
                sender_id: row.get(2)?,
                content: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use crate::Database;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn user(db: &Database, name: &str, phone: &str) -> i64 {
        db.create_user(name, phone).unwrap()
    }

    fn conversation(db: &Database, title: Option<&str>) -> i64 {
        db.create_conversation(title).unwrap()
    }

    fn member(db: &Database, conversation_id: i64, user_id: i64) {
        db.add_member(conversation_id, user_id, false).unwrap();
    }

    /// Insert a message with an explicit timestamp so recency ordering is
    /// deterministic under test.
    fn message_at(db: &Database, sender_id: i64, conversation_id: i64, content: &str, created_at: &str) {
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (sender_id, conversation_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![sender_id, conversation_id, content, created_at],
            )?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn conversation_without_messages_is_excluded() {
        let db = test_db();
        let me = user(&db, "Me", "+1000");
        let jane = user(&db, "Jane", "+1001");

        let a = conversation(&db, Some("A"));
        let b = conversation(&db, Some("B"));
        let c = conversation(&db, Some("C"));
        for conv in [a, b, c] {
            member(&db, conv, me);
            member(&db, conv, jane);
        }

        message_at(&db, jane, a, "first", "2024-01-01 10:00:05");
        message_at(&db, me, a, "second", "2024-01-01 10:00:10");
        message_at(&db, jane, b, "only", "2024-01-01 10:00:05");
        // c has no messages at all

        let list = db.conversations_with_last_message(me).unwrap();

        let ids: Vec<i64> = list.iter().map(|s| s.conversation_id).collect();
        assert_eq!(ids, vec![a, b]);
        assert!(!ids.contains(&c));
    }

    #[test]
    fn last_message_is_the_most_recent_one() {
        let db = test_db();
        let me = user(&db, "Me", "+1000");
        let jane = user(&db, "Jane Smith", "+1001");
        let bob = user(&db, "Bob Johnson", "+1002");

        let conv = conversation(&db, Some("Project Team"));
        for u in [me, jane, bob] {
            member(&db, conv, u);
        }

        message_at(&db, me, conv, "meeting at 3", "2024-01-01 09:00:00");
        message_at(&db, bob, conv, "works for me", "2024-01-01 09:05:00");
        message_at(&db, jane, conv, "I'll be there", "2024-01-01 09:10:00");

        let list = db.conversations_with_last_message(me).unwrap();
        assert_eq!(list.len(), 1);

        let summary = &list[0];
        assert_eq!(summary.conversation_id, conv);
        assert_eq!(summary.conversation_title.as_deref(), Some("Project Team"));
        assert_eq!(summary.last_message_content, "I'll be there");
        assert_eq!(summary.last_message_created_at, "2024-01-01 09:10:00");
        assert_eq!(summary.last_message_sender_id, jane);
        assert_eq!(summary.last_message_author_name, "Jane Smith");
    }

    #[test]
    fn list_is_ordered_by_last_message_desc() {
        let db = test_db();
        let me = user(&db, "Me", "+1000");
        let other = user(&db, "Other", "+1001");

        // Insertion order deliberately different from recency order.
        let stale = conversation(&db, Some("stale"));
        let fresh = conversation(&db, Some("fresh"));
        let middle = conversation(&db, None);
        for conv in [stale, fresh, middle] {
            member(&db, conv, me);
            member(&db, conv, other);
        }

        message_at(&db, other, stale, "old news", "2024-01-01 08:00:00");
        message_at(&db, other, fresh, "breaking", "2024-01-03 08:00:00");
        message_at(&db, other, middle, "in between", "2024-01-02 08:00:00");

        let list = db.conversations_with_last_message(me).unwrap();
        let ids: Vec<i64> = list.iter().map(|s| s.conversation_id).collect();
        assert_eq!(ids, vec![fresh, middle, stale]);

        for pair in list.windows(2) {
            assert!(pair[0].last_message_created_at >= pair[1].last_message_created_at);
        }

        // Title is reported as stored; the API layer decides how to render None.
        assert_eq!(list[1].conversation_title, None);
    }

    #[test]
    fn unknown_user_yields_empty_list() {
        let db = test_db();
        let me = user(&db, "Me", "+1000");
        let conv = conversation(&db, Some("A"));
        member(&db, conv, me);
        message_at(&db, me, conv, "hello", "2024-01-01 10:00:00");

        assert!(db.conversations_with_last_message(9999).unwrap().is_empty());
    }

    #[test]
    fn user_without_memberships_yields_empty_list() {
        let db = test_db();
        let me = user(&db, "Me", "+1000");
        let loner = user(&db, "Loner", "+1001");
        let conv = conversation(&db, Some("A"));
        member(&db, conv, me);
        message_at(&db, me, conv, "hello", "2024-01-01 10:00:00");

        assert!(db.conversations_with_last_message(loner).unwrap().is_empty());
    }

    #[test]
    fn membership_is_required_even_when_messages_exist() {
        let db = test_db();
        let me = user(&db, "Me", "+1000");
        let jane = user(&db, "Jane", "+1001");

        let mine = conversation(&db, Some("mine"));
        let theirs = conversation(&db, Some("theirs"));
        member(&db, mine, me);
        member(&db, theirs, jane);

        message_at(&db, me, mine, "hi", "2024-01-01 10:00:00");
        message_at(&db, jane, theirs, "secret", "2024-01-02 10:00:00");

        let list = db.conversations_with_last_message(me).unwrap();
        let ids: Vec<i64> = list.iter().map(|s| s.conversation_id).collect();
        assert_eq!(ids, vec![mine]);
    }

    #[test]
    fn messages_for_conversation_returns_exact_set() {
        let db = test_db();
        let me = user(&db, "Me", "+1000");
        let jane = user(&db, "Jane", "+1001");

        let a = conversation(&db, Some("A"));
        let b = conversation(&db, Some("B"));
        for conv in [a, b] {
            member(&db, conv, me);
            member(&db, conv, jane);
        }

        // Interleave writes across the two conversations.
        message_at(&db, me, a, "a1", "2024-01-01 10:00:00");
        message_at(&db, jane, b, "b1", "2024-01-01 10:00:01");
        message_at(&db, jane, a, "a2", "2024-01-01 10:00:02");
        message_at(&db, me, b, "b2", "2024-01-01 10:00:03");

        let mut contents: Vec<String> = db
            .messages_for_conversation(a)
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        contents.sort();
        assert_eq!(contents, vec!["a1", "a2"]);

        let rows = db.messages_for_conversation(b).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|m| m.conversation_id == b));
    }

    #[test]
    fn messages_for_unknown_conversation_is_empty() {
        let db = test_db();
        assert!(db.messages_for_conversation(42).unwrap().is_empty());
    }

    #[test]
    fn send_message_appends_exactly_one_row() {
        let db = test_db();
        let me = user(&db, "Me", "+1000");
        let jane = user(&db, "Jane", "+1001");
        let conv = conversation(&db, Some("empty until now"));
        member(&db, conv, me);
        member(&db, conv, jane);

        assert!(db.messages_for_conversation(conv).unwrap().is_empty());

        let created = db.insert_message(jane, conv, "hi").unwrap();
        assert!(created.id > 0);
        assert_eq!(created.sender_id, jane);
        assert_eq!(created.conversation_id, conv);
        assert_eq!(created.content, "hi");
        assert!(!created.created_at.is_empty());

        let rows = db.messages_for_conversation(conv).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, created.id);
        assert_eq!(rows[0].content, "hi");
    }

    #[test]
    fn send_message_twice_creates_distinct_rows() {
        let db = test_db();
        let me = user(&db, "Me", "+1000");
        let conv = conversation(&db, None);
        member(&db, conv, me);

        let first = db.insert_message(me, conv, "ping").unwrap();
        let second = db.insert_message(me, conv, "ping").unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(db.messages_for_conversation(conv).unwrap().len(), 2);
    }

    #[test]
    fn send_message_to_unknown_conversation_fails() {
        let db = test_db();
        let me = user(&db, "Me", "+1000");

        assert!(db.insert_message(me, 42, "into the void").is_err());
    }

    #[test]
    fn send_message_from_unknown_sender_fails() {
        let db = test_db();
        let conv = conversation(&db, Some("A"));

        assert!(db.insert_message(42, conv, "who am I").is_err());
    }

    #[test]
    fn duplicate_membership_is_rejected() {
        let db = test_db();
        let me = user(&db, "Me", "+1000");
        let conv = conversation(&db, Some("A"));

        db.add_member(conv, me, false).unwrap();
        assert!(db.add_member(conv, me, true).is_err());
    }
}
