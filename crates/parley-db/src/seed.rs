//! Demo-data seeding. The small profile is a hand-curated dataset for
//! local development; the large profile generates bulk volume for
//! exercising the conversation-list query.

use anyhow::Result;
use tracing::info;

use crate::Database;

pub enum Profile {
    Small,
    Large,
}

/// Wipe all rows and repopulate. Id sequences restart from 1 so the demo
/// user always ends up with id 1.
pub fn run(db: &Database, profile: Profile) -> Result<()> {
    wipe(db)?;
    match profile {
        Profile::Small => small(db),
        Profile::Large => large(db),
    }
}

fn wipe(db: &Database) -> Result<()> {
    db.with_conn_mut(|conn| {
        conn.execute_batch(
            "DELETE FROM messages;
             DELETE FROM conversation_users;
             DELETE FROM conversations;
             DELETE FROM users;
             DELETE FROM sqlite_sequence
              WHERE name IN ('users', 'conversations', 'conversation_users', 'messages');",
        )?;
        Ok(())
    })?;
    info!("Existing data cleared");
    Ok(())
}

fn small(db: &Database) -> Result<()> {
    let me = db.create_user("Me", "+1234567890")?;
    let jane = db.create_user("Jane Smith", "+1234567891")?;
    let bob = db.create_user("Bob Johnson", "+1234567892")?;
    let alice = db.create_user("Alice Williams", "+1234567893")?;
    let charlie = db.create_user("Charlie Brown", "+1234567894")?;
    info!("Created 5 users, demo user id {}", me);

    let with_jane = db.create_conversation(Some("Chat with Jane"))?;
    let with_bob = db.create_conversation(Some("Chat with Bob"))?;
    let project = db.create_conversation(Some("Project Team"))?;
    let weekend = db.create_conversation(Some("Weekend Plans"))?;
    let family = db.create_conversation(Some("Family Chat"))?;

    db.add_member(with_jane, me, false)?;
    db.add_member(with_jane, jane, false)?;

    db.add_member(with_bob, me, false)?;
    db.add_member(with_bob, bob, false)?;

    db.add_member(project, me, true)?;
    db.add_member(project, jane, false)?;
    db.add_member(project, bob, false)?;

    db.add_member(weekend, me, false)?;
    db.add_member(weekend, alice, false)?;
    db.add_member(weekend, charlie, false)?;

    db.add_member(family, me, true)?;
    db.add_member(family, jane, false)?;
    db.add_member(family, bob, false)?;
    db.add_member(family, alice, false)?;
    db.add_member(family, charlie, false)?;
    info!("Created 5 conversations");

    let script: &[(i64, i64, &str)] = &[
        (me, with_jane, "Hey Jane, how's the project going?"),
        (jane, with_jane, "Going well! Just finished the design phase"),
        (me, with_jane, "Great! Let me know if you need any help"),
        (bob, with_bob, "Can we review the code tomorrow?"),
        (me, with_bob, "Sure, how about 10 AM?"),
        (bob, with_bob, "Perfect, see you then!"),
        (me, project, "Team meeting at 3 PM today"),
        (jane, project, "I'll be there"),
        (bob, project, "Me too!"),
        (alice, weekend, "Anyone up for hiking this weekend?"),
        (me, weekend, "Count me in! What time?"),
        (charlie, weekend, "Let's start early, 7 AM?"),
        (me, family, "Don't forget about dinner tonight!"),
        (alice, family, "I'll be there by 7"),
        (jane, family, "Looking forward to it!"),
    ];

    // Spread the timestamps one second apart so every conversation has an
    // unambiguous latest message.
    db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO messages (sender_id, conversation_id, content, created_at)
                 VALUES (?1, ?2, ?3, datetime('now', ?4))",
            )?;
            for (i, (sender, conversation, content)) in script.iter().enumerate() {
                let offset = format!("-{} seconds", script.len() - i);
                stmt.execute(rusqlite::params![sender, conversation, content, offset])?;
            }
        }
        tx.commit()?;
        Ok(())
    })?;
    info!("Created {} messages", script.len());

    Ok(())
}

const TEMPLATES: &[&str] = &[
    "Hey, how are you?",
    "Did you see the news today?",
    "Let's catch up soon",
    "Running a bit late, sorry",
    "That sounds great!",
    "Can you send me the file?",
    "On my way now",
    "What do you think about this?",
    "Thanks for the help earlier",
    "See you tomorrow",
];

fn large(db: &Database) -> Result<()> {
    const USERS: usize = 1000;
    const CONVERSATIONS: usize = 500;
    const MESSAGES_PER_CONVERSATION: usize = 200;

    let me = db.create_user("Me", "+1234567890")?;

    db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;
        {
            let mut insert_user = tx.prepare(
                "INSERT INTO users (name, phone_number) VALUES (?1, ?2)",
            )?;
            for i in 1..USERS {
                insert_user.execute(rusqlite::params![
                    format!("User {}", i),
                    format!("+1555{:07}", i),
                ])?;
            }

            let mut insert_conversation = tx.prepare(
                "INSERT INTO conversations (title) VALUES (?1) RETURNING id",
            )?;
            let mut insert_member = tx.prepare(
                "INSERT INTO conversation_users (conversation_id, user_id) VALUES (?1, ?2)",
            )?;
            let mut insert_message = tx.prepare(
                "INSERT INTO messages (sender_id, conversation_id, content, created_at)
                 VALUES (?1, ?2, ?3, datetime('now', ?4))",
            )?;

            for i in 0..CONVERSATIONS {
                let other = (me + 1) + (i % (USERS - 1)) as i64;
                let conversation: i64 = insert_conversation.query_row(
                    rusqlite::params![format!("Chat with User {}", other)],
                    |row| row.get(0),
                )?;
                insert_member.execute(rusqlite::params![conversation, me])?;
                insert_member.execute(rusqlite::params![conversation, other])?;

                for j in 0..MESSAGES_PER_CONVERSATION {
                    let sender = if j % 2 == 0 { me } else { other };
                    let content = TEMPLATES[(i * 31 + j) % TEMPLATES.len()];
                    // Scatter messages over the past year, newest last.
                    let age_seconds =
                        (CONVERSATIONS - i) * 60_000 + (MESSAGES_PER_CONVERSATION - j) * 60;
                    insert_message.execute(rusqlite::params![
                        sender,
                        conversation,
                        content,
                        format!("-{} seconds", age_seconds),
                    ])?;
                }

                if (i + 1) % 100 == 0 {
                    info!("Seeded {} conversations...", i + 1);
                }
            }
        }
        tx.commit()?;
        Ok(())
    })?;

    info!(
        "Created {} users, {} conversations, {} messages",
        USERS,
        CONVERSATIONS,
        CONVERSATIONS * MESSAGES_PER_CONVERSATION
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{run, Profile};
    use crate::Database;

    #[test]
    fn small_profile_populates_demo_dataset() {
        let db = Database::open_in_memory().unwrap();
        run(&db, Profile::Small).unwrap();

        let (users, conversations, messages) = db
            .with_conn(|conn| {
                let users: i64 =
                    conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
                let conversations: i64 =
                    conn.query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))?;
                let messages: i64 =
                    conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
                Ok((users, conversations, messages))
            })
            .unwrap();
        assert_eq!(users, 5);
        assert_eq!(conversations, 5);
        assert_eq!(messages, 15);

        // The demo user is id 1 and belongs to every conversation, all of
        // which have at least one message.
        let list = db.conversations_with_last_message(1).unwrap();
        assert_eq!(list.len(), 5);
    }

    #[test]
    fn reseeding_restarts_ids_from_one() {
        let db = Database::open_in_memory().unwrap();
        run(&db, Profile::Small).unwrap();
        run(&db, Profile::Small).unwrap();

        let min_user: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT MIN(id) FROM users", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(min_user, 1);
    }
}
