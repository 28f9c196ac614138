//! CRUD operations for [`Message`] records.

use chrono::Utc;
use rusqlite::params;
use studybuddy_shared::{MessageId, UserId};

use crate::database::Database;
use crate::error::{map_insert_error, Result, StoreError};
use crate::models::Message;
use crate::rows;

impl Database {
    /// Insert a new message.
    pub fn insert_message(&self, message: &Message) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO messages
                     (id, sender, receiver, content, read, reply_to, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    message.id.to_string(),
                    message.sender.to_string(),
                    message.receiver.to_string(),
                    message.content,
                    message.read,
                    message.reply_to.map(|id| id.to_string()),
                    message.created_at.to_rfc3339(),
                    message.updated_at.to_rfc3339(),
                ],
            )
            .map_err(map_insert_error)?;
        Ok(())
    }

    /// Fetch a single message by id.
    pub fn get_message(&self, id: MessageId) -> Result<Message> {
        self.conn()
            .query_row(
                "SELECT id, sender, receiver, content, read, reply_to, created_at, updated_at
                 FROM messages WHERE id = ?1",
                params![id.to_string()],
                row_to_message,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Every message the user sent or received, newest first.
    ///
    /// Degenerate self-to-self messages are excluded so they cannot produce
    /// a conversation thread with oneself.
    pub fn messages_for_user(&self, user: UserId) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, sender, receiver, content, read, reply_to, created_at, updated_at
             FROM messages
             WHERE (sender = ?1 OR receiver = ?1) AND sender != receiver
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![user.to_string()], row_to_message)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// The full two-way conversation between two users, oldest first.
    pub fn conversation(&self, user: UserId, partner: UserId) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, sender, receiver, content, read, reply_to, created_at, updated_at
             FROM messages
             WHERE (sender = ?1 AND receiver = ?2) OR (sender = ?2 AND receiver = ?1)
             ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![user.to_string(), partner.to_string()], row_to_message)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Mark every unread message received by the user as read.
    ///
    /// Idempotent: the predicate only touches rows still unread, so
    /// concurrent inbox views by the same user never conflict.  Returns the
    /// number of messages flipped.
    pub fn mark_all_read(&self, receiver: UserId) -> Result<usize> {
        let affected = self.conn().execute(
            "UPDATE messages SET read = 1, updated_at = ?2
             WHERE receiver = ?1 AND read = 0",
            params![receiver.to_string(), Utc::now().to_rfc3339()],
        )?;
        Ok(affected)
    }

    /// Flip a single message's read flag.  A no-op when already read;
    /// returns whether the flag changed.
    pub fn mark_read(&self, id: MessageId) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE messages SET read = 1, updated_at = ?2
             WHERE id = ?1 AND read = 0",
            params![id.to_string(), Utc::now().to_rfc3339()],
        )?;
        Ok(affected > 0)
    }

    /// Whether the user has any unread received messages.
    pub fn has_unread(&self, receiver: UserId) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM messages WHERE receiver = ?1 AND read = 0",
            params![receiver.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let sender_str: String = row.get(1)?;
    let receiver_str: String = row.get(2)?;
    let content: String = row.get(3)?;
    let read: bool = row.get(4)?;
    let reply_to_str: Option<String> = row.get(5)?;
    let created_str: String = row.get(6)?;
    let updated_str: String = row.get(7)?;

    Ok(Message {
        id: MessageId(rows::uuid_col(0, &id_str)?),
        sender: UserId(rows::uuid_col(1, &sender_str)?),
        receiver: UserId(rows::uuid_col(2, &receiver_str)?),
        content,
        read,
        reply_to: rows::opt_uuid_col(5, reply_to_str.as_deref())?.map(MessageId),
        created_at: rows::timestamp_col(6, &created_str)?,
        updated_at: rows::timestamp_col(7, &updated_str)?,
    })
}
