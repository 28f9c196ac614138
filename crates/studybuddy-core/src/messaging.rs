//! Message write workflows: sending and read-flag transitions.

use studybuddy_shared::{MessageId, UserId};
use studybuddy_store::{Database, Message, StoreError};

use crate::error::{CoreError, Result};

/// Persist a new message from `sender` to `receiver`.
///
/// Empty content and self-messages are declined as invalid input; a missing
/// receiver or reply target short-circuits as not-found.  On a transient
/// store failure the write is treated as not applied.
pub fn send_message(
    db: &Database,
    sender: UserId,
    receiver: UserId,
    content: &str,
    reply_to: Option<MessageId>,
) -> Result<Message> {
    let content = content.trim();
    if content.is_empty() {
        return Err(CoreError::InvalidInput("message content is empty".into()));
    }
    if sender == receiver {
        return Err(CoreError::InvalidInput(
            "cannot send a message to yourself".into(),
        ));
    }

    db.get_user(sender).map_err(not_found("sender"))?;
    db.get_user(receiver).map_err(not_found("receiver"))?;
    if let Some(original) = reply_to {
        db.get_message(original).map_err(not_found("reply target"))?;
    }

    let message = Message::new(sender, receiver, content.to_string(), reply_to);
    db.insert_message(&message)?;
    tracing::debug!(id = %message.id, sender = %sender, receiver = %receiver, "message sent");
    Ok(message)
}

/// Mark a single message as read.
///
/// The flip is false -> true exactly once; marking an already-read message
/// again is a no-op.  Returns whether the flag changed.
pub fn mark_message_read(db: &Database, id: MessageId) -> Result<bool> {
    db.get_message(id).map_err(not_found("message"))?;
    Ok(db.mark_read(id)?)
}

fn not_found(what: &'static str) -> impl Fn(StoreError) -> CoreError {
    move |e| match e {
        StoreError::NotFound => CoreError::NotFound(what.into()),
        other => other.into(),
    }
}
