//! The Thread Aggregator.
//!
//! Collapses a user's flat message log into one conversation thread per
//! partner, each represented by its most recent message.  Grouping is a pure
//! function over the full log; the only mutation is the deliberate
//! "viewing marks read" policy applied when the inbox is opened.

use std::collections::HashMap;

use serde::Serialize;
use studybuddy_shared::UserId;
use studybuddy_store::{Database, Message};

use crate::error::{CoreError, Result};

/// A conversation with one partner, represented by its latest message.
#[derive(Debug, Clone, Serialize)]
pub struct Thread {
    pub partner: UserId,
    pub latest: Message,
}

/// Group a message log into threads, one per distinct partner.
///
/// The thread preview is the message with the latest creation timestamp;
/// identical timestamps are broken by the larger message id, so the result
/// is deterministic.  Self-to-self messages and messages not involving
/// `user` are ignored.  Threads come back newest-first.
pub fn group_threads(user: UserId, messages: &[Message]) -> Vec<Thread> {
    let mut latest: HashMap<UserId, &Message> = HashMap::new();

    for msg in messages {
        if msg.sender == msg.receiver {
            continue;
        }
        let partner = if msg.sender == user {
            msg.receiver
        } else if msg.receiver == user {
            msg.sender
        } else {
            continue;
        };

        latest
            .entry(partner)
            .and_modify(|current| {
                if (msg.created_at, msg.id) > (current.created_at, current.id) {
                    *current = msg;
                }
            })
            .or_insert(msg);
    }

    let mut threads: Vec<Thread> = latest
        .into_iter()
        .map(|(partner, msg)| Thread {
            partner,
            latest: msg.clone(),
        })
        .collect();
    threads.sort_by(|a, b| {
        (b.latest.created_at, b.latest.id).cmp(&(a.latest.created_at, a.latest.id))
    });
    threads
}

/// Build the inbox view for a user.
///
/// Every unread message the user has received is marked read first; viewing
/// the inbox is what marks messages read, not a separate call the caller
/// must remember.  The mark is idempotent, so concurrent inbox views never
/// conflict.
pub fn inbox(db: &Database, user: UserId) -> Result<Vec<Thread>> {
    db.get_user(user)?;

    let flipped = db.mark_all_read(user)?;
    if flipped > 0 {
        tracing::debug!(user = %user, flipped, "marked received messages read");
    }

    let log = db.messages_for_user(user)?;
    Ok(group_threads(user, &log))
}

/// The full two-way conversation between a user and one partner, oldest
/// first.  A self-conversation is rejected as invalid input.
pub fn conversation(db: &Database, user: UserId, partner: UserId) -> Result<Vec<Message>> {
    if user == partner {
        return Err(CoreError::InvalidInput(
            "cannot open a conversation with yourself".into(),
        ));
    }
    db.get_user(user)?;
    db.get_user(partner)?;
    Ok(db.conversation(user, partner)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use studybuddy_shared::MessageId;
    use studybuddy_store::User;
    use uuid::Uuid;

    fn user(db: &Database, name: &str) -> UserId {
        let u = User::new(name.into(), format!("{name}@school.edu"), "hash".into());
        db.create_user(&u).unwrap();
        u.id
    }

    fn message_at(sender: UserId, receiver: UserId, minutes_ago: i64) -> Message {
        let mut msg = Message::new(sender, receiver, "hi".into(), None);
        msg.created_at = Utc::now() - Duration::minutes(minutes_ago);
        msg.updated_at = msg.created_at;
        msg
    }

    #[test]
    fn one_thread_per_partner_with_latest_preview() {
        let me = UserId::new();
        let anna = UserId::new();
        let ben = UserId::new();

        let old = message_at(me, anna, 30);
        let newer = message_at(anna, me, 10);
        let other = message_at(ben, me, 20);

        let threads = group_threads(me, &[old, newer.clone(), other.clone()]);
        assert_eq!(threads.len(), 2);

        // Newest-first ordering: anna's thread (10 min ago) before ben's.
        assert_eq!(threads[0].partner, anna);
        assert_eq!(threads[0].latest, newer);
        assert_eq!(threads[1].partner, ben);
        assert_eq!(threads[1].latest, other);
    }

    #[test]
    fn identical_timestamps_break_ties_by_larger_id() {
        let me = UserId::new();
        let anna = UserId::new();

        let ts = Utc::now();
        let mut first = Message::new(me, anna, "first".into(), None);
        first.id = MessageId(Uuid::from_u128(1));
        first.created_at = ts;
        let mut second = Message::new(anna, me, "second".into(), None);
        second.id = MessageId(Uuid::from_u128(2));
        second.created_at = ts;

        let threads = group_threads(me, &[second.clone(), first]);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].latest, second);
    }

    #[test]
    fn self_messages_never_form_a_thread() {
        let me = UserId::new();
        let threads = group_threads(me, &[message_at(me, me, 5)]);
        assert!(threads.is_empty());
    }

    #[test]
    fn inbox_marks_received_messages_read_idempotently() {
        let db = Database::open_in_memory().unwrap();
        let me = user(&db, "me");
        let anna = user(&db, "anna");

        db.insert_message(&Message::new(anna, me, "hello".into(), None))
            .unwrap();
        db.insert_message(&Message::new(anna, me, "again".into(), None))
            .unwrap();
        assert!(db.has_unread(me).unwrap());

        let threads = inbox(&db, me).unwrap();
        assert_eq!(threads.len(), 1);
        assert!(!db.has_unread(me).unwrap());
        assert!(threads[0].latest.read);

        // Second view is a no-op on read state and returns the same threads.
        let again = inbox(&db, me).unwrap();
        assert_eq!(again.len(), 1);
        assert!(!db.has_unread(me).unwrap());
    }

    #[test]
    fn conversation_is_chronological_and_two_way() {
        let db = Database::open_in_memory().unwrap();
        let me = user(&db, "me");
        let anna = user(&db, "anna");
        let ben = user(&db, "ben");

        db.insert_message(&message_at(me, anna, 30)).unwrap();
        db.insert_message(&message_at(anna, me, 20)).unwrap();
        db.insert_message(&message_at(me, ben, 10)).unwrap();

        let conv = conversation(&db, me, anna).unwrap();
        assert_eq!(conv.len(), 2);
        assert!(conv[0].created_at <= conv[1].created_at);
        assert_eq!(conv[0].receiver, anna);
    }

    #[test]
    fn self_conversation_is_invalid_input() {
        let db = Database::open_in_memory().unwrap();
        let me = user(&db, "me");
        let err = conversation(&db, me, me).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }
}
