use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{lenient, Property, Resource, User};
use crate::error::ValidationError;
use crate::sync::ParentScope;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "Message_ID", default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "Sender_ID", default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<i64>,
    #[serde(rename = "Receiver_ID", default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<i64>,
    #[serde(rename = "Property_ID", default, deserialize_with = "lenient::opt_i64", skip_serializing_if = "Option::is_none")]
    pub property_id: Option<i64>,
    #[serde(rename = "Message_Text", default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "Message_Read_At", default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<String>,
    #[serde(rename = "Message_CreatedAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(rename = "Message_UpdatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(rename = "Message_DeletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Box<User>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Box<User>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<Box<Property>>,
}

impl Message {
    /// Creation time; unparseable or missing timestamps sort first.
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        let text = self.created_at.as_deref()?;
        DateTime::parse_from_rfc3339(text)
            .map(|t| t.with_timezone(&Utc))
            .or_else(|_| {
                NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").map(|t| t.and_utc())
            })
            .ok()
    }

    /// The other participant as seen from `user_id`.
    pub fn counterpart(&self, user_id: i64) -> Option<i64> {
        if self.sender_id == Some(user_id) {
            self.receiver_id
        } else if self.receiver_id == Some(user_id) {
            self.sender_id
        } else {
            None
        }
    }

    pub fn involves(&self, user_id: i64) -> bool {
        self.sender_id == Some(user_id) || self.receiver_id == Some(user_id)
    }
}

impl Resource for Message {
    const TABLE: &'static str = "messages";

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let mut problems = Vec::new();
        if self.text.as_deref().map_or(true, |t| t.trim().is_empty()) {
            problems.push("Message text is required.".to_string());
        }
        match (self.sender_id, self.receiver_id) {
            (Some(sender), Some(receiver)) if sender == receiver => {
                problems.push("Sender and receiver must be different users.".to_string())
            }
            (Some(_), Some(_)) => {}
            _ => problems.push("Sender and receiver are required.".to_string()),
        }
        ValidationError::check(problems)
    }

    fn parent_scope() -> Option<ParentScope> {
        Some(ParentScope::any("users", &["Sender_ID", "Receiver_ID"]))
    }
}

/// All messages exchanged with one counterpart about one listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub counterpart_id: i64,
    pub property_id: Option<i64>,
    /// Oldest first
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

fn by_sent_at(a: &Message, b: &Message) -> std::cmp::Ordering {
    a.sent_at().cmp(&b.sent_at()).then(a.id.cmp(&b.id))
}

/// Group `user_id`'s messages by `{counterpart, property}`, most recent
/// conversation first.
pub fn group_conversations(messages: &[Message], user_id: i64) -> Vec<Conversation> {
    let mut groups: BTreeMap<(i64, Option<i64>), Vec<Message>> = BTreeMap::new();
    for message in messages {
        if let Some(counterpart) = message.counterpart(user_id) {
            groups
                .entry((counterpart, message.property_id))
                .or_default()
                .push(message.clone());
        }
    }

    let mut conversations: Vec<Conversation> = groups
        .into_iter()
        .map(|((counterpart_id, property_id), mut messages)| {
            messages.sort_by(by_sent_at);
            Conversation {
                counterpart_id,
                property_id,
                messages,
            }
        })
        .collect();

    conversations.sort_by(|a, b| match (a.last_message(), b.last_message()) {
        (Some(x), Some(y)) => by_sent_at(y, x),
        _ => std::cmp::Ordering::Equal,
    });
    conversations
}

/// Messages where `counterpart` is sender or receiver, about `property_id`,
/// oldest first.
pub fn conversation_with(messages: &[Message], counterpart: i64, property_id: i64) -> Vec<&Message> {
    let mut thread: Vec<&Message> = messages
        .iter()
        .filter(|m| m.involves(counterpart) && m.property_id == Some(property_id))
        .collect();
    thread.sort_by(|a, b| by_sent_at(a, b));
    thread
}
