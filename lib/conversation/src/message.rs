//! Message types for session transcripts.

use adpipe_core::MessageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message typed by the user.
    User,
    /// Message produced by the pipeline.
    Agent,
}

/// A message in a session transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// Message role.
    pub role: MessageRole,
    /// Message content.
    pub content: String,
    /// When the message was created.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a new message.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Creates an agent message.
    #[must_use]
    pub fn agent(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Agent, content)
    }
}

/// An append-only, ordered sequence of messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript(Vec<Message>);

impl Transcript {
    /// Creates an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a message.
    pub fn push(&mut self, message: Message) {
        self.0.push(message);
    }

    /// Returns the number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing has been said yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the last message, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.0.last()
    }

    /// Returns the most recent message typed by the user.
    #[must_use]
    pub fn last_user_message(&self) -> Option<&Message> {
        self.0.iter().rev().find(|m| m.role == MessageRole::User)
    }

    /// Iterates over messages in order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.0.iter()
    }

    /// Returns the messages as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Message] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_constructors_set_role() {
        assert_eq!(Message::user("hi").role, MessageRole::User);
        assert_eq!(Message::agent("hello").role, MessageRole::Agent);
    }

    #[test]
    fn transcript_keeps_order() {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("first"));
        transcript.push(Message::agent("second"));
        transcript.push(Message::user("third"));

        let contents: Vec<_> = transcript.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["first", "second", "third"]);
        assert_eq!(transcript.len(), 3);
    }

    #[test]
    fn last_user_message_skips_agent_replies() {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("make it funnier"));
        transcript.push(Message::agent("Regenerated 3 scripts."));

        assert_eq!(
            transcript.last_user_message().map(|m| m.content.as_str()),
            Some("make it funnier")
        );
        assert_eq!(transcript.last().map(|m| m.role), Some(MessageRole::Agent));
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&MessageRole::Agent).expect("serialize");
        assert_eq!(json, "\"agent\"");
    }

    #[test]
    fn transcript_serializes_as_array() {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("Test"));

        let json = serde_json::to_value(&transcript).expect("serialize");
        assert!(json.is_array());

        let parsed: Transcript = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, transcript);
    }
}
