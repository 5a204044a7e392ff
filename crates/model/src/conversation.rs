use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Message;

const TITLE_MAX_CHARS: usize = 30;
const TITLE_ELLIPSIS: &str = "...";

/// Opaque identifier of a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Allocates a fresh random id.
    #[inline]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the id as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ConversationId {
    #[inline]
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ConversationId {
    #[inline]
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A titled conversation: what the user sees plus what the backend sees.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    id: ConversationId,
    #[serde(default)]
    title: String,
    #[serde(rename = "messages")]
    display_messages: Vec<Message>,
    #[serde(rename = "conversationHistory")]
    history_messages: Vec<Message>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
}

impl Conversation {
    /// Creates an empty conversation with a fresh id.
    #[inline]
    pub fn new() -> Self {
        Self::with_id(ConversationId::generate())
    }

    /// Creates an empty conversation with the given id.
    #[inline]
    pub fn with_id(id: ConversationId) -> Self {
        Self {
            id,
            title: String::new(),
            display_messages: vec![],
            history_messages: vec![],
            created_at: Utc::now(),
        }
    }

    /// Returns the id.
    #[inline]
    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    /// Returns the title, which is empty until the first message arrives.
    #[inline]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the time this conversation was created.
    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the user-visible messages.
    #[inline]
    pub fn display_messages(&self) -> &[Message] {
        &self.display_messages
    }

    /// Returns the sanitized backend-facing history.
    #[inline]
    pub fn history_messages(&self) -> &[Message] {
        &self.history_messages
    }

    /// Returns `true` if nothing has been displayed yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.display_messages.is_empty()
    }

    /// Appends a display message. The first one fixes the title.
    pub fn push_display(&mut self, msg: Message) {
        if self.display_messages.is_empty() && self.title.is_empty() {
            self.title = derive_title(msg.plain_text());
        }
        self.display_messages.push(msg);
    }

    /// Appends a user/assistant pair to the history.
    #[inline]
    pub fn push_history_pair(&mut self, user: Message, assistant: Message) {
        self.history_messages.push(user);
        self.history_messages.push(assistant);
    }

    /// Replaces the messages and history with those of `other`, keeping
    /// the id, title and creation time of `self`.
    pub fn replace_contents(&mut self, other: &Conversation) {
        self.display_messages.clone_from(&other.display_messages);
        self.history_messages.clone_from(&other.history_messages);
        if self.title.is_empty() {
            self.title.clone_from(&other.title);
        }
    }

    /// Returns a short description for listings.
    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            message_count: self.display_messages.len(),
        }
    }
}

impl Default for Conversation {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// A lightweight view of an archived conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationSummary {
    /// The conversation id.
    pub id: ConversationId,
    /// The conversation title.
    pub title: String,
    /// When the conversation was created.
    pub created_at: DateTime<Utc>,
    /// How many display messages it has.
    pub message_count: usize,
}

/// Derives a conversation title from the text of its first message.
pub fn derive_title(text: &str) -> String {
    let mut chars = text.chars();
    let mut title: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        title.push_str(TITLE_ELLIPSIS);
    }
    title
}

/// Every saved conversation, most recent first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Archive {
    conversations: Vec<Conversation>,
}

impl Archive {
    /// Returns the number of saved conversations.
    #[inline]
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    /// Returns `true` if nothing is saved.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Iterates over conversations, most recent first.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Conversation> {
        self.conversations.iter()
    }

    /// Looks up a conversation.
    #[inline]
    pub fn get(&self, id: &ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| &c.id == id)
    }

    /// Looks up a conversation for mutation.
    #[inline]
    pub fn get_mut(&mut self, id: &ConversationId) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| &c.id == id)
    }

    /// Inserts or refreshes a conversation.
    ///
    /// An existing entry with the same id keeps its position and metadata
    /// and only gets its messages replaced; otherwise the conversation is
    /// inserted at the head. Empty conversations are never stored, and
    /// `false` is returned for them.
    pub fn upsert(&mut self, conversation: &Conversation) -> bool {
        if conversation.is_empty() {
            return false;
        }
        match self.get_mut(&conversation.id) {
            Some(existing) => existing.replace_contents(conversation),
            None => self.conversations.insert(0, conversation.clone()),
        }
        true
    }

    /// Removes a conversation, returning it if it existed.
    pub fn remove(&mut self, id: &ConversationId) -> Option<Conversation> {
        let idx = self.conversations.iter().position(|c| &c.id == id)?;
        Some(self.conversations.remove(idx))
    }

    /// Removes every conversation.
    #[inline]
    pub fn clear(&mut self) {
        self.conversations.clear();
    }
}

impl FromIterator<Conversation> for Archive {
    fn from_iter<I: IntoIterator<Item = Conversation>>(iter: I) -> Self {
        Self {
            conversations: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_derive_title() {
        assert_eq!(derive_title("hello"), "hello");
        let exact = "a".repeat(30);
        assert_eq!(derive_title(&exact), exact);
        let long = "abcdefghijklmnopqrstuvwxyz0123456789";
        assert_eq!(derive_title(long), "abcdefghijklmnopqrstuvwxyz0123...");
        // Counted in characters, not bytes.
        let accented = "é".repeat(31);
        assert_eq!(derive_title(&accented), format!("{}...", "é".repeat(30)));
    }

    #[test]
    fn test_title_is_fixed_by_first_message() {
        let mut conversation = Conversation::new();
        assert_eq!(conversation.title(), "");
        conversation.push_display(Message::user("first"));
        conversation.push_display(Message::assistant("second"));
        assert_eq!(conversation.title(), "first");
    }

    #[test]
    fn test_upsert() {
        let mut archive = Archive::default();
        let mut a = Conversation::new();
        assert!(!archive.upsert(&a));
        assert!(archive.is_empty());

        a.push_display(Message::user("a"));
        assert!(archive.upsert(&a));
        let mut b = Conversation::new();
        b.push_display(Message::user("b"));
        archive.upsert(&b);
        assert_eq!(
            archive.iter().map(Conversation::title).collect::<Vec<_>>(),
            ["b", "a"]
        );

        // Refreshing keeps the position.
        a.push_display(Message::assistant("reply"));
        archive.upsert(&a);
        assert_eq!(archive.len(), 2);
        let stored = archive.iter().nth(1).unwrap();
        assert_eq!(stored.id(), a.id());
        assert_eq!(stored.display_messages().len(), 2);
    }

    #[test]
    fn test_remove() {
        let mut archive = Archive::default();
        let mut a = Conversation::new();
        a.push_display(Message::user("a"));
        archive.upsert(&a);
        assert!(archive.remove(&ConversationId::from("missing")).is_none());
        assert_eq!(archive.remove(a.id()).unwrap().title(), "a");
        assert!(archive.is_empty());
    }

    #[test]
    fn test_read_stored_archive() {
        let archive: Archive = serde_json::from_value(json!([
            {
                "id": "1706353200000",
                "title": "hola",
                "messages": [
                    { "role": "user", "content": "hola", "timestamp": 1706353200000_i64 },
                    { "role": "assistant", "content": "¡Hola!", "timestamp": 1706353201000_i64 }
                ],
                "conversationHistory": [
                    { "role": "user", "content": "hola" },
                    { "role": "assistant", "content": "¡Hola!", "timestamp": 1706353201000_i64 }
                ],
                "createdAt": 1706353202000_i64
            }
        ]))
        .unwrap();
        let conversation = archive.get(&"1706353200000".into()).unwrap();
        assert_eq!(conversation.title(), "hola");
        assert_eq!(conversation.display_messages().len(), 2);
        assert_eq!(conversation.history_messages().len(), 2);
    }
}
