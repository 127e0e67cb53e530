use std::collections::HashSet;

use tracing::warn;
use uibuilder_core::Message;

/// Ordered messages of the active session. Ids are unique within the list.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list with a fetched history.
    pub fn replace(&mut self, messages: Vec<Message>) {
        let mut seen = HashSet::with_capacity(messages.len());
        self.messages = messages
            .into_iter()
            .filter(|m| {
                let fresh = seen.insert(m.id.clone());
                if !fresh {
                    warn!(message_id = %m.id, "Dropping duplicate message from fetched history");
                }
                fresh
            })
            .collect();
    }

    /// Append unless a message with the same id is already present.
    pub fn push(&mut self, message: Message) -> bool {
        if self.contains(&message.id) {
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn remove(&mut self, message_id: &str) -> Option<Message> {
        let index = self.messages.iter().position(|m| m.id == message_id)?;
        Some(self.messages.remove(index))
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn get(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.get(message_id).is_some()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
