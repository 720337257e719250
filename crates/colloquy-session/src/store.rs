//! Ordered, append-mostly log of finalized messages for one session.
//!
//! `truncate_from` is the only way history shrinks, so edit, regenerate and
//! delete can never strand an assistant reply without the user message it
//! answers. Every mutation bumps `revision`, which derived state uses to
//! know it is stale.

use colloquy_common::MessageId;

use crate::message::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("index {index} is out of bounds for {len} messages")]
pub struct OutOfBounds {
    pub index: usize,
    pub len: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    revision: u64,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            revision: 0,
        }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.revision += 1;
    }

    /// Drop everything from `index` on and put `messages` in its place.
    pub fn replace_from(&mut self, index: usize, messages: Vec<Message>) -> Result<(), OutOfBounds> {
        if index > self.messages.len() {
            return Err(OutOfBounds {
                index,
                len: self.messages.len(),
            });
        }
        self.messages.truncate(index);
        self.messages.extend(messages);
        self.revision += 1;
        Ok(())
    }

    /// Remove every message at or after `index`, returning what was removed.
    /// Past-the-end indices remove nothing.
    pub fn truncate_from(&mut self, index: usize) -> Vec<Message> {
        if index >= self.messages.len() {
            return Vec::new();
        }
        let removed = self.messages.split_off(index);
        self.revision += 1;
        removed
    }

    pub fn set_content(&mut self, index: usize, content: String) -> Result<(), OutOfBounds> {
        let len = self.messages.len();
        let message = self
            .messages
            .get_mut(index)
            .ok_or(OutOfBounds { index, len })?;
        message.content = content;
        self.revision += 1;
        Ok(())
    }

    pub fn get(&self) -> &[Message] {
        &self.messages
    }

    pub fn at(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn position(&self, id: &MessageId) -> Option<usize> {
        self.messages.iter().position(|m| &m.id == id)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    fn conversation(pairs: usize) -> MessageStore {
        let mut store = MessageStore::new();
        for i in 0..pairs {
            store.append(Message::user(format!("q{i}")));
            store.append(Message::assistant(format!("a{i}")));
        }
        store
    }

    fn no_orphans(store: &MessageStore) -> bool {
        store.get().iter().enumerate().all(|(i, m)| {
            m.role != Role::Assistant || (i > 0 && store.get()[i - 1].role == Role::User)
        })
    }

    #[test]
    fn append_preserves_insertion_order() {
        let store = conversation(2);
        let contents: Vec<_> = store.get().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["q0", "a0", "q1", "a1"]);
    }

    #[test]
    fn truncate_from_removes_tail() {
        let mut store = conversation(3);
        let removed = store.truncate_from(2);
        assert_eq!(removed.len(), 4);
        assert_eq!(store.len(), 2);
        assert_eq!(removed[0].content, "q1");
    }

    #[test]
    fn truncate_past_end_is_noop() {
        let mut store = conversation(1);
        let rev = store.revision();
        assert!(store.truncate_from(5).is_empty());
        assert_eq!(store.len(), 2);
        assert_eq!(store.revision(), rev);
    }

    #[test]
    fn truncation_never_orphans_assistant_replies() {
        // Every truncation point of every prefix of a well-formed history.
        for pairs in 0..4 {
            for a in 0..=pairs * 2 {
                for b in 0..=pairs * 2 {
                    let mut store = conversation(pairs);
                    store.truncate_from(a);
                    store.truncate_from(b);
                    assert!(no_orphans(&store), "pairs={pairs} a={a} b={b}");
                }
            }
        }
    }

    #[test]
    fn replace_from_swaps_tail() {
        let mut store = conversation(2);
        store
            .replace_from(2, vec![Message::user("other")])
            .unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.get()[2].content, "other");
    }

    #[test]
    fn replace_from_rejects_gap() {
        let mut store = conversation(1);
        let err = store.replace_from(3, Vec::new()).unwrap_err();
        assert_eq!(err, OutOfBounds { index: 3, len: 2 });
    }

    #[test]
    fn every_mutation_bumps_revision() {
        let mut store = MessageStore::new();
        assert_eq!(store.revision(), 0);
        store.append(Message::user("a"));
        store.set_content(0, "b".into()).unwrap();
        store.replace_from(1, vec![Message::assistant("c")]).unwrap();
        store.truncate_from(1);
        assert_eq!(store.revision(), 4);
    }

    #[test]
    fn position_finds_by_id() {
        let store = conversation(2);
        let id = store.get()[3].id.clone();
        assert_eq!(store.position(&id), Some(3));
        assert_eq!(store.position(&MessageId::from("missing")), None);
    }
}
