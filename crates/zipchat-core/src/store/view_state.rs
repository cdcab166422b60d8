//! Retained view model the reconciliation engine writes into.
//!
//! One stable node per entity id, per projection, for the lifetime of the
//! session. Nodes are only ever appended; the bindings map records which
//! list slot an id landed in, so repeated change records for the same id
//! update in place instead of re-creating.

use std::collections::HashMap;

use crate::constants::PROFILE_PLACEHOLDER_URL;
use crate::models::UserInfo;

/// Identity key of a UI node. Keys are namespaced by projection: a message
/// and its derived gallery entry share an entity id but never a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Message(String),
    Event(String),
    Contact(String),
}

/// Image-bearing slot within a node that an asynchronous URL resolution can
/// patch later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    AuthorPhoto,
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Empty,
    /// Rendered text, one entry per line. Re-derived from the source text
    /// on every update, so repeated updates never accumulate markup.
    Text { lines: Vec<String> },
    Image { src: String, caption: Option<String> },
}

#[derive(Debug, Clone)]
pub struct MessageNode {
    pub entity_id: String,
    pub author_name: String,
    pub author_photo: Option<String>,
    pub body: MessageBody,
    /// Set once populated; supports the fade-in transition.
    pub visible: bool,
}

#[derive(Debug, Clone)]
pub struct EventNode {
    pub entity_id: String,
    pub author_name: String,
    pub author_photo: Option<String>,
    pub image_src: String,
    pub caption: Option<String>,
    pub visible: bool,
}

#[derive(Debug, Clone)]
pub struct ContactNode {
    pub entity_id: String,
    pub name: String,
    pub address: String,
    pub phone: String,
}

/// Profile block shown while signed in; `None` shows the sign-in button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub photo_url: String,
}

#[derive(Default)]
pub struct ViewState {
    pub messages: Vec<MessageNode>,
    pub events: Vec<EventNode>,
    pub contacts: Vec<ContactNode>,
    pub profile: Option<Profile>,
    bindings: HashMap<NodeKey, usize>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a key is bound to, if a node exists for it. Exposed so tests
    /// can verify update-in-place by node identity.
    pub fn binding(&self, key: &NodeKey) -> Option<usize> {
        self.bindings.get(key).copied()
    }

    pub fn message_by_id(&self, id: &str) -> Option<&MessageNode> {
        self.binding(&NodeKey::Message(id.to_string()))
            .map(|idx| &self.messages[idx])
    }

    pub fn event_by_id(&self, id: &str) -> Option<&EventNode> {
        self.binding(&NodeKey::Event(id.to_string()))
            .map(|idx| &self.events[idx])
    }

    pub fn contact_by_id(&self, id: &str) -> Option<&ContactNode> {
        self.binding(&NodeKey::Contact(id.to_string()))
            .map(|idx| &self.contacts[idx])
    }

    /// Looks up the message node for `id`, instantiating one from the
    /// template (hidden, empty) and appending it on first sight.
    pub(crate) fn ensure_message(&mut self, id: &str) -> usize {
        let key = NodeKey::Message(id.to_string());
        if let Some(idx) = self.bindings.get(&key) {
            return *idx;
        }
        self.messages.push(MessageNode {
            entity_id: id.to_string(),
            author_name: String::new(),
            author_photo: None,
            body: MessageBody::Empty,
            visible: false,
        });
        let idx = self.messages.len() - 1;
        self.bindings.insert(key, idx);
        idx
    }

    pub(crate) fn ensure_event(&mut self, id: &str) -> usize {
        let key = NodeKey::Event(id.to_string());
        if let Some(idx) = self.bindings.get(&key) {
            return *idx;
        }
        self.events.push(EventNode {
            entity_id: id.to_string(),
            author_name: String::new(),
            author_photo: None,
            image_src: String::new(),
            caption: None,
            visible: false,
        });
        let idx = self.events.len() - 1;
        self.bindings.insert(key, idx);
        idx
    }

    pub(crate) fn ensure_contact(&mut self, id: &str) -> usize {
        let key = NodeKey::Contact(id.to_string());
        if let Some(idx) = self.bindings.get(&key) {
            return *idx;
        }
        self.contacts.push(ContactNode {
            entity_id: id.to_string(),
            name: String::new(),
            address: String::new(),
            phone: String::new(),
        });
        let idx = self.contacts.len() - 1;
        self.bindings.insert(key, idx);
        idx
    }

    /// Reveals or hides the profile block on an auth transition.
    pub(crate) fn set_profile(&mut self, user: Option<&UserInfo>) {
        self.profile = user.map(|user| Profile {
            name: user.display_name.clone(),
            photo_url: user
                .photo_url
                .clone()
                .unwrap_or_else(|| PROFILE_PLACEHOLDER_URL.to_string()),
        });
    }
}
