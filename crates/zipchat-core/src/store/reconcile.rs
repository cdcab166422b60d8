//! Maps delivered change records onto idempotent view-node updates.
//!
//! First sight of an entity id creates its node; every later change record
//! for the same id updates that node in place. The engine runs on the
//! thread that drains the data channel; nothing else touches the view
//! state.

use tracing::warn;

use crate::constants::LOADING_IMAGE_URL;
use crate::events::UiEvent;
use crate::models::{Contact, Message, UserInfo};
use crate::sync::resolver::{self, Resolution};

use super::view_state::{ImageSlot, MessageBody, NodeKey, ViewState};

/// An indirect locator the engine wants resolved for a node slot. Drained
/// by the runtime and handed to the sync worker.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub target: NodeKey,
    pub slot: ImageSlot,
    pub locator: String,
}

#[derive(Default)]
pub struct Reconciler {
    view: ViewState,
    pending_resolutions: Vec<ResolveRequest>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Indirect references discovered since the last drain.
    pub fn drain_pending_resolutions(&mut self) -> Vec<ResolveRequest> {
        std::mem::take(&mut self.pending_resolutions)
    }

    pub fn apply_auth_state(&mut self, user: Option<&UserInfo>) {
        self.view.set_profile(user);
    }

    /// Classifies an image reference for a node slot: direct URLs are used
    /// as-is, indirect locators display the sentinel and queue a fetch.
    fn displayable_url(&mut self, target: NodeKey, slot: ImageSlot, reference: &str) -> String {
        match resolver::classify(reference) {
            Resolution::Direct(url) => url,
            Resolution::Indirect { locator } => {
                self.pending_resolutions.push(ResolveRequest {
                    target,
                    slot,
                    locator,
                });
                LOADING_IMAGE_URL.to_string()
            }
        }
    }

    pub fn apply_message_change(&mut self, message: &Message, events: &mut Vec<UiEvent>) {
        let record = &message.record;
        let id = &message.id;

        let author_photo = (!record.photo_url.is_empty()).then(|| {
            self.displayable_url(
                NodeKey::Message(id.clone()),
                ImageSlot::AuthorPhoto,
                &record.photo_url,
            )
        });
        // Exactly one rendering: text wins only when no image is present.
        let body = match (&record.text, &record.image_url) {
            (Some(text), None) => Some(MessageBody::Text {
                lines: text.split('\n').map(str::to_string).collect(),
            }),
            (_, Some(image)) => {
                let src =
                    self.displayable_url(NodeKey::Message(id.clone()), ImageSlot::Image, image);
                Some(MessageBody::Image {
                    src,
                    caption: record.text.clone(),
                })
            }
            (None, None) => None,
        };

        let idx = self.view.ensure_message(id);
        let node = &mut self.view.messages[idx];
        if let Some(photo) = author_photo {
            node.author_photo = Some(photo);
        }
        node.author_name = record.name.clone();
        if let Some(body) = body {
            node.body = body;
        }
        node.visible = true;

        // Scrolling happens on every applied change, not just image loads;
        // loads complete asynchronously and scroll again via resolution.
        events.push(UiEvent::ScrollMessagesToBottom);
        events.push(UiEvent::FocusCompose);

        if message.is_image_bearing() {
            self.project_event(message, events);
        }
    }

    /// Gallery projection of an image-bearing message. Keys are namespaced
    /// per projection, so repeated changes to one message update one
    /// gallery entry.
    fn project_event(&mut self, message: &Message, events: &mut Vec<UiEvent>) {
        let record = &message.record;
        let id = &message.id;

        let author_photo = (!record.photo_url.is_empty()).then(|| {
            self.displayable_url(
                NodeKey::Event(id.clone()),
                ImageSlot::AuthorPhoto,
                &record.photo_url,
            )
        });
        let image_src = record.image_url.as_ref().map(|image| {
            self.displayable_url(NodeKey::Event(id.clone()), ImageSlot::Image, image)
        });

        let idx = self.view.ensure_event(id);
        let node = &mut self.view.events[idx];
        if let Some(photo) = author_photo {
            node.author_photo = Some(photo);
        }
        node.author_name = record.name.clone();
        if let Some(src) = image_src {
            node.image_src = src;
        }
        node.caption = record.text.clone();
        node.visible = true;

        events.push(UiEvent::ScrollEventsToBottom);
    }

    pub fn apply_contact_change(&mut self, contact: &Contact) {
        let idx = self.view.ensure_contact(&contact.id);
        let node = &mut self.view.contacts[idx];
        node.name = contact.record.name.clone();
        node.address = contact.record.address.clone();
        node.phone = contact.record.phone.clone();
    }

    /// Applies a completed URL resolution to the slot it was requested for.
    /// Invoked at most once per request; a resolution for a node that never
    /// materialized is dropped.
    pub fn apply_resolution(
        &mut self,
        target: &NodeKey,
        slot: ImageSlot,
        url: &str,
        events: &mut Vec<UiEvent>,
    ) {
        let Some(idx) = self.view.binding(target) else {
            warn!(?target, "resolution for unknown node dropped");
            return;
        };
        match (target, slot) {
            (NodeKey::Message(_), ImageSlot::AuthorPhoto) => {
                self.view.messages[idx].author_photo = Some(url.to_string());
            }
            (NodeKey::Message(_), ImageSlot::Image) => {
                if let MessageBody::Image { src, .. } = &mut self.view.messages[idx].body {
                    *src = url.to_string();
                }
                // The image becoming displayable is the load-completion
                // analog: keep the list pinned to the bottom.
                events.push(UiEvent::ScrollMessagesToBottom);
            }
            (NodeKey::Event(_), ImageSlot::AuthorPhoto) => {
                self.view.events[idx].author_photo = Some(url.to_string());
            }
            (NodeKey::Event(_), ImageSlot::Image) => {
                self.view.events[idx].image_src = url.to_string();
            }
            (NodeKey::Contact(_), _) => {}
        }
    }
}
