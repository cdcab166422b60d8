use std::time::Duration;

use crate::constants::{CONTACTS_TAIL_LIMIT, MESSAGES_TAIL_LIMIT};
use crate::locality::LocalityKey;

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Postal code scoping this session's feeds and writes.
    pub locality: LocalityKey,
    /// Tail limit for the message feed.
    pub messages_limit: u32,
    /// Tail limit for the contact feed.
    pub contacts_limit: u32,
    /// Retry/timeout policy for image uploads.
    pub upload: UploadPolicy,
}

impl CoreConfig {
    pub fn new(locality: LocalityKey) -> Self {
        Self {
            locality,
            messages_limit: MESSAGES_TAIL_LIMIT,
            contacts_limit: CONTACTS_TAIL_LIMIT,
            upload: UploadPolicy::default(),
        }
    }
}

/// How hard the upload coordinator tries before giving up.
///
/// The default matches the source behavior: one attempt, no deadline, and a
/// failed upload leaves the placeholder message in place indefinitely.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Total attempts per upload. Must be at least 1.
    pub attempts: u32,
    /// Per-attempt deadline. `None` waits as long as the blob store does.
    pub timeout: Option<Duration>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            timeout: None,
        }
    }
}
