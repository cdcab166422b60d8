//! External collaborators consumed by the sync core.
//!
//! Identity, realtime store, blob store and push messaging are never
//! implemented here; they are reached through these trait handles, injected
//! at runtime construction. `memory` provides in-process implementations
//! for the sandbox CLI and the test-suite.

pub mod blob;
pub mod identity;
pub mod memory;
pub mod push;
pub mod realtime;

use std::sync::Arc;

use crate::error::ChatError;

pub use blob::{BlobMetadata, BlobService};
pub use identity::{IdentityService, ProviderKind};
pub use push::PushMessagingService;
pub use realtime::{
    ChangeKind, ChangeRecord, PushHandle, QuerySpec, RangeBound, RealtimeStore, Subscription,
    SubscriptionGuard,
};

/// Bundle of service handles passed into the runtime at construction.
#[derive(Clone)]
pub struct Services {
    pub identity: Arc<dyn IdentityService>,
    pub store: Arc<dyn RealtimeStore>,
    pub blobs: Arc<dyn BlobService>,
    pub push: Arc<dyn PushMessagingService>,
}

impl Services {
    /// Verifies the injected handles are usable before anything runs.
    pub fn check_setup(&self) -> Result<(), ChatError> {
        if self.blobs.bucket().is_empty() {
            return Err(ChatError::Setup(
                "blob storage bucket is not configured".to_string(),
            ));
        }
        Ok(())
    }
}
