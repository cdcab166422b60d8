use std::sync::Arc;

use tokio::sync::watch;

use crate::error::ChatError;
use crate::models::UserInfo;
use crate::services::{IdentityService, ProviderKind};

/// Gates every write path on the identity provider's current state.
#[derive(Clone)]
pub struct IdentityGate {
    identity: Arc<dyn IdentityService>,
}

impl IdentityGate {
    pub fn new(identity: Arc<dyn IdentityService>) -> Self {
        Self { identity }
    }

    pub fn current_user(&self) -> Option<UserInfo> {
        self.identity.current_user()
    }

    /// The signed-in user, or the rejection every write surfaces as a
    /// transient notice.
    pub fn require_user(&self) -> Result<UserInfo, ChatError> {
        self.identity.current_user().ok_or(ChatError::Unauthenticated)
    }

    pub fn watch(&self) -> watch::Receiver<Option<UserInfo>> {
        self.identity.watch()
    }

    pub async fn sign_in(&self) -> Result<UserInfo, ChatError> {
        self.identity.sign_in(ProviderKind::Google).await
    }

    pub async fn sign_out(&self) -> Result<(), ChatError> {
        self.identity.sign_out().await
    }
}
