use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::ChatError;
use crate::models::UserInfo;

/// Interactive identity providers the gate can delegate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Google,
}

/// Client handle to the external identity provider.
///
/// `watch` observes every transition, starting with the current state.
/// `sign_in` is the interactive (popup-style) flow; its completion also
/// surfaces through the watch channel.
#[async_trait]
pub trait IdentityService: Send + Sync {
    fn current_user(&self) -> Option<UserInfo>;

    fn watch(&self) -> watch::Receiver<Option<UserInfo>>;

    async fn sign_in(&self, provider: ProviderKind) -> Result<UserInfo, ChatError>;

    async fn sign_out(&self) -> Result<(), ChatError>;
}
