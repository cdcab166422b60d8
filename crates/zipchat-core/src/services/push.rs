use async_trait::async_trait;

use crate::error::ChatError;

/// Client handle to the external push-messaging service. The core only
/// registers for background delivery at startup; message content never
/// flows through here.
#[async_trait]
pub trait PushMessagingService: Send + Sync {
    async fn register(&self, sender_id: &str) -> Result<(), ChatError>;
}
