use async_trait::async_trait;

use crate::error::ChatError;

#[derive(Debug, Clone)]
pub struct BlobMetadata {
    /// Path of the stored object within the bucket.
    pub full_path: String,
}

/// Client handle to the external blob store.
#[async_trait]
pub trait BlobService: Send + Sync {
    /// Configured bucket name; empty means the store was never set up.
    fn bucket(&self) -> String;

    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<BlobMetadata, ChatError>;

    /// Opaque `gs://`-style locator for a stored path.
    fn locator_for(&self, full_path: &str) -> String;

    /// Fetchable download URLs for an indirect locator.
    async fn fetch_metadata(&self, locator: &str) -> Result<Vec<String>, ChatError>;
}
