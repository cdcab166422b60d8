//! Two-phase optimistic image sends.
//!
//! Phase 1 pushes a message whose `imageUrl` is the loading sentinel, so
//! the feed renders a placeholder immediately. Phase 2 uploads the bytes
//! and patches that one field with the final storage locator; the patch
//! comes back to the reconciler as an ordinary `Changed` delivery. A
//! failed upload leaves the placeholder in place.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::warn;

use crate::config::UploadPolicy;
use crate::constants::{LOADING_IMAGE_URL, MESSAGES_PARTITION, PROFILE_PLACEHOLDER_URL};
use crate::error::ChatError;
use crate::locality::LocalityKey;
use crate::models::{MessageRecord, UserInfo};
use crate::services::{BlobMetadata, BlobService, RealtimeStore};

/// An image picked for sending: declared media type plus raw bytes.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub fn validate_media_type(content_type: &str) -> Result<(), ChatError> {
    if content_type.starts_with("image/") {
        Ok(())
    } else {
        Err(ChatError::Validation(format!(
            "unsupported media type {content_type:?}"
        )))
    }
}

/// An acked phase-1 placeholder, waiting for its upload to finish.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub message_key: String,
    pub path: String,
    pub content_type: String,
}

pub struct UploadCoordinator {
    store: Arc<dyn RealtimeStore>,
    blobs: Arc<dyn BlobService>,
    policy: UploadPolicy,
}

impl UploadCoordinator {
    pub fn new(
        store: Arc<dyn RealtimeStore>,
        blobs: Arc<dyn BlobService>,
        policy: UploadPolicy,
    ) -> Self {
        Self {
            store,
            blobs,
            policy,
        }
    }

    /// Phase 1: pushes the placeholder message and derives the storage
    /// path. The path namespaces by author and send time; it is not a
    /// content address.
    pub async fn begin(
        &self,
        user: &UserInfo,
        locality: &LocalityKey,
        file: &ImageFile,
        caption: Option<String>,
    ) -> Result<PendingUpload, ChatError> {
        validate_media_type(&file.content_type)?;

        let now_ms = Utc::now().timestamp_millis();
        let record = MessageRecord {
            name: user.display_name.clone(),
            text: caption,
            photo_url: user
                .photo_url
                .clone()
                .unwrap_or_else(|| PROFILE_PLACEHOLDER_URL.to_string()),
            image_url: Some(LOADING_IMAGE_URL.to_string()),
            postal_code: locality.as_str().to_string(),
            time: Some(now_ms),
        };
        let value = serde_json::to_value(&record).map_err(|e| ChatError::Write(e.to_string()))?;
        let handle = self.store.push(MESSAGES_PARTITION, value).await?;

        Ok(PendingUpload {
            message_key: handle.key,
            path: format!("{}/{}/{}", user.id, now_ms, file.name),
            content_type: file.content_type.clone(),
        })
    }

    /// Phase 2: uploads the bytes and patches the message's `imageUrl`
    /// with the final locator. Nothing else on the record is touched.
    pub async fn finish(&self, pending: &PendingUpload, bytes: &[u8]) -> Result<(), ChatError> {
        let metadata = self.put_with_policy(pending, bytes).await?;
        let locator = self.blobs.locator_for(&metadata.full_path);
        self.store
            .update(
                MESSAGES_PARTITION,
                &pending.message_key,
                json!({ "imageUrl": locator }),
            )
            .await
    }

    async fn put_with_policy(
        &self,
        pending: &PendingUpload,
        bytes: &[u8],
    ) -> Result<BlobMetadata, ChatError> {
        let attempts = self.policy.attempts.max(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            let put = self.blobs.put(&pending.path, bytes, &pending.content_type);
            let result = match self.policy.timeout {
                Some(deadline) => match tokio::time::timeout(deadline, put).await {
                    Ok(result) => result,
                    Err(_) => Err(ChatError::Upload(format!(
                        "attempt {attempt} exceeded {deadline:?}"
                    ))),
                },
                None => put.await,
            };
            match result {
                Ok(metadata) => return Ok(metadata),
                Err(error) => {
                    warn!(attempt, %error, path = %pending.path, "blob upload attempt failed");
                    last_error = Some(error);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| ChatError::Upload("upload never attempted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::{MemoryBlobs, MemoryStore};
    use crate::services::realtime::{QuerySpec, RangeBound};
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn ada() -> UserInfo {
        UserInfo::new("u1", "Ada").with_photo("https://example.com/ada.png")
    }

    fn cat_png() -> ImageFile {
        ImageFile {
            name: "cat.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![0xde, 0xad],
        }
    }

    #[test]
    fn test_validate_media_type() {
        assert!(validate_media_type("image/png").is_ok());
        assert!(validate_media_type("image/jpeg").is_ok());
        assert!(matches!(
            validate_media_type("application/pdf"),
            Err(ChatError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_begin_pushes_placeholder() {
        let store = Arc::new(MemoryStore::new());
        let blobs = Arc::new(MemoryBlobs::new("bucket"));
        let coordinator =
            UploadCoordinator::new(store.clone(), blobs, UploadPolicy::default());

        let locality = LocalityKey::new("10110").unwrap();
        let pending = coordinator
            .begin(&ada(), &locality, &cat_png(), Some("look".to_string()))
            .await
            .unwrap();
        assert!(pending.path.starts_with("u1/"));
        assert!(pending.path.ends_with("/cat.png"));

        let mut sub = store
            .subscribe(QuerySpec {
                partition: "messages".to_string(),
                order_by: "postalCode".to_string(),
                range: RangeBound::Exact("10110".to_string()),
                tail_limit: 12,
            })
            .await
            .unwrap();
        let change = sub.changes.recv().await.unwrap();
        assert_eq!(change.key, pending.message_key);
        assert_eq!(change.value["imageUrl"], LOADING_IMAGE_URL);
        assert_eq!(change.value["text"], "look");
    }

    #[tokio::test]
    async fn test_finish_patches_only_image_url() {
        let store = Arc::new(MemoryStore::new());
        let blobs = Arc::new(MemoryBlobs::new("bucket"));
        let coordinator =
            UploadCoordinator::new(store.clone(), blobs.clone(), UploadPolicy::default());

        let locality = LocalityKey::new("10110").unwrap();
        let file = cat_png();
        let pending = coordinator
            .begin(&ada(), &locality, &file, None)
            .await
            .unwrap();

        let mut sub = store
            .subscribe(QuerySpec {
                partition: "messages".to_string(),
                order_by: "postalCode".to_string(),
                range: RangeBound::Exact("10110".to_string()),
                tail_limit: 12,
            })
            .await
            .unwrap();
        let _added = sub.changes.recv().await.unwrap();

        coordinator.finish(&pending, &file.bytes).await.unwrap();

        let changed = sub.changes.recv().await.unwrap();
        let locator = changed.value["imageUrl"].as_str().unwrap();
        assert!(locator.starts_with("gs://bucket/u1/"));
        assert!(locator.ends_with("/cat.png"));
        // The rest of the record is untouched.
        assert_eq!(changed.value["name"], "Ada");
        assert_eq!(changed.value["postalCode"], "10110");
    }

    /// Blob store failing a configured number of puts before succeeding.
    struct FlakyBlobs {
        inner: MemoryBlobs,
        failures_left: Mutex<u32>,
        attempts: Mutex<u32>,
    }

    impl FlakyBlobs {
        fn new(failures: u32) -> Self {
            Self {
                inner: MemoryBlobs::new("bucket"),
                failures_left: Mutex::new(failures),
                attempts: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl BlobService for FlakyBlobs {
        fn bucket(&self) -> String {
            self.inner.bucket()
        }

        async fn put(
            &self,
            path: &str,
            bytes: &[u8],
            content_type: &str,
        ) -> Result<BlobMetadata, ChatError> {
            *self.attempts.lock().unwrap() += 1;
            {
                let mut failures = self.failures_left.lock().unwrap();
                if *failures > 0 {
                    *failures -= 1;
                    return Err(ChatError::Upload("transient".to_string()));
                }
            }
            self.inner.put(path, bytes, content_type).await
        }

        fn locator_for(&self, full_path: &str) -> String {
            self.inner.locator_for(full_path)
        }

        async fn fetch_metadata(&self, locator: &str) -> Result<Vec<String>, ChatError> {
            self.inner.fetch_metadata(locator).await
        }
    }

    #[tokio::test]
    async fn test_default_policy_does_not_retry() {
        let store = Arc::new(MemoryStore::new());
        let blobs = Arc::new(FlakyBlobs::new(1));
        let coordinator =
            UploadCoordinator::new(store.clone(), blobs.clone(), UploadPolicy::default());

        let locality = LocalityKey::new("10110").unwrap();
        let file = cat_png();
        let pending = coordinator
            .begin(&ada(), &locality, &file, None)
            .await
            .unwrap();

        assert!(coordinator.finish(&pending, &file.bytes).await.is_err());
        assert_eq!(*blobs.attempts.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_configured_policy_retries_until_success() {
        let store = Arc::new(MemoryStore::new());
        let blobs = Arc::new(FlakyBlobs::new(2));
        let policy = UploadPolicy {
            attempts: 3,
            timeout: None,
        };
        let coordinator = UploadCoordinator::new(store.clone(), blobs.clone(), policy);

        let locality = LocalityKey::new("10110").unwrap();
        let file = cat_png();
        let pending = coordinator
            .begin(&ada(), &locality, &file, None)
            .await
            .unwrap();

        assert!(coordinator.finish(&pending, &file.bytes).await.is_ok());
        assert_eq!(*blobs.attempts.lock().unwrap(), 3);
    }
}
