//! In-process implementations of the service traits.
//!
//! These back the sandbox CLI and the test-suite. The store honors the same
//! query semantics a production adapter would: ascending order by the
//! order-by child, closed range bounds, tail limits on the initial
//! snapshot, and live `Added`/`Changed` delivery to every matching
//! listener.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::error::ChatError;
use crate::models::UserInfo;

use super::blob::{BlobMetadata, BlobService};
use super::identity::{IdentityService, ProviderKind};
use super::push::PushMessagingService;
use super::realtime::{
    ChangeKind, ChangeRecord, PushHandle, QuerySpec, RealtimeStore, Subscription,
    SubscriptionGuard,
};

/// Identity provider stub: `sign_in` always succeeds with the configured
/// profile, as if the interactive popup completed.
pub struct MemoryIdentity {
    profile: UserInfo,
    state: watch::Sender<Option<UserInfo>>,
}

impl MemoryIdentity {
    pub fn new(profile: UserInfo) -> Self {
        let (state, _) = watch::channel(None);
        Self { profile, state }
    }
}

#[async_trait]
impl IdentityService for MemoryIdentity {
    fn current_user(&self) -> Option<UserInfo> {
        self.state.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<Option<UserInfo>> {
        self.state.subscribe()
    }

    async fn sign_in(&self, _provider: ProviderKind) -> Result<UserInfo, ChatError> {
        self.state.send_replace(Some(self.profile.clone()));
        Ok(self.profile.clone())
    }

    async fn sign_out(&self) -> Result<(), ChatError> {
        self.state.send_replace(None);
        Ok(())
    }
}

struct Watcher {
    id: u64,
    spec: QuerySpec,
    tx: mpsc::UnboundedSender<ChangeRecord>,
}

#[derive(Default)]
struct Partition {
    records: BTreeMap<String, Value>,
    watchers: Vec<Watcher>,
}

#[derive(Default)]
struct StoreInner {
    partitions: HashMap<String, Partition>,
    next_watcher_id: u64,
    next_key_seq: u64,
}

/// Realtime store backed by per-partition ordered maps.
#[derive(Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn order_value(spec: &QuerySpec, value: &Value) -> Option<String> {
        value
            .get(&spec.order_by)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn notify(partition: &mut Partition, kind: ChangeKind, key: &str, value: &Value) {
        partition.watchers.retain(|watcher| {
            let in_range = Self::order_value(&watcher.spec, value)
                .is_some_and(|v| watcher.spec.range.matches(&v));
            if !in_range {
                return true;
            }
            watcher
                .tx
                .send(ChangeRecord {
                    kind,
                    key: key.to_string(),
                    value: value.clone(),
                })
                .is_ok()
        });
    }
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    async fn subscribe(&self, spec: QuerySpec) -> Result<Subscription, ChatError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let watcher_id;
        {
            let mut inner = self.inner.lock().expect("store lock poisoned");
            watcher_id = inner.next_watcher_id;
            inner.next_watcher_id += 1;

            let partition = inner.partitions.entry(spec.partition.clone()).or_default();

            // Initial snapshot: matching rows in ascending query order,
            // clipped to the last `tail_limit`.
            let mut snapshot: Vec<(String, String, Value)> = partition
                .records
                .iter()
                .filter_map(|(key, value)| {
                    let order = Self::order_value(&spec, value)?;
                    spec.range
                        .matches(&order)
                        .then(|| (order, key.clone(), value.clone()))
                })
                .collect();
            snapshot.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
            let skip = snapshot.len().saturating_sub(spec.tail_limit as usize);
            for (_, key, value) in snapshot.into_iter().skip(skip) {
                let _ = tx.send(ChangeRecord {
                    kind: ChangeKind::Added,
                    key,
                    value,
                });
            }

            partition.watchers.push(Watcher {
                id: watcher_id,
                spec: spec.clone(),
                tx,
            });
        }

        let inner = Arc::clone(&self.inner);
        let partition_name = spec.partition;
        let guard = SubscriptionGuard::new(move || {
            if let Ok(mut inner) = inner.lock() {
                if let Some(partition) = inner.partitions.get_mut(&partition_name) {
                    partition.watchers.retain(|w| w.id != watcher_id);
                }
            }
        });

        Ok(Subscription {
            changes: rx,
            guard,
        })
    }

    async fn push(&self, partition: &str, value: Value) -> Result<PushHandle, ChatError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        // Generated keys sort by insertion order, like the production
        // store's push ids: a sequence prefix plus a random tail.
        let seq = inner.next_key_seq;
        inner.next_key_seq += 1;
        let key = format!("-{seq:012x}-{}", &Uuid::new_v4().simple().to_string()[..8]);
        let partition = inner.partitions.entry(partition.to_string()).or_default();
        partition.records.insert(key.clone(), value.clone());
        Self::notify(partition, ChangeKind::Added, &key, &value);
        Ok(PushHandle { key })
    }

    async fn update(&self, partition: &str, key: &str, patch: Value) -> Result<(), ChatError> {
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let partition = inner
            .partitions
            .get_mut(partition)
            .ok_or_else(|| ChatError::Write(format!("unknown partition {partition:?}")))?;
        let record = partition
            .records
            .get_mut(key)
            .ok_or_else(|| ChatError::Write(format!("no record {key:?}")))?;

        if let (Some(target), Some(fields)) = (record.as_object_mut(), patch.as_object()) {
            for (field, value) in fields {
                target.insert(field.clone(), value.clone());
            }
        }
        let updated = record.clone();
        Self::notify(partition, ChangeKind::Changed, key, &updated);
        Ok(())
    }
}

struct StoredBlob {
    len: usize,
    content_type: String,
}

/// Blob store keeping object metadata in memory and serving synthetic
/// download URLs.
pub struct MemoryBlobs {
    bucket: String,
    download_base: String,
    objects: Mutex<HashMap<String, StoredBlob>>,
}

impl MemoryBlobs {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            download_base: "https://blobs.example.com".to_string(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub fn object(&self, path: &str) -> Option<(usize, String)> {
        self.objects
            .lock()
            .expect("blob lock poisoned")
            .get(path)
            .map(|blob| (blob.len, blob.content_type.clone()))
    }
}

#[async_trait]
impl BlobService for MemoryBlobs {
    fn bucket(&self) -> String {
        self.bucket.clone()
    }

    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<BlobMetadata, ChatError> {
        self.objects.lock().expect("blob lock poisoned").insert(
            path.to_string(),
            StoredBlob {
                len: bytes.len(),
                content_type: content_type.to_string(),
            },
        );
        Ok(BlobMetadata {
            full_path: path.to_string(),
        })
    }

    fn locator_for(&self, full_path: &str) -> String {
        format!("gs://{}/{}", self.bucket, full_path)
    }

    async fn fetch_metadata(&self, locator: &str) -> Result<Vec<String>, ChatError> {
        let prefix = format!("gs://{}/", self.bucket);
        let path = locator
            .strip_prefix(&prefix)
            .ok_or_else(|| ChatError::MetadataFetch(format!("foreign locator {locator:?}")))?;
        let objects = self.objects.lock().expect("blob lock poisoned");
        if !objects.contains_key(path) {
            return Err(ChatError::MetadataFetch(format!("no object at {path:?}")));
        }
        Ok(vec![format!(
            "{}/{}/{}",
            self.download_base, self.bucket, path
        )])
    }
}

/// Push-messaging stub recording the registered sender id.
#[derive(Default)]
pub struct MemoryPush {
    registered: Mutex<Option<String>>,
}

impl MemoryPush {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registered_sender(&self) -> Option<String> {
        self.registered.lock().expect("push lock poisoned").clone()
    }
}

#[async_trait]
impl PushMessagingService for MemoryPush {
    async fn register(&self, sender_id: &str) -> Result<(), ChatError> {
        *self.registered.lock().expect("push lock poisoned") = Some(sender_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::realtime::RangeBound;
    use serde_json::json;

    fn contact(postal_code: &str) -> Value {
        json!({
            "name": format!("contact {postal_code}"),
            "address": "1 Main St",
            "phone": "555-0100",
            "postalCode": postal_code,
        })
    }

    fn contacts_spec() -> QuerySpec {
        QuerySpec {
            partition: "contacts".to_string(),
            order_by: "postalCode".to_string(),
            range: RangeBound::Between {
                start: "10".to_string(),
                end: "10999".to_string(),
            },
            tail_limit: 30,
        }
    }

    #[tokio::test]
    async fn test_range_includes_upper_bound_excludes_next_prefix() {
        let store = MemoryStore::new();
        store.push("contacts", contact("10999")).await.unwrap();
        store.push("contacts", contact("11000")).await.unwrap();

        let mut sub = store.subscribe(contacts_spec()).await.unwrap();
        let first = sub.changes.recv().await.unwrap();
        assert_eq!(first.value["postalCode"], "10999");
        assert!(sub.changes.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_snapshot_is_tail_limited_and_ascending() {
        let store = MemoryStore::new();
        for i in 0..15 {
            store
                .push(
                    "messages",
                    json!({"name": "a", "text": format!("m{i}"), "photoUrl": "p",
                           "postalCode": "10110"}),
                )
                .await
                .unwrap();
        }

        let spec = QuerySpec {
            partition: "messages".to_string(),
            order_by: "postalCode".to_string(),
            range: RangeBound::Exact("10110".to_string()),
            tail_limit: 12,
        };
        let mut sub = store.subscribe(spec).await.unwrap();

        let mut seen = Vec::new();
        while let Ok(change) = sub.changes.try_recv() {
            assert_eq!(change.kind, ChangeKind::Added);
            seen.push(change.value["text"].as_str().unwrap().to_string());
        }
        // The 12 most recent of 15, oldest of the window first.
        assert_eq!(seen.len(), 12);
        assert_eq!(seen.first().map(String::as_str), Some("m3"));
        assert_eq!(seen.last().map(String::as_str), Some("m14"));
    }

    #[tokio::test]
    async fn test_update_delivers_changed_to_matching_watchers() {
        let store = MemoryStore::new();
        let handle = store
            .push(
                "messages",
                json!({"name": "a", "imageUrl": "sentinel", "photoUrl": "p", "postalCode": "10110"}),
            )
            .await
            .unwrap();

        let spec = QuerySpec {
            partition: "messages".to_string(),
            order_by: "postalCode".to_string(),
            range: RangeBound::Exact("10110".to_string()),
            tail_limit: 12,
        };
        let mut sub = store.subscribe(spec).await.unwrap();
        let added = sub.changes.recv().await.unwrap();
        assert_eq!(added.kind, ChangeKind::Added);

        store
            .update("messages", &handle.key, json!({"imageUrl": "gs://b/final"}))
            .await
            .unwrap();
        let changed = sub.changes.recv().await.unwrap();
        assert_eq!(changed.kind, ChangeKind::Changed);
        assert_eq!(changed.key, handle.key);
        assert_eq!(changed.value["imageUrl"], "gs://b/final");
        // Untouched fields survive the partial update.
        assert_eq!(changed.value["name"], "a");
    }

    #[tokio::test]
    async fn test_detach_guard_stops_delivery() {
        let store = MemoryStore::new();
        let spec = QuerySpec {
            partition: "messages".to_string(),
            order_by: "postalCode".to_string(),
            range: RangeBound::Exact("10110".to_string()),
            tail_limit: 12,
        };
        let sub = store.subscribe(spec).await.unwrap();
        let mut changes = sub.changes;
        drop(sub.guard);

        store
            .push(
                "messages",
                json!({"name": "a", "text": "late", "photoUrl": "p", "postalCode": "10110"}),
            )
            .await
            .unwrap();
        // Sender side is gone once the guard drops.
        assert!(changes.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_memory_blobs_round_trip() {
        let blobs = MemoryBlobs::new("bucket-1");
        let meta = blobs.put("u1/123/cat.png", &[1, 2, 3], "image/png").await.unwrap();
        let locator = blobs.locator_for(&meta.full_path);
        assert_eq!(locator, "gs://bucket-1/u1/123/cat.png");

        let urls = blobs.fetch_metadata(&locator).await.unwrap();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].ends_with("/bucket-1/u1/123/cat.png"));
        assert_eq!(
            blobs.object("u1/123/cat.png"),
            Some((3, "image/png".to_string()))
        );

        assert!(blobs.fetch_metadata("gs://other/u1/123/cat.png").await.is_err());
    }
}
