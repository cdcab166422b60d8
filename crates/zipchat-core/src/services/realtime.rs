use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::ChatError;

/// Change kinds this client observes. Removals are not a supported
/// operation anywhere in the system and are never delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Changed,
}

/// A delivered notification that an entity was added or updated within a
/// subscribed range.
#[derive(Debug, Clone)]
pub struct ChangeRecord {
    pub kind: ChangeKind,
    pub key: String,
    pub value: Value,
}

/// Range filter over the order-by child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeBound {
    Exact(String),
    /// Closed range, both bounds included.
    Between { start: String, end: String },
}

impl RangeBound {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            RangeBound::Exact(key) => value == key,
            RangeBound::Between { start, end } => start.as_str() <= value && value <= end.as_str(),
        }
    }
}

/// An ordered, range-filtered, tail-limited live query over one partition.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub partition: String,
    pub order_by: String,
    pub range: RangeBound,
    pub tail_limit: u32,
}

/// Handle to a pushed record; `key` is the store-generated id.
#[derive(Debug, Clone)]
pub struct PushHandle {
    pub key: String,
}

/// Live subscription: the change receiver plus a detach guard. Dropping the
/// guard tears the listener down; the receiver then drains whatever was
/// already in flight and closes.
pub struct Subscription {
    pub changes: mpsc::UnboundedReceiver<ChangeRecord>,
    pub guard: SubscriptionGuard,
}

pub struct SubscriptionGuard {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionGuard {
    pub fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    pub fn noop() -> Self {
        Self { detach: None }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

/// Client handle to the external realtime partitioned store.
///
/// The initial snapshot of a subscription is delivered as `Added` records
/// in ascending query order, followed by live `Added`/`Changed` records as
/// they occur. The store acks `push`/`update` on write completion.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    async fn subscribe(&self, spec: QuerySpec) -> Result<Subscription, ChatError>;

    async fn push(&self, partition: &str, value: Value) -> Result<PushHandle, ChatError>;

    async fn update(&self, partition: &str, key: &str, patch: Value) -> Result<(), ChatError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_bounds() {
        let exact = RangeBound::Exact("10110".into());
        assert!(exact.matches("10110"));
        assert!(!exact.matches("10111"));

        let between = RangeBound::Between {
            start: "10".into(),
            end: "10999".into(),
        };
        assert!(between.matches("10"));
        assert!(between.matches("10110"));
        assert!(between.matches("10999"));
        assert!(!between.matches("11000"));
    }
}
