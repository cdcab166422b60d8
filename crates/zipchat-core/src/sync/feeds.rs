//! Live feed subscriptions over the two store partitions.
//!
//! At most one active subscription per partition. Re-invoking with the
//! same locality is a no-op; a new locality tears the previous listener
//! down before attaching. Late deliveries from a superseded listener are
//! harmless downstream: the reconciler applies whatever arrives.

use std::collections::HashMap;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use tracing::debug;

use crate::constants::{CONTACTS_PARTITION, LOCALITY_FIELD, MESSAGES_PARTITION};
use crate::error::ChatError;
use crate::locality::LocalityKey;
use crate::services::{
    QuerySpec, RangeBound, RealtimeStore, Subscription, SubscriptionGuard,
};

use super::worker::DataChange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Messages,
    Contacts,
}

impl Partition {
    pub fn path(self) -> &'static str {
        match self {
            Partition::Messages => MESSAGES_PARTITION,
            Partition::Contacts => CONTACTS_PARTITION,
        }
    }
}

/// The live query a partition is scoped by. Messages match the locality
/// exactly; contacts cover every code sharing the two-digit area prefix.
pub fn query_spec(partition: Partition, locality: &LocalityKey, tail_limit: u32) -> QuerySpec {
    let range = match partition {
        Partition::Messages => RangeBound::Exact(locality.as_str().to_string()),
        Partition::Contacts => {
            let (start, end) = locality.contact_range();
            RangeBound::Between { start, end }
        }
    };
    QuerySpec {
        partition: partition.path().to_string(),
        order_by: LOCALITY_FIELD.to_string(),
        range,
        tail_limit,
    }
}

struct ActiveFeed {
    locality: LocalityKey,
    _guard: SubscriptionGuard,
}

pub struct FeedSubscriptions {
    store: Arc<dyn RealtimeStore>,
    data_tx: Sender<DataChange>,
    active: HashMap<Partition, ActiveFeed>,
}

impl FeedSubscriptions {
    pub fn new(store: Arc<dyn RealtimeStore>, data_tx: Sender<DataChange>) -> Self {
        Self {
            store,
            data_tx,
            active: HashMap::new(),
        }
    }

    /// Idempotently (re)establishes the partition's live query. Every
    /// delivered change record is forwarded unmodified, tagged with its
    /// partition.
    pub async fn subscribe(
        &mut self,
        partition: Partition,
        locality: &LocalityKey,
        tail_limit: u32,
    ) -> Result<(), ChatError> {
        if let Some(active) = self.active.get(&partition) {
            if active.locality == *locality {
                debug!(?partition, %locality, "subscription already active");
                return Ok(());
            }
        }
        // Detach the previous listener before attaching the new one, so a
        // rebind never double-delivers.
        self.active.remove(&partition);

        let spec = query_spec(partition, locality, tail_limit);
        let Subscription { mut changes, guard } = self.store.subscribe(spec).await?;

        let data_tx = self.data_tx.clone();
        tokio::spawn(async move {
            while let Some(record) = changes.recv().await {
                let change = match partition {
                    Partition::Messages => DataChange::Message(record),
                    Partition::Contacts => DataChange::Contact(record),
                };
                if data_tx.send(change).is_err() {
                    break;
                }
            }
        });

        self.active.insert(
            partition,
            ActiveFeed {
                locality: locality.clone(),
                _guard: guard,
            },
        );
        debug!(?partition, %locality, "subscription established");
        Ok(())
    }
}
