use std::sync::{Arc, RwLock};

/// Counters for feed and write activity.
#[derive(Debug, Default, Clone)]
pub struct SessionStats {
    pub messages_delivered: u64,
    pub contacts_delivered: u64,
    pub texts_sent: u64,
    pub images_sent: u64,
    pub uploads_failed: u64,
    pub locators_resolved: u64,
}

/// Thread-safe wrapper shared between the worker and the runtime.
#[derive(Debug, Clone, Default)]
pub struct SharedSessionStats {
    inner: Arc<RwLock<SessionStats>>,
}

impl SharedSessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, update: impl FnOnce(&mut SessionStats)) {
        if let Ok(mut stats) = self.inner.write() {
            update(&mut stats);
        }
    }

    pub fn snapshot(&self) -> SessionStats {
        self.inner.read().map(|s| s.clone()).unwrap_or_default()
    }
}
