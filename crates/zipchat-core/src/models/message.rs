use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message as stored in the realtime store's `messages` partition.
///
/// Field names follow the wire format (`photoUrl`, `imageUrl`,
/// `postalCode`). `image_url` holds either a directly fetchable URL, an
/// indirect storage locator, or the loading sentinel while an upload is in
/// flight. `time` is epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub photo_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub postal_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
}

/// A message keyed by its server-assigned id.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub record: MessageRecord,
}

impl Message {
    /// Builds a message from a delivered change record. Returns `None` for
    /// payloads that don't parse as a message.
    pub fn from_change(key: &str, value: &Value) -> Option<Self> {
        let record: MessageRecord = serde_json::from_value(value.clone()).ok()?;
        Some(Self {
            id: key.to_string(),
            record,
        })
    }

    /// Whether this message projects an entry into the event gallery.
    pub fn is_image_bearing(&self) -> bool {
        self.record.image_url.is_some()
    }
}
