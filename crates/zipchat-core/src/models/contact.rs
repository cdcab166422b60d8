use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An emergency contact from the read-only `contacts` partition.
///
/// Created and maintained externally; this client only renders them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    pub postal_code: String,
}

#[derive(Debug, Clone)]
pub struct Contact {
    pub id: String,
    pub record: ContactRecord,
}

impl Contact {
    pub fn from_change(key: &str, value: &Value) -> Option<Self> {
        let record: ContactRecord = serde_json::from_value(value.clone()).ok()?;
        Some(Self {
            id: key.to_string(),
            record,
        })
    }
}
