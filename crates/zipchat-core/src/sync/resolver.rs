//! Resource URL resolution.
//!
//! Image references arrive either as directly fetchable URLs or as opaque
//! `gs://` storage locators. Direct references resolve synchronously;
//! indirect ones display the loading sentinel while a metadata fetch runs,
//! and the completion patches the target slot exactly once. A failed fetch
//! is logged and leaves the sentinel in place.

use crate::constants::STORAGE_SCHEME;
use crate::error::ChatError;
use crate::services::BlobService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Already fetchable, use as-is.
    Direct(String),
    /// Needs a metadata fetch before it can be displayed.
    Indirect { locator: String },
}

pub fn classify(reference: &str) -> Resolution {
    if reference.starts_with(STORAGE_SCHEME) {
        Resolution::Indirect {
            locator: reference.to_string(),
        }
    } else {
        Resolution::Direct(reference.to_string())
    }
}

/// Resolves an indirect locator to its first download URL.
pub async fn fetch_download_url(
    blobs: &dyn BlobService,
    locator: &str,
) -> Result<String, ChatError> {
    let urls = blobs.fetch_metadata(locator).await?;
    urls.into_iter()
        .next()
        .ok_or_else(|| ChatError::MetadataFetch(format!("no download URL for {locator:?}")))
}
