//! Application-wide constants
//!
//! Centralized location for magic strings and configuration values
//! that are used across multiple modules.

/// Image shown in place of an upload that has not finished yet.
pub const LOADING_IMAGE_URL: &str = "https://www.google.com/images/spin-32.gif";

/// Fallback profile picture for users without one.
pub const PROFILE_PLACEHOLDER_URL: &str = "/images/profile_placeholder.png";

/// Scheme prefix that marks an indirect blob-store locator.
pub const STORAGE_SCHEME: &str = "gs://";

/// Sender id the push-messaging bootstrap registers with.
pub const PUSH_SENDER_ID: &str = "95492685875";

// Store partitions
pub const MESSAGES_PARTITION: &str = "messages";
pub const CONTACTS_PARTITION: &str = "contacts";

/// Child field both partitions are ordered and range-filtered by.
pub const LOCALITY_FIELD: &str = "postalCode";

/// Tail limit for the message feed.
pub const MESSAGES_TAIL_LIMIT: u32 = 12;

/// Tail limit for the contact feed.
pub const CONTACTS_TAIL_LIMIT: u32 = 30;

// Transient notices
pub const NOTICE_TIMEOUT_MS: u64 = 2000;
pub const SIGN_IN_NOTICE: &str = "You must sign-in first";
pub const IMAGES_ONLY_NOTICE: &str = "You can only share images";
