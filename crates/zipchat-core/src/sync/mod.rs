pub mod auth;
pub mod feeds;
pub mod resolver;
pub mod upload;
pub mod worker;

pub use auth::IdentityGate;
pub use feeds::{FeedSubscriptions, Partition};
pub use upload::{ImageFile, UploadCoordinator};
pub use worker::{ClientCommand, DataChange, SyncWorker};
