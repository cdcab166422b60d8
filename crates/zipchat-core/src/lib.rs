pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod locality;
pub mod models;
pub mod runtime;
pub mod services;
pub mod stats;
pub mod store;
pub mod sync;

pub use config::{CoreConfig, UploadPolicy};
pub use error::ChatError;
pub use events::UiEvent;
pub use locality::{default_locality_url, LocalityKey, DEFAULT_LOCALITY};
pub use runtime::{ClientHandle, ClientRuntime};
pub use sync::upload::ImageFile;
pub use sync::worker::{ClientCommand, DataChange};
