use thiserror::Error;

/// Error taxonomy for the sync core.
///
/// `Validation` and `Unauthenticated` abort the operation and surface a
/// transient notice to the user. `Write`, `Upload` and `MetadataFetch` are
/// logged and otherwise swallowed: the UI keeps whatever was last rendered
/// and recovery requires a fresh user action. `Setup` is raised once at
/// startup and blocks everything.
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    #[error("unsupported input: {0}")]
    Validation(String),

    #[error("no signed-in user")]
    Unauthenticated,

    #[error("store write failed: {0}")]
    Write(String),

    #[error("blob upload failed: {0}")]
    Upload(String),

    #[error("blob metadata fetch failed: {0}")]
    MetadataFetch(String),

    #[error("setup: {0}")]
    Setup(String),
}
