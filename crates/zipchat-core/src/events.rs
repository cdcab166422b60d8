use crate::constants::{IMAGES_ONLY_NOTICE, NOTICE_TIMEOUT_MS, SIGN_IN_NOTICE};
use crate::error::ChatError;

/// UI effects produced while applying change deliveries. The embedding UI
/// drains these after each processing pass and performs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Transient toast-style notice.
    Notice { message: String, timeout_ms: u64 },
    ScrollMessagesToBottom,
    ScrollEventsToBottom,
    FocusCompose,
    /// A text send was acked; the compose field can be cleared.
    ClearCompose,
}

impl UiEvent {
    pub fn notice(message: impl Into<String>) -> Self {
        UiEvent::Notice {
            message: message.into(),
            timeout_ms: NOTICE_TIMEOUT_MS,
        }
    }

    /// Notice for a rejected write, if the error is user-facing. Write and
    /// upload failures are logged only and produce nothing here.
    pub fn for_rejection(error: &ChatError) -> Option<Self> {
        match error {
            ChatError::Validation(_) => Some(Self::notice(IMAGES_ONLY_NOTICE)),
            ChatError::Unauthenticated => Some(Self::notice(SIGN_IN_NOTICE)),
            _ => None,
        }
    }
}
