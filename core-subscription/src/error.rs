//! Error type shared by subscriptions and core-client implementations.

use crate::model::CoreState;
use uuid::Uuid;

/// Failures surfaced by subscription and core-client operations.
///
/// Usage errors (`AlreadyStarted`, `MissingItemKind`, `Disposed`) report a
/// contract violation by the caller. The remaining variants are raised by
/// [`crate::CoreClient`] implementations and reach the caller unchanged.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("subscription '{0}' already started")]
    AlreadyStarted(Uuid),

    #[error("subscription '{0}' has no item kind; set one before start")]
    MissingItemKind(Uuid),

    #[error("subscription '{0}' has been disposed")]
    Disposed(Uuid),

    #[error("invalid subscription id: {0}")]
    InvalidSubscription(Uuid),

    #[error("core client unavailable in state {0:?}")]
    ClientUnavailable(CoreState),

    #[error("cancellation of subscription '{0}' was abandoned before completion")]
    CancelAbandoned(Uuid),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CoreError {
    /// True for errors caused by calling the subscription API out of order.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            CoreError::AlreadyStarted(_) | CoreError::MissingItemKind(_) | CoreError::Disposed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::CoreError;
    use crate::model::CoreState;
    use uuid::Uuid;

    #[test]
    fn usage_errors_are_classified() {
        let id = Uuid::new_v4();
        assert!(CoreError::AlreadyStarted(id).is_usage_error());
        assert!(CoreError::MissingItemKind(id).is_usage_error());
        assert!(!CoreError::ClientUnavailable(CoreState::Faulted).is_usage_error());
        assert!(!CoreError::InvalidSubscription(id).is_usage_error());
    }

    #[test]
    fn display_names_the_subscription() {
        let id = Uuid::new_v4();
        let message = CoreError::AlreadyStarted(id).to_string();
        assert!(message.contains(&id.to_string()));
    }
}
