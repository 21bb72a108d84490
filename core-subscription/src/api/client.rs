//! Collaborator contract a subscription is registered against.

use crate::api::subscription::Subscription;
use crate::data_plane::event_handlers::{Handler, HandlerKey};
use crate::data_plane::pending_cancel::PendingCancel;
use crate::error::CoreError;
use crate::model::CoreStateChange;
use std::sync::Arc;
use uuid::Uuid;

pub type StateChangeHandler = Handler<CoreStateChange>;

/// A connection to the item cache that subscriptions register with.
///
/// The client outlives its subscriptions and is shared between them; it
/// should only keep weak references to the subscriptions it serves.
pub trait CoreClient: Send + Sync {
    /// Scopes a new subscription starts with.
    fn default_app_scopes(&self) -> Vec<String>;

    /// Registers interest for `subscription.id()` using its current configuration.
    ///
    /// May deliver existing items through [`Subscription::process_update`]
    /// before returning.
    fn start_subscription(&self, subscription: &Arc<Subscription>) -> Result<(), CoreError>;

    /// Begins tearing down a registration without waiting for it to finish.
    ///
    /// Must tolerate ids that are unknown or already cancelled.
    fn cancel_subscription_begin(
        &self,
        subscription_id: Uuid,
    ) -> Result<PendingCancel, CoreError>;

    /// Waits for a teardown started by [`CoreClient::cancel_subscription_begin`].
    fn cancel_subscription_end(&self, pending: PendingCancel) -> Result<(), CoreError> {
        pending.wait()
    }

    /// Attaches a handler to the client-wide state-change event.
    fn attach_state_handler(&self, handler: StateChangeHandler) -> HandlerKey;

    fn detach_state_handler(&self, key: HandlerKey) -> bool;
}
