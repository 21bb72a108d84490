use core_subscription::{
    CancelCompleter, CoreClient, CoreError, CoreItem, CoreState, CoreStateChange, EventHandlers,
    HandlerKey, PendingCancel, StateChangeHandler, Subscription, SubscriptionConfig,
};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

#[derive(Default)]
struct Script {
    start_error: Option<CoreError>,
    items_on_start: Vec<CoreItem>,
    hold_cancellations: bool,
}

#[derive(Default)]
struct Record {
    starts: Vec<(Uuid, SubscriptionConfig)>,
    cancels: Vec<Uuid>,
    held: Vec<CancelCompleter>,
}

/// A [`CoreClient`] that records every call and behaves as scripted.
///
/// By default starts succeed and cancellations complete immediately.
pub struct RecordingCoreClient {
    default_app_scopes: Vec<String>,
    script: Mutex<Script>,
    record: Mutex<Record>,
    state_handlers: EventHandlers<CoreStateChange>,
}

impl RecordingCoreClient {
    pub fn new() -> Arc<Self> {
        Self::with_app_scopes(Vec::new())
    }

    pub fn with_app_scopes(default_app_scopes: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            default_app_scopes,
            script: Mutex::new(Script::default()),
            record: Mutex::new(Record::default()),
            state_handlers: EventHandlers::new(),
        })
    }

    /// Creates a subscription served by this client.
    pub fn subscription(self: &Arc<Self>) -> Arc<Subscription> {
        Subscription::new(tracing::Span::current(), self.clone())
    }

    /// Makes every following start fail with `error` until cleared with `None`.
    pub fn fail_starts(&self, error: Option<CoreError>) {
        self.script().start_error = error;
    }

    /// Items delivered synchronously from inside `start_subscription`.
    pub fn deliver_on_start(&self, items: Vec<CoreItem>) {
        self.script().items_on_start = items;
    }

    /// While held, cancellations stay pending until
    /// [`release_cancellations`](Self::release_cancellations).
    pub fn hold_cancellations(&self, hold: bool) {
        self.script().hold_cancellations = hold;
    }

    /// Completes every held cancellation with `result`. Returns how many were released.
    pub fn release_cancellations(&self, result: Result<(), CoreError>) -> usize {
        let held = std::mem::take(&mut self.record().held);
        let released = held.len();
        for completer in held {
            completer.complete(result.clone());
        }
        released
    }

    /// Drops held cancellations without completing them.
    pub fn abandon_cancellations(&self) -> usize {
        let held = std::mem::take(&mut self.record().held);
        held.len()
    }

    pub fn raise_state_change(&self, old_state: CoreState, new_state: CoreState) {
        self.state_handlers
            .raise(&CoreStateChange::new(old_state, new_state));
    }

    pub fn started_ids(&self) -> Vec<Uuid> {
        self.record().starts.iter().map(|(id, _)| *id).collect()
    }

    /// Configuration each subscription had when it was started, in call order.
    pub fn started_configs(&self) -> Vec<SubscriptionConfig> {
        self.record()
            .starts
            .iter()
            .map(|(_, config)| config.clone())
            .collect()
    }

    pub fn cancelled_ids(&self) -> Vec<Uuid> {
        self.record().cancels.clone()
    }

    pub fn state_handler_count(&self) -> usize {
        self.state_handlers.len()
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self) -> std::sync::MutexGuard<'_, Record> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CoreClient for RecordingCoreClient {
    fn default_app_scopes(&self) -> Vec<String> {
        self.default_app_scopes.clone()
    }

    fn start_subscription(&self, subscription: &Arc<Subscription>) -> Result<(), CoreError> {
        let (start_error, items) = {
            let script = self.script();
            (script.start_error.clone(), script.items_on_start.clone())
        };
        if let Some(error) = start_error {
            return Err(error);
        }

        self.record()
            .starts
            .push((subscription.id(), subscription.config()));
        for item in &items {
            subscription.process_update(item);
        }
        Ok(())
    }

    fn cancel_subscription_begin(&self, subscription_id: Uuid) -> Result<PendingCancel, CoreError> {
        let hold = self.script().hold_cancellations;
        let mut record = self.record();
        record.cancels.push(subscription_id);

        if hold {
            let (completer, pending) = PendingCancel::new(subscription_id);
            record.held.push(completer);
            Ok(pending)
        } else {
            Ok(PendingCancel::completed(subscription_id))
        }
    }

    fn attach_state_handler(&self, handler: StateChangeHandler) -> HandlerKey {
        self.state_handlers.add_shared(handler)
    }

    fn detach_state_handler(&self, key: HandlerKey) -> bool {
        self.state_handlers.remove(key)
    }
}
