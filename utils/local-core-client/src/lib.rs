/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! In-process [`CoreClient`] backed by an in-memory item store.
//!
//! `LocalCoreClient` keeps the latest version of every published item,
//! evaluates subscription queries locally and delivers matching items on the
//! publisher's thread. It is used by the demo binary and by tests that need a
//! working client without a server.
//!
//! ```
//! use core_subscription::{CoreItem, CoreState, ItemKind, WhereExpr};
//! use local_core_client::{ClientSettings, LocalCoreClient};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let client = LocalCoreClient::new(tracing::Span::none(), ClientSettings::default());
//! client.connect();
//! assert_eq!(client.state(), CoreState::Connected);
//!
//! client
//!     .publish(CoreItem::new("AUD.1Y", "Quote", "Legacy", ItemKind::Object))
//!     .unwrap();
//!
//! let seen = Arc::new(AtomicUsize::new(0));
//! let counter = seen.clone();
//! let subscription = client
//!     .create_untyped_subscription("Quote", WhereExpr::All)
//!     .unwrap();
//! subscription.set_item_kind(ItemKind::Object).unwrap();
//! subscription.set_wait_for_existing(true).unwrap();
//! subscription.set_user_callback(move |_subscription, _item| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! // Existing items are delivered before start returns.
//! subscription.start().unwrap();
//! assert_eq!(seen.load(Ordering::SeqCst), 1);
//!
//! client
//!     .publish(CoreItem::new("AUD.2Y", "Quote", "Legacy", ItemKind::Object))
//!     .unwrap();
//! assert_eq!(seen.load(Ordering::SeqCst), 2);
//! ```

mod matching;
mod settings;

pub use settings::ClientSettings;

use core_subscription::observability::{events, fields};
use core_subscription::{
    app_scopes_or_default, CoreClient, CoreError, CoreItem, CoreState, CoreStateChange,
    EventHandlers, HandlerKey, ItemKind, PendingCancel, StateChangeHandler, Subscription,
    SubscriptionConfig, TypeSelector, UserContext, WhereExpr,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::thread;
use tracing::{debug, error, info, info_span, trace, warn, Span};
use uuid::Uuid;

const COMPONENT: &str = "local_core_client";

struct ActiveQuery {
    subscription: Weak<Subscription>,
    config: SubscriptionConfig,
}

#[derive(Default)]
struct ItemStore {
    last_usn: u64,
    items: HashMap<String, CoreItem>,
    active: HashMap<Uuid, ActiveQuery>,
}

impl ItemStore {
    fn matching(&self, config: &SubscriptionConfig) -> Vec<CoreItem> {
        let mut matched: Vec<CoreItem> = self
            .items
            .values()
            .filter(|item| matching::is_match(config, item))
            .map(|item| matching::shape(config, item))
            .collect();
        matched.sort_by_key(|item| item.usn);
        matched
    }
}

#[derive(Clone, Copy)]
struct SubscribeOptions {
    exclude_existing: bool,
    wait_for_existing: bool,
    exclude_data_body: bool,
}

/// A [`CoreClient`] that serves subscriptions from memory.
pub struct LocalCoreClient {
    span: Span,
    settings: ClientSettings,
    default_app_scopes: RwLock<Vec<String>>,
    state: Mutex<CoreState>,
    state_handlers: EventHandlers<CoreStateChange>,
    registry: Mutex<HashMap<Uuid, Weak<Subscription>>>,
    store: Mutex<ItemStore>,
}

impl LocalCoreClient {
    pub fn new(logger: Span, settings: ClientSettings) -> Arc<Self> {
        let span = info_span!(parent: &logger, "core_client", instance = %settings.instance_name);
        Arc::new(Self {
            span,
            default_app_scopes: RwLock::new(settings.app_scopes()),
            settings,
            state: Mutex::new(CoreState::Initial),
            state_handlers: EventHandlers::new(),
            registry: Mutex::new(HashMap::new()),
            store: Mutex::new(ItemStore::default()),
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn set_default_app_scopes(&self, app_scopes: Option<Vec<String>>) {
        *self
            .default_app_scopes
            .write()
            .unwrap_or_else(PoisonError::into_inner) = app_scopes_or_default(app_scopes);
    }

    // subscription factories

    /// Creates an idle subscription registered with this client.
    pub fn create_subscription(self: &Arc<Self>) -> Arc<Subscription> {
        let client: Arc<dyn CoreClient> = self.clone();
        let subscription = Subscription::new(self.span.clone(), client);

        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.retain(|_, registered| registered.strong_count() > 0);
        registry.insert(subscription.id(), Arc::downgrade(&subscription));
        drop(registry);

        debug!(
            parent: &self.span,
            event = events::CLIENT_SUBSCRIPTION_REGISTERED,
            component = COMPONENT,
            subscription_id = %subscription.id(),
            "subscription registered"
        );
        subscription
    }

    pub fn create_typed_subscription<T: 'static>(
        self: &Arc<Self>,
        where_expr: WhereExpr,
    ) -> Result<Arc<Subscription>, CoreError> {
        let subscription = self.create_subscription();
        subscription.set_type_selector(TypeSelector::of::<T>())?;
        subscription.set_where_expr(where_expr)?;
        Ok(subscription)
    }

    pub fn create_untyped_subscription(
        self: &Arc<Self>,
        data_type_name: &str,
        where_expr: WhereExpr,
    ) -> Result<Arc<Subscription>, CoreError> {
        let subscription = self.create_subscription();
        subscription.set_data_type_name(data_type_name)?;
        subscription.set_where_expr(where_expr)?;
        Ok(subscription)
    }

    /// Starts an object subscription for `T`, replaying existing items before returning.
    pub fn subscribe<T, F>(
        self: &Arc<Self>,
        filter: WhereExpr,
        callback: F,
        context: Option<UserContext>,
    ) -> Result<Arc<Subscription>, CoreError>
    where
        T: 'static,
        F: Fn(&Subscription, &CoreItem) + Send + Sync + 'static,
    {
        let options = SubscribeOptions {
            exclude_existing: false,
            wait_for_existing: true,
            exclude_data_body: false,
        };
        self.subscribe_with(TypeSelector::of::<T>(), filter, options, callback, context)
    }

    /// Like [`subscribe`](Self::subscribe) but replays existing items in the background.
    pub fn subscribe_no_wait<T, F>(
        self: &Arc<Self>,
        filter: WhereExpr,
        callback: F,
        context: Option<UserContext>,
    ) -> Result<Arc<Subscription>, CoreError>
    where
        T: 'static,
        F: Fn(&Subscription, &CoreItem) + Send + Sync + 'static,
    {
        let options = SubscribeOptions {
            exclude_existing: false,
            wait_for_existing: false,
            exclude_data_body: false,
        };
        self.subscribe_with(TypeSelector::of::<T>(), filter, options, callback, context)
    }

    /// Delivers only items published after the subscription starts.
    pub fn subscribe_new_only<T, F>(
        self: &Arc<Self>,
        filter: WhereExpr,
        callback: F,
        context: Option<UserContext>,
    ) -> Result<Arc<Subscription>, CoreError>
    where
        T: 'static,
        F: Fn(&Subscription, &CoreItem) + Send + Sync + 'static,
    {
        let options = SubscribeOptions {
            exclude_existing: true,
            wait_for_existing: false,
            exclude_data_body: false,
        };
        self.subscribe_with(TypeSelector::of::<T>(), filter, options, callback, context)
    }

    /// Delivers items without their data body.
    pub fn subscribe_info_only<T, F>(
        self: &Arc<Self>,
        filter: WhereExpr,
        callback: F,
    ) -> Result<Arc<Subscription>, CoreError>
    where
        T: 'static,
        F: Fn(&Subscription, &CoreItem) + Send + Sync + 'static,
    {
        let options = SubscribeOptions {
            exclude_existing: false,
            wait_for_existing: false,
            exclude_data_body: true,
        };
        self.subscribe_with(TypeSelector::of::<T>(), filter, options, callback, None)
    }

    /// Starts an object subscription selecting items by type name.
    pub fn start_untyped_subscription<F>(
        self: &Arc<Self>,
        data_type_name: &str,
        where_expr: WhereExpr,
        callback: F,
        context: Option<UserContext>,
    ) -> Result<Arc<Subscription>, CoreError>
    where
        F: Fn(&Subscription, &CoreItem) + Send + Sync + 'static,
    {
        let options = SubscribeOptions {
            exclude_existing: false,
            wait_for_existing: false,
            exclude_data_body: false,
        };
        self.subscribe_with(
            TypeSelector::by_name(data_type_name),
            where_expr,
            options,
            callback,
            context,
        )
    }

    fn subscribe_with<F>(
        self: &Arc<Self>,
        type_selector: TypeSelector,
        filter: WhereExpr,
        options: SubscribeOptions,
        callback: F,
        context: Option<UserContext>,
    ) -> Result<Arc<Subscription>, CoreError>
    where
        F: Fn(&Subscription, &CoreItem) + Send + Sync + 'static,
    {
        let subscription = self.create_subscription();
        subscription.set_type_selector(type_selector)?;
        subscription.set_where_expr(filter)?;
        subscription.set_item_kind(ItemKind::Object)?;
        subscription.set_exclude_existing(options.exclude_existing)?;
        subscription.set_wait_for_existing(options.wait_for_existing)?;
        subscription.set_exclude_data_body(options.exclude_data_body)?;
        subscription.set_user_callback(callback);
        subscription.set_user_context(context);
        subscription.start()?;
        Ok(subscription)
    }

    /// Cancels one registered subscription. Returns false for unknown ids.
    pub fn unsubscribe(&self, subscription_id: Uuid) -> bool {
        let Some(subscription) = self.registered(subscription_id) else {
            return false;
        };
        if let Err(err) = subscription.cancel() {
            warn!(
                parent: &self.span,
                event = events::CLIENT_UNSUBSCRIBE_FAILED,
                component = COMPONENT,
                subscription_id = %subscription_id,
                err = %err,
                "unsubscribe failed"
            );
        }
        true
    }

    /// Begins cancelling every live subscription, then waits for all of them.
    pub fn unsubscribe_all(&self) {
        let subscriptions: Vec<Arc<Subscription>> = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter_map(Weak::upgrade)
            .collect();

        let mut pending = Vec::new();
        for subscription in &subscriptions {
            match subscription.cancel_begin() {
                Ok(Some(handle)) => pending.push(handle),
                Ok(None) => {}
                Err(err) => self.log_unsubscribe_failure(subscription.id(), &err),
            }
        }

        let ids: Vec<Uuid> = pending.iter().map(PendingCancel::id).collect();
        let results = futures::executor::block_on(futures::future::join_all(pending));
        for (id, result) in ids.into_iter().zip(results) {
            if let Err(err) = result {
                self.log_unsubscribe_failure(id, &err);
            }
        }
    }

    fn log_unsubscribe_failure(&self, subscription_id: Uuid, err: &CoreError) {
        warn!(
            parent: &self.span,
            event = events::CLIENT_UNSUBSCRIBE_FAILED,
            component = COMPONENT,
            subscription_id = %subscription_id,
            err = %err,
            "unsubscribe failed"
        );
    }

    fn registered(&self, subscription_id: Uuid) -> Option<Arc<Subscription>> {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&subscription_id)
            .and_then(Weak::upgrade)
    }

    pub fn registered_count(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|registered| registered.strong_count() > 0)
            .count()
    }

    pub fn active_count(&self) -> usize {
        self.store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .active
            .len()
    }

    // items

    /// Stores `item` as the latest version of its name and delivers it to
    /// matching live subscriptions on the calling thread. Returns the
    /// assigned update sequence number.
    pub fn publish(&self, mut item: CoreItem) -> Result<u64, CoreError> {
        self.ensure_accepting()?;

        let (usn, targets) = {
            let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
            store.last_usn += 1;
            item.usn = store.last_usn;

            let targets: Vec<(Arc<Subscription>, CoreItem)> = store
                .active
                .values()
                .filter(|query| matching::is_match(&query.config, &item))
                .filter_map(|query| {
                    query
                        .subscription
                        .upgrade()
                        .map(|subscription| (subscription, matching::shape(&query.config, &item)))
                })
                .collect();

            store.items.insert(item.name.clone(), item.clone());
            (item.usn, targets)
        };

        trace!(
            parent: &self.span,
            event = events::CLIENT_ITEM_PUBLISHED,
            component = COMPONENT,
            item = %fields::format_item(&item),
            targets = targets.len(),
            "item published"
        );

        for (subscription, shaped) in targets {
            subscription.process_update(&shaped);
        }
        Ok(usn)
    }

    /// The latest stored version of the named item.
    pub fn load_item(&self, name: &str) -> Option<CoreItem> {
        self.store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .items
            .get(name)
            .cloned()
    }

    /// Delivers `item` to one subscription, as a server notification would.
    ///
    /// Notifications for ids this client does not know are dropped.
    pub fn notify(&self, subscription_id: Uuid, item: &CoreItem) -> bool {
        match self.registered(subscription_id) {
            Some(subscription) => {
                subscription.process_update(item);
                true
            }
            None => {
                warn!(
                    parent: &self.span,
                    event = events::CLIENT_UNKNOWN_SUBSCRIPTION,
                    component = COMPONENT,
                    subscription_id = %subscription_id,
                    item = %fields::format_item(item),
                    "notification for unknown subscription ignored"
                );
                false
            }
        }
    }

    // core state

    pub fn state(&self) -> CoreState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Initial/Offline -> Connecting -> Connected.
    pub fn connect(&self) {
        self.change_state(CoreState::Connecting);
        self.change_state(CoreState::Connected);
    }

    pub fn go_offline(&self) {
        self.change_state(CoreState::Offline);
    }

    pub fn fault(&self) {
        self.change_state(CoreState::Faulted);
    }

    /// Cancels every live subscription and stops accepting requests.
    pub fn dispose(&self) {
        self.unsubscribe_all();
        self.change_state(CoreState::Disposed);
    }

    /// Moves to `new_state`, raising the state-change event if it differs.
    /// A disposed client never changes state again.
    pub fn change_state(&self, new_state: CoreState) -> bool {
        let old_state = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state == new_state || *state == CoreState::Disposed {
                return false;
            }
            std::mem::replace(&mut *state, new_state)
        };

        info!(
            parent: &self.span,
            event = events::CLIENT_STATE_CHANGE,
            component = COMPONENT,
            old_state = ?old_state,
            new_state = ?new_state,
            "core state changed"
        );

        for (handler, message) in self
            .state_handlers
            .raise(&CoreStateChange::new(old_state, new_state))
        {
            error!(
                parent: &self.span,
                event = events::STATE_HANDLER_PANICKED,
                component = COMPONENT,
                handler = ?handler,
                panic = %message,
                "client state handler failed"
            );
        }
        true
    }

    fn ensure_accepting(&self) -> Result<(), CoreError> {
        let state = self.state();
        if state.accepts_requests() {
            Ok(())
        } else {
            Err(CoreError::ClientUnavailable(state))
        }
    }

    fn replay_in_background(&self, subscription: &Arc<Subscription>, items: Vec<CoreItem>) {
        let subscription_id = subscription.id();
        let activation = subscription.activation_count();
        let weak = Arc::downgrade(subscription);
        let span = self.span.clone();

        let spawned = thread::Builder::new()
            .name(format!("replay-{}", subscription_id.simple()))
            .spawn(move || {
                let _entered = span.enter();
                for item in items {
                    match weak.upgrade() {
                        // A restart replays for itself.
                        Some(subscription)
                            if subscription.started()
                                && subscription.activation_count() == activation =>
                        {
                            subscription.process_update(&item)
                        }
                        _ => break,
                    }
                }
            });

        if let Err(err) = spawned {
            error!(
                parent: &self.span,
                event = events::CLIENT_REPLAY_FAILED,
                component = COMPONENT,
                subscription_id = %subscription_id,
                err = %err,
                "failed to spawn replay thread; existing items not delivered"
            );
        }
    }
}

impl CoreClient for LocalCoreClient {
    fn default_app_scopes(&self) -> Vec<String> {
        self.default_app_scopes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn start_subscription(&self, subscription: &Arc<Subscription>) -> Result<(), CoreError> {
        self.ensure_accepting()?;
        let subscription_id = subscription.id();
        if self.registered(subscription_id).is_none() {
            return Err(CoreError::InvalidSubscription(subscription_id));
        }

        let config = subscription.config();
        let existing = {
            let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
            let existing = if config.exclude_existing {
                Vec::new()
            } else {
                store.matching(&config)
            };
            store.active.insert(
                subscription_id,
                ActiveQuery {
                    subscription: Arc::downgrade(subscription),
                    config: config.clone(),
                },
            );
            existing
        };

        if self.settings.debug_requests {
            info!(
                parent: &self.span,
                event = events::CLIENT_SUBSCRIPTION_STARTED,
                component = COMPONENT,
                subscription_id = %subscription_id,
                item_kind = %config.item_kind,
                data_type = ?config.type_selector.type_name(),
                app_scopes = %fields::format_scopes(&config.app_scopes),
                where_expr = %config.where_expr,
                minimum_usn = config.minimum_usn,
                as_at_time = %config.as_at_time,
                exclude_existing = config.exclude_existing,
                existing = existing.len(),
                "subscription query"
            );
        } else {
            debug!(
                parent: &self.span,
                event = events::CLIENT_SUBSCRIPTION_STARTED,
                component = COMPONENT,
                subscription_id = %subscription_id,
                existing = existing.len(),
                "subscription started"
            );
        }

        if existing.is_empty() {
            return Ok(());
        }
        if config.wait_for_existing {
            for item in &existing {
                subscription.process_update(item);
            }
        } else {
            self.replay_in_background(subscription, existing);
        }
        Ok(())
    }

    fn cancel_subscription_begin(&self, subscription_id: Uuid) -> Result<PendingCancel, CoreError> {
        let removed = self
            .store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .active
            .remove(&subscription_id)
            .is_some();

        if removed {
            debug!(
                parent: &self.span,
                event = events::CLIENT_SUBSCRIPTION_CANCELLED,
                component = COMPONENT,
                subscription_id = %subscription_id,
                "subscription cancelled"
            );
        } else {
            trace!(
                parent: &self.span,
                component = COMPONENT,
                subscription_id = %subscription_id,
                "cancel for subscription that is not active"
            );
        }
        Ok(PendingCancel::completed(subscription_id))
    }

    fn attach_state_handler(&self, handler: StateChangeHandler) -> HandlerKey {
        self.state_handlers.add_shared(handler)
    }

    fn detach_state_handler(&self, key: HandlerKey) -> bool {
        self.state_handlers.remove(key)
    }
}
