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

use crate::api::client::CoreClient;
use crate::control_plane::config::{check_not_started, GuardedConfig, SubscriptionConfig};
use crate::control_plane::lifecycle::{Lifecycle, LifecycleState};
use crate::data_plane::event_handlers::{EventHandlers, HandlerKey};
use crate::data_plane::pending_cancel::PendingCancel;
use crate::data_plane::update_delivery::invoke_isolated;
use crate::error::CoreError;
use crate::model::{
    app_scopes_or_default, CoreItem, CoreStateChange, ItemKind, TypeSelector, WhereExpr,
};
use crate::observability::{events, fields};
use crate::runtime::dispatch_queue::DispatchQueue;
use chrono::{DateTime, Utc};
use std::any::{Any, TypeId};
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, debug_span, error, trace, warn, Span};
use uuid::Uuid;

const COMPONENT: &str = "subscription";

/// Receives each data-item update, on the thread the client delivered it on.
pub type SubscriptionCallback = Arc<dyn Fn(&Subscription, &CoreItem) + Send + Sync>;

/// Opaque value the application attaches to a subscription.
pub type UserContext = Arc<dyn Any + Send + Sync>;

/// One registered interest in a stream of item changes.
///
/// A subscription is configured while idle, goes live with [`start`](Self::start),
/// and can be cancelled and restarted until it is disposed. Configuration
/// setters fail with [`CoreError::AlreadyStarted`] while it is live.
///
/// Two independent notification paths reach the application:
/// - data items, through the user callback, synchronously on the client's
///   delivery thread (a slow callback holds that thread up);
/// - core state changes, through [`on_state_change`](Self::on_state_change)
///   handlers, asynchronously and in order on the subscription's own
///   dispatch worker.
pub struct Subscription {
    id: Uuid,
    span: Span,
    client: Arc<dyn CoreClient>,
    lifecycle: Lifecycle,
    config: GuardedConfig,
    user_callback: RwLock<Option<SubscriptionCallback>>,
    user_context: RwLock<Option<UserContext>>,
    on_state_change: Arc<EventHandlers<CoreStateChange>>,
    client_state_handler: Mutex<Option<HandlerKey>>,
    // Serialises activation against the settling of an earlier start.
    activation_gate: Mutex<()>,
    dispatch_queue: DispatchQueue,
}

impl Subscription {
    /// Creates an idle subscription. Nothing is sent to `client` until `start`.
    pub fn new(logger: Span, client: Arc<dyn CoreClient>) -> Arc<Self> {
        let id = Uuid::new_v4();
        let span = debug_span!(parent: &logger, "subscription", subscription_id = %id);
        let app_scopes = app_scopes_or_default(Some(client.default_app_scopes()));

        span.in_scope(|| {
            debug!(
                event = events::SUBSCRIPTION_CREATED,
                component = COMPONENT,
                subscription_id = %id,
                app_scopes = %fields::format_scopes(&app_scopes),
                "subscription created"
            );
        });

        Arc::new(Self {
            id,
            dispatch_queue: DispatchQueue::new(&id.simple().to_string(), span.clone()),
            span,
            client,
            lifecycle: Lifecycle::new(),
            config: GuardedConfig::new(id, SubscriptionConfig::new(app_scopes)),
            user_callback: RwLock::new(None),
            user_context: RwLock::new(None),
            on_state_change: Arc::new(EventHandlers::new()),
            client_state_handler: Mutex::new(None),
            activation_gate: Mutex::new(()),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// True while the subscription is registered and delivering.
    pub fn started(&self) -> bool {
        self.lifecycle.is_active()
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.load()
    }

    /// Number of successful activations over the subscription's lifetime.
    pub fn activation_count(&self) -> u64 {
        self.lifecycle.activations()
    }

    pub fn config(&self) -> SubscriptionConfig {
        self.config.snapshot()
    }

    // configuration getters

    pub fn where_expr(&self) -> WhereExpr {
        self.config.read(|config| config.where_expr.clone())
    }

    pub fn type_selector(&self) -> TypeSelector {
        self.config.read(|config| config.type_selector.clone())
    }

    pub fn data_type(&self) -> Option<TypeId> {
        self.config.read(|config| config.type_selector.type_id())
    }

    pub fn data_type_name(&self) -> Option<String> {
        self.config
            .read(|config| config.type_selector.type_name().map(str::to_string))
    }

    pub fn exclude_deleted(&self) -> bool {
        self.config.read(|config| config.exclude_deleted)
    }

    pub fn exclude_existing(&self) -> bool {
        self.config.read(|config| config.exclude_existing)
    }

    pub fn wait_for_existing(&self) -> bool {
        self.config.read(|config| config.wait_for_existing)
    }

    pub fn exclude_data_body(&self) -> bool {
        self.config.read(|config| config.exclude_data_body)
    }

    pub fn as_at_time(&self) -> DateTime<Utc> {
        self.config.read(|config| config.as_at_time)
    }

    pub fn minimum_usn(&self) -> u64 {
        self.config.read(|config| config.minimum_usn)
    }

    pub fn item_kind(&self) -> ItemKind {
        self.config.read(|config| config.item_kind)
    }

    pub fn app_scopes(&self) -> Vec<String> {
        self.config.read(|config| config.app_scopes.clone())
    }

    // configuration setters

    pub fn set_where_expr(&self, where_expr: WhereExpr) -> Result<(), CoreError> {
        self.config
            .update(&self.lifecycle, "where_expr", |config| config.where_expr = where_expr)
    }

    pub fn set_type_selector(&self, type_selector: TypeSelector) -> Result<(), CoreError> {
        self.config.update(&self.lifecycle, "type_selector", |config| {
            config.type_selector = type_selector
        })
    }

    /// Selects `T`; the data type name becomes `T`'s fully qualified name.
    pub fn set_data_type<T: 'static>(&self) -> Result<(), CoreError> {
        self.set_type_selector(TypeSelector::of::<T>())
    }

    /// Selects a type by name only; any runtime data type is cleared.
    pub fn set_data_type_name(&self, name: impl Into<String>) -> Result<(), CoreError> {
        self.set_type_selector(TypeSelector::by_name(name))
    }

    pub fn set_exclude_deleted(&self, exclude_deleted: bool) -> Result<(), CoreError> {
        self.config.update(&self.lifecycle, "exclude_deleted", |config| {
            config.exclude_deleted = exclude_deleted
        })
    }

    pub fn set_exclude_existing(&self, exclude_existing: bool) -> Result<(), CoreError> {
        self.config.update(&self.lifecycle, "exclude_existing", |config| {
            config.exclude_existing = exclude_existing
        })
    }

    pub fn set_wait_for_existing(&self, wait_for_existing: bool) -> Result<(), CoreError> {
        self.config.update(&self.lifecycle, "wait_for_existing", |config| {
            config.wait_for_existing = wait_for_existing
        })
    }

    pub fn set_exclude_data_body(&self, exclude_data_body: bool) -> Result<(), CoreError> {
        self.config.update(&self.lifecycle, "exclude_data_body", |config| {
            config.exclude_data_body = exclude_data_body
        })
    }

    pub fn set_as_at_time(&self, as_at_time: DateTime<Utc>) -> Result<(), CoreError> {
        self.config
            .update(&self.lifecycle, "as_at_time", |config| config.as_at_time = as_at_time)
    }

    pub fn set_minimum_usn(&self, minimum_usn: u64) -> Result<(), CoreError> {
        self.config.update(&self.lifecycle, "minimum_usn", |config| {
            config.minimum_usn = minimum_usn
        })
    }

    pub fn set_item_kind(&self, item_kind: ItemKind) -> Result<(), CoreError> {
        self.config
            .update(&self.lifecycle, "item_kind", |config| config.item_kind = item_kind)
    }

    /// `None` or an empty list stores the default legacy scope.
    pub fn set_app_scopes(&self, app_scopes: Option<Vec<String>>) -> Result<(), CoreError> {
        self.config.update(&self.lifecycle, "app_scopes", |config| {
            config.app_scopes = app_scopes_or_default(app_scopes)
        })
    }

    // user hooks

    pub fn set_user_callback<F>(&self, callback: F)
    where
        F: Fn(&Subscription, &CoreItem) + Send + Sync + 'static,
    {
        *self
            .user_callback
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    pub fn clear_user_callback(&self) {
        *self
            .user_callback
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn set_user_context(&self, context: Option<UserContext>) {
        *self
            .user_context
            .write()
            .unwrap_or_else(PoisonError::into_inner) = context;
    }

    pub fn user_context(&self) -> Option<UserContext> {
        self.user_context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The user context, if one is set and it is a `T`.
    pub fn user_context_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.user_context()
            .and_then(|context| context.downcast::<T>().ok())
    }

    /// Attaches a handler for core state changes, delivered on the dispatch worker.
    pub fn on_state_change<F>(&self, handler: F) -> HandlerKey
    where
        F: Fn(&CoreStateChange) + Send + Sync + 'static,
    {
        self.on_state_change.add(handler)
    }

    pub fn remove_state_change_handler(&self, key: HandlerKey) -> bool {
        self.on_state_change.remove(key)
    }

    // lifecycle

    /// Registers the subscription with its client.
    ///
    /// If the client rejects the registration, the subscription returns to
    /// the state it was in and the client's error is returned unchanged.
    pub fn start(self: &Arc<Self>) -> Result<(), CoreError> {
        let _entered = self.span.enter();

        let (previous, generation) = {
            let _gate = self.lock_activation();
            let config = self.config.freeze();
            check_not_started(self.id, self.lifecycle.load())?;
            if !config.item_kind.is_defined() {
                return Err(CoreError::MissingItemKind(self.id));
            }
            let previous = match self.lifecycle.try_activate() {
                Ok(previous) => previous,
                Err(current) => {
                    return Err(check_not_started(self.id, current)
                        .err()
                        .unwrap_or(CoreError::AlreadyStarted(self.id)))
                }
            };
            self.attach_to_client();
            (previous, self.lifecycle.activations())
        };

        debug!(
            event = events::SUBSCRIPTION_START,
            component = COMPONENT,
            subscription_id = %self.id,
            data_type = ?self.data_type_name(),
            where_expr = %self.where_expr(),
            "starting subscription"
        );

        let registered = self.client.start_subscription(self);

        // A newer activation owns the lifecycle and the client registration.
        let _gate = self.lock_activation();
        let superseded = self.lifecycle.activations() != generation;

        if let Err(err) = registered {
            if !superseded {
                self.lifecycle.rollback(previous);
                // A cancel racing the attach may have found no key to detach.
                if !self.lifecycle.is_active() {
                    self.detach_from_client();
                }
            }
            warn!(
                event = events::SUBSCRIPTION_START_FAILED,
                component = COMPONENT,
                subscription_id = %self.id,
                err = %err,
                "client rejected subscription start"
            );
            return Err(err);
        }

        if !superseded && !self.lifecycle.is_active() {
            // Cancelled or disposed while the client was registering us.
            self.detach_from_client();
            let pending = self.client.cancel_subscription_begin(self.id)?;
            self.client.cancel_subscription_end(pending)?;
        }

        Ok(())
    }

    /// Cancels and waits for the client to finish tearing down.
    pub fn cancel(&self) -> Result<(), CoreError> {
        let pending = self.cancel_begin()?;
        self.cancel_end(pending)
    }

    /// Requests cancellation without waiting for it.
    ///
    /// Returns `Ok(None)` if the subscription is not live. Otherwise the
    /// subscription stops being active immediately and the returned handle
    /// must be completed with [`cancel_end`](Self::cancel_end) or awaited.
    pub fn cancel_begin(&self) -> Result<Option<PendingCancel>, CoreError> {
        let _entered = self.span.enter();

        if !self.lifecycle.try_deactivate() {
            trace!(
                component = COMPONENT,
                subscription_id = %self.id,
                "cancel on inactive subscription"
            );
            return Ok(None);
        }

        self.detach_from_client();
        debug!(
            event = events::SUBSCRIPTION_CANCEL,
            component = COMPONENT,
            subscription_id = %self.id,
            "cancelling subscription"
        );

        self.client.cancel_subscription_begin(self.id).map(Some)
    }

    pub fn cancel_end(&self, pending: Option<PendingCancel>) -> Result<(), CoreError> {
        match pending {
            Some(pending) => self.client.cancel_subscription_end(pending),
            None => Ok(()),
        }
    }

    /// Cancels if live, detaches from the client and closes the dispatch queue.
    ///
    /// State changes already queued are still delivered; later ones are
    /// discarded. Repeated calls are no-ops.
    pub fn dispose(&self) -> Result<(), CoreError> {
        let _entered = self.span.enter();

        let previous = self.lifecycle.dispose();
        if previous == LifecycleState::Disposed {
            return Ok(());
        }

        self.detach_from_client();
        let result = if previous == LifecycleState::Active {
            self.client
                .cancel_subscription_begin(self.id)
                .and_then(|pending| self.client.cancel_subscription_end(pending))
        } else {
            Ok(())
        };
        self.dispatch_queue.close();

        match &result {
            Ok(()) => debug!(
                event = events::SUBSCRIPTION_DISPOSE,
                component = COMPONENT,
                subscription_id = %self.id,
                "subscription disposed"
            ),
            Err(err) => warn!(
                event = events::SUBSCRIPTION_DISPOSE,
                component = COMPONENT,
                subscription_id = %self.id,
                err = %err,
                "subscription disposed; client cancellation failed"
            ),
        }
        result
    }

    // collaborator entry points

    /// Delivers one data-item update to the user callback.
    ///
    /// Updates for a subscription that is not live are dropped with a warning.
    /// A panicking callback is logged and does not affect later deliveries.
    pub fn process_update(&self, item: &CoreItem) {
        if !self.lifecycle.is_active() {
            warn!(
                event = events::UPDATE_DROPPED_INACTIVE,
                component = COMPONENT,
                subscription_id = %self.id,
                item = %fields::format_item(item),
                "subscription not started - ignoring update"
            );
            return;
        }

        let callback = self
            .user_callback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(callback) = callback else {
            trace!(component = COMPONENT, subscription_id = %self.id, "no user callback");
            return;
        };

        if let Err(message) = invoke_isolated(|| callback(self, item)) {
            error!(
                event = events::UPDATE_CALLBACK_PANICKED,
                component = COMPONENT,
                subscription_id = %self.id,
                item = %fields::format_item(item),
                panic = %message,
                "user callback failed"
            );
        }
    }

    /// Queues a core state change for the `on_state_change` handlers.
    pub fn notify_user_state_change(&self, change: CoreStateChange) {
        let handlers = self.on_state_change.clone();
        let id = self.id;

        let queued = self.dispatch_queue.dispatch(change, move |change| {
            for (handler, message) in handlers.raise(&change) {
                error!(
                    event = events::STATE_HANDLER_PANICKED,
                    component = COMPONENT,
                    subscription_id = %id,
                    handler = ?handler,
                    panic = %message,
                    "state change handler failed"
                );
            }
        });

        if queued {
            trace!(
                event = events::STATE_CHANGE_QUEUED,
                component = COMPONENT,
                subscription_id = %id,
                change = ?change,
                "state change queued"
            );
        } else {
            debug!(
                event = events::STATE_CHANGE_DISCARDED,
                component = COMPONENT,
                subscription_id = %id,
                change = ?change,
                "state change discarded after dispose"
            );
        }
    }

    fn lock_activation(&self) -> MutexGuard<'_, ()> {
        self.activation_gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn attach_to_client(self: &Arc<Self>) {
        let subscription = Arc::downgrade(self);
        let key = self
            .client
            .attach_state_handler(Arc::new(move |change: &CoreStateChange| {
                if let Some(subscription) = subscription.upgrade() {
                    subscription.notify_user_state_change(*change);
                }
            }));

        let replaced = self
            .client_state_handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(key);
        if let Some(replaced) = replaced {
            self.client.detach_state_handler(replaced);
        }
    }

    fn detach_from_client(&self) {
        let key = self
            .client_state_handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(key) = key {
            self.client.detach_state_handler(key);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Failures are already logged by dispose.
        let _ = self.dispose();
    }
}

impl Debug for Subscription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("state", &self.lifecycle.load())
            .field("config", &self.config.snapshot())
            .finish_non_exhaustive()
    }
}
