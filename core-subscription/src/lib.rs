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

//! # core-subscription
//!
//! `core-subscription` implements the client-side lifecycle of a subscription to
//! an item cache: a consumer configures which items it wants, starts the
//! subscription against a [`CoreClient`], receives item updates through a
//! callback, hears about connection state changes, and later cancels or
//! disposes of it.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use core_subscription::{CoreItem, ItemKind, WhereExpr};
//! use local_core_client::{ClientSettings, LocalCoreClient};
//!
//! let client = LocalCoreClient::new(tracing::Span::none(), ClientSettings::default());
//! let received = Arc::new(Mutex::new(Vec::new()));
//!
//! let subscription = client.create_subscription();
//! subscription.set_item_kind(ItemKind::Object).unwrap();
//! subscription.set_data_type_name("Trade").unwrap();
//! subscription
//!     .set_where_expr(WhereExpr::equal("Desk", "Rates"))
//!     .unwrap();
//! let sink = received.clone();
//! subscription.set_user_callback(move |_subscription, item| {
//!     sink.lock().unwrap().push(item.name.clone());
//! });
//! subscription.start().unwrap();
//!
//! client
//!     .publish(
//!         CoreItem::new("T-1", "Trade", "Legacy", ItemKind::Object)
//!             .with_property("Desk", "Rates"),
//!     )
//!     .unwrap();
//! assert_eq!(*received.lock().unwrap(), vec!["T-1".to_string()]);
//!
//! subscription.cancel().unwrap();
//! ```
//!
//! ## Cancelling many subscriptions
//!
//! Cancellation is split in two so that a caller can begin tearing down many
//! subscriptions and then wait for all of them at once:
//!
//! ```
//! # use core_subscription::ItemKind;
//! # use local_core_client::{ClientSettings, LocalCoreClient};
//! # let client = LocalCoreClient::new(tracing::Span::none(), ClientSettings::default());
//! # let subscriptions: Vec<_> = (0..3)
//! #     .map(|_| {
//! #         let subscription = client.create_subscription();
//! #         subscription.set_item_kind(ItemKind::Object).unwrap();
//! #         subscription.start().unwrap();
//! #         subscription
//! #     })
//! #     .collect();
//! let pending: Vec<_> = subscriptions
//!     .iter()
//!     .map(|subscription| subscription.cancel_begin().unwrap())
//!     .collect();
//! for (subscription, pending) in subscriptions.iter().zip(pending) {
//!     subscription.cancel_end(pending).unwrap();
//! }
//! assert!(subscriptions.iter().all(|subscription| !subscription.started()));
//! ```
//!
//! ## Internal architecture map
//!
//! - API facade: [`Subscription`] and the [`CoreClient`] contract
//! - Control plane: lifecycle state machine and guarded configuration
//! - Data plane: isolated callback delivery, handler lists, pending cancels
//! - Runtime: per-subscription dispatch worker for state-change notifications
//! - Model: items, kinds, filter expressions, core connection states
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events. Each subscription records
//! into a child span of the logger span it was created with, and its dispatch
//! worker runs inside that span. Library code does not initialize a global
//! subscriber; binaries and tests do that at process boundaries.

mod api;
mod control_plane;
mod data_plane;
mod error;
mod model;
#[doc(hidden)]
pub mod observability;
mod runtime;

pub use api::client::{CoreClient, StateChangeHandler};
pub use api::subscription::{Subscription, SubscriptionCallback, UserContext};
pub use control_plane::config::SubscriptionConfig;
pub use control_plane::lifecycle::LifecycleState;
pub use data_plane::event_handlers::{EventHandlers, Handler, HandlerKey};
pub use data_plane::pending_cancel::{CancelCompleter, PendingCancel};
pub use error::CoreError;
pub use model::{
    app_scopes_or_default, CoreItem, CoreState, CoreStateChange, ItemKind, ItemProperties,
    TypeSelector, WhereExpr, LEGACY_APP_SCOPE,
};
pub use runtime::dispatch_queue::DispatchQueue;
