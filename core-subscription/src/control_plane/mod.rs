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

//! Control-plane layer.
//!
//! Owns the subscription lifecycle state machine and the configuration guard.
//! Configuration is writable only while the lifecycle is idle or cancelled;
//! activation is a single atomic transition taken with configuration frozen.
//!
//! ```
//! use core_subscription::{CoreError, ItemKind};
//! use local_core_client::{ClientSettings, LocalCoreClient};
//!
//! let client = LocalCoreClient::new(tracing::Span::none(), ClientSettings::default());
//! let subscription = client.create_subscription();
//!
//! subscription.set_item_kind(ItemKind::Object).unwrap();
//! subscription.start().unwrap();
//!
//! // Live subscriptions reject configuration changes.
//! assert!(matches!(
//!     subscription.set_minimum_usn(10),
//!     Err(CoreError::AlreadyStarted(_))
//! ));
//!
//! subscription.cancel().unwrap();
//! subscription.set_minimum_usn(10).unwrap();
//! ```

pub(crate) mod config;
pub(crate) mod lifecycle;
