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

//! Shared fixtures for subscription tests: a scriptable [`CoreClient`] fake
//! and a `tracing` layer that records log events for assertions.
//!
//! [`CoreClient`]: core_subscription::CoreClient

mod log_capture;
mod recording_client;

pub use log_capture::{capture_logs, init_logging, CapturedEvent, LogCapture};
pub use recording_client::RecordingCoreClient;
