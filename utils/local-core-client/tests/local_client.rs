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

use core_subscription::observability::events;
use core_subscription::{
    CoreError, CoreItem, CoreState, CoreStateChange, ItemKind, Subscription, WhereExpr,
    LEGACY_APP_SCOPE,
};
use integration_test_utils::{capture_logs, init_logging};
use local_core_client::{ClientSettings, LocalCoreClient};
use serde_json::json;
use std::any::type_name;
use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

struct Trade;

type Received = Arc<Mutex<Vec<CoreItem>>>;

fn client() -> Arc<LocalCoreClient> {
    init_logging();
    LocalCoreClient::new(tracing::Span::none(), ClientSettings::default())
}

fn trade(name: &str, desk: &str) -> CoreItem {
    CoreItem::new(name, type_name::<Trade>(), LEGACY_APP_SCOPE, ItemKind::Object)
        .with_property("Desk", desk)
        .with_data(json!({ "notional": 1_000_000 }))
}

fn recorder() -> (Received, impl Fn(&Subscription, &CoreItem) + Send + Sync + 'static) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    (received, move |_subscription: &Subscription, item: &CoreItem| {
        sink.lock().unwrap().push(item.clone())
    })
}

fn names(received: &Received) -> Vec<String> {
    received
        .lock()
        .unwrap()
        .iter()
        .map(|item| item.name.clone())
        .collect()
}

fn wait_for(received: &Received, expected: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if received.lock().unwrap().len() >= expected {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn subscribe_replays_existing_then_streams_matching_items() {
    let client = client();
    client.publish(trade("T-1", "Rates")).unwrap();
    client.publish(trade("T-2", "Credit")).unwrap();

    let (received, callback) = recorder();
    let subscription = client
        .subscribe::<Trade, _>(WhereExpr::equal("Desk", "Rates"), callback, None)
        .unwrap();
    assert_eq!(names(&received), vec!["T-1"]);

    client.publish(trade("T-3", "Rates")).unwrap();
    client.publish(trade("T-4", "Credit")).unwrap();
    assert_eq!(names(&received), vec!["T-1", "T-3"]);
    assert!(subscription.started());
}

#[test]
fn new_only_subscription_skips_existing_items() {
    let client = client();
    client.publish(trade("T-1", "Rates")).unwrap();

    let (received, callback) = recorder();
    let _subscription = client
        .subscribe_new_only::<Trade, _>(WhereExpr::All, callback, None)
        .unwrap();
    client.publish(trade("T-2", "Rates")).unwrap();

    assert_eq!(names(&received), vec!["T-2"]);
}

#[test]
fn no_wait_subscription_replays_in_the_background() {
    let client = client();
    for index in 0..5 {
        client
            .publish(trade(&format!("T-{index}"), "Rates"))
            .unwrap();
    }

    let (received, callback) = recorder();
    let _subscription = client
        .subscribe_no_wait::<Trade, _>(WhereExpr::All, callback, None)
        .unwrap();

    assert!(wait_for(&received, 5));
    let mut usns: Vec<u64> = received.lock().unwrap().iter().map(|item| item.usn).collect();
    usns.sort_unstable();
    assert_eq!(usns, vec![1, 2, 3, 4, 5]);
}

#[test]
fn restart_is_not_fed_by_the_cancelled_background_replay() {
    let client = client();
    for index in 0..5 {
        client
            .publish(CoreItem::new(
                format!("Q{index}"),
                "Quote",
                LEGACY_APP_SCOPE,
                ItemKind::Object,
            ))
            .unwrap();
    }

    let (received, record) = recorder();
    let subscription = client
        .start_untyped_subscription(
            "Quote",
            WhereExpr::All,
            move |subscription, item| {
                std::thread::sleep(Duration::from_millis(30));
                record(subscription, item);
            },
            None,
        )
        .unwrap();
    std::thread::sleep(Duration::from_millis(10));
    subscription.cancel().unwrap();
    subscription.start().unwrap();

    assert!(wait_for(&received, 5));
    // Long enough for a stale replay to deliver the rest of its items.
    std::thread::sleep(Duration::from_millis(300));

    let names = names(&received);
    for index in 0..5 {
        assert!(names.contains(&format!("Q{index}")));
    }
    // At most the one item in flight at cancel time is seen twice.
    assert!(names.len() <= 6, "duplicate replay: {names:?}");
}

#[test]
fn info_only_subscription_receives_no_body() {
    let client = client();
    client.publish(trade("T-1", "Rates")).unwrap();

    let (received, callback) = recorder();
    let _subscription = client
        .subscribe_info_only::<Trade, _>(WhereExpr::All, callback)
        .unwrap();
    client.publish(trade("T-2", "Rates")).unwrap();

    assert!(wait_for(&received, 2));
    assert!(received.lock().unwrap().iter().all(|item| item.data.is_none()));
    assert!(client.load_item("T-2").unwrap().data.is_some());
}

#[test]
fn query_options_filter_by_usn_deletion_and_scope() {
    let client = client();
    client.publish(trade("T-1", "Rates")).unwrap();
    client.publish(trade("T-2", "Rates").into_deleted()).unwrap();
    client.publish(trade("T-3", "Rates")).unwrap();
    let mut other_scope = trade("T-4", "Rates");
    other_scope.app_scope = "Pricing".to_string();
    client.publish(other_scope).unwrap();

    let (received, callback) = recorder();
    let subscription = client.create_typed_subscription::<Trade>(WhereExpr::All).unwrap();
    subscription.set_item_kind(ItemKind::Object).unwrap();
    subscription.set_wait_for_existing(true).unwrap();
    subscription.set_exclude_deleted(true).unwrap();
    subscription.set_minimum_usn(1).unwrap();
    subscription.set_user_callback(callback);
    subscription.start().unwrap();

    assert_eq!(names(&received), vec!["T-3"]);
}

#[test]
fn cancelled_subscription_receives_nothing_and_can_restart() {
    let client = client();
    let (received, callback) = recorder();
    let subscription = client
        .subscribe::<Trade, _>(WhereExpr::All, callback, None)
        .unwrap();
    assert_eq!(client.active_count(), 1);

    subscription.cancel().unwrap();
    assert_eq!(client.active_count(), 0);
    client.publish(trade("T-1", "Rates")).unwrap();
    assert!(names(&received).is_empty());

    subscription.start().unwrap();
    assert_eq!(names(&received), vec!["T-1"]);
}

#[test]
fn unsubscribe_all_cancels_every_live_subscription() {
    let client = client();
    let subscriptions: Vec<_> = (0..3)
        .map(|_| {
            client
                .subscribe::<Trade, _>(WhereExpr::All, |_, _| {}, None)
                .unwrap()
        })
        .collect();
    let idle = client.create_subscription();
    assert_eq!(client.active_count(), 3);

    assert!(client.unsubscribe(subscriptions[0].id()));
    assert!(!client.unsubscribe(Uuid::new_v4()));
    client.unsubscribe_all();

    assert_eq!(client.active_count(), 0);
    assert!(subscriptions.iter().all(|subscription| !subscription.started()));
    assert!(!idle.started());
    assert_eq!(client.registered_count(), 4);
}

#[test]
fn dropped_subscription_is_forgotten() {
    let client = client();
    let subscription = client
        .subscribe::<Trade, _>(WhereExpr::All, |_, _| {}, None)
        .unwrap();
    drop(subscription);

    assert_eq!(client.active_count(), 0);
    assert_eq!(client.registered_count(), 0);
    client.publish(trade("T-1", "Rates")).unwrap();
}

#[test]
fn unavailable_client_rejects_start_and_publish() {
    let client = client();
    client.fault();

    let subscription = client.create_typed_subscription::<Trade>(WhereExpr::All).unwrap();
    subscription.set_item_kind(ItemKind::Object).unwrap();
    assert_eq!(
        subscription.start(),
        Err(CoreError::ClientUnavailable(CoreState::Faulted))
    );
    assert!(!subscription.started());
    assert_eq!(
        client.publish(trade("T-1", "Rates")),
        Err(CoreError::ClientUnavailable(CoreState::Faulted))
    );

    client.connect();
    subscription.start().unwrap();
}

#[test]
fn notifications_for_unknown_ids_are_ignored_with_a_warning() {
    let client = client();
    let unknown = Uuid::new_v4();

    let (delivered, logs) = capture_logs(|| client.notify(unknown, &trade("T-1", "Rates")));

    assert!(!delivered);
    let warnings = logs.named(events::CLIENT_UNKNOWN_SUBSCRIPTION);
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].field("subscription_id"),
        Some(unknown.to_string().as_str())
    );
}

#[test]
fn client_state_changes_reach_live_subscriptions_in_order() {
    let client = client();
    let subscription = client
        .subscribe::<Trade, _>(WhereExpr::All, |_, _| {}, None)
        .unwrap();
    let (tx, rx) = mpsc::channel();
    subscription.on_state_change(move |change: &CoreStateChange| tx.send(*change).unwrap());

    client.connect();
    client.go_offline();
    assert!(!client.change_state(CoreState::Offline));
    client.connect();

    let received: Vec<_> = (0..5)
        .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap().new_state)
        .collect();
    assert_eq!(
        received,
        vec![
            CoreState::Connecting,
            CoreState::Connected,
            CoreState::Offline,
            CoreState::Connecting,
            CoreState::Connected,
        ]
    );
}

#[test]
fn dispose_cancels_subscriptions_and_is_final() {
    let client = client();
    let subscription = client
        .subscribe::<Trade, _>(WhereExpr::All, |_, _| {}, None)
        .unwrap();

    client.dispose();
    assert!(!subscription.started());
    assert_eq!(client.state(), CoreState::Disposed);
    assert!(!client.change_state(CoreState::Connected));
    assert_eq!(
        subscription.start(),
        Err(CoreError::ClientUnavailable(CoreState::Disposed))
    );
}

#[test]
fn default_scopes_come_from_settings() {
    init_logging();
    let settings = ClientSettings::from_json(r#"{ "default_app_scopes": ["Pricing"] }"#).unwrap();
    let client = LocalCoreClient::new(tracing::Span::none(), settings);
    assert_eq!(client.create_subscription().app_scopes(), vec!["Pricing"]);

    client.set_default_app_scopes(None);
    assert_eq!(
        client.create_subscription().app_scopes(),
        vec![LEGACY_APP_SCOPE]
    );
}
