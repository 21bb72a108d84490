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

use clap::Parser;
use core_subscription::{CoreError, CoreItem, CoreStateChange, ItemKind, WhereExpr};
use local_core_client::{ClientSettings, LocalCoreClient};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tracing::{info, info_span};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const QUOTE_TYPE: &str = "Quote";
const CURRENCIES: [&str; 3] = ["AUD", "NZD", "USD"];

#[derive(Debug, Parser)]
#[command(name = "subscription-demo")]
#[command(about = "Runs a subscription against an in-memory core client")]
struct Cli {
    /// Client settings file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Currency the subscription filters on
    #[arg(long, default_value = "AUD")]
    currency: String,

    /// Number of quotes published while the subscription is live
    #[arg(long, default_value_t = 6)]
    quotes: usize,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn quote(index: usize, currency: &str) -> CoreItem {
    CoreItem::new(
        format!("{currency}.{index}Y"),
        QUOTE_TYPE,
        "Legacy",
        ItemKind::Object,
    )
    .with_property("Currency", currency)
    .with_property("Tenor", format!("{index}Y"))
    .with_data(json!({ "rate": 4.0 + index as f64 / 10.0 }))
}

fn run(cli: Cli) -> Result<(), CoreError> {
    let settings = match &cli.config {
        Some(path) => ClientSettings::from_file(path)?,
        None => ClientSettings::default(),
    };

    let client = LocalCoreClient::new(info_span!("demo"), settings);
    client.connect();
    client.publish(quote(0, &cli.currency))?;

    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = delivered.clone();
    let subscription = client.create_untyped_subscription(
        QUOTE_TYPE,
        WhereExpr::equal("Currency", cli.currency.as_str()),
    )?;
    subscription.set_item_kind(ItemKind::Object)?;
    subscription.set_wait_for_existing(true)?;
    subscription.set_user_callback(move |subscription, item| {
        counter.fetch_add(1, Ordering::SeqCst);
        println!(
            "[{}] {} usn={} data={}",
            subscription.id(),
            item.name,
            item.usn,
            item.data.clone().unwrap_or_default()
        );
    });

    let (changes_tx, changes_rx) = mpsc::channel::<CoreStateChange>();
    subscription.on_state_change(move |change| {
        let _ = changes_tx.send(*change);
    });
    subscription.start()?;

    for index in 1..=cli.quotes {
        client.publish(quote(index, CURRENCIES[index % CURRENCIES.len()]))?;
    }

    client.go_offline();
    client.connect();

    subscription.cancel()?;
    client.publish(quote(cli.quotes + 1, &cli.currency))?;

    let changes: Vec<CoreStateChange> =
        std::iter::from_fn(|| changes_rx.recv_timeout(Duration::from_millis(200)).ok()).collect();
    for change in &changes {
        println!("core state: {:?} -> {:?}", change.old_state, change.new_state);
    }

    info!(
        delivered = delivered.load(Ordering::SeqCst),
        state_changes = changes.len(),
        activations = subscription.activation_count(),
        "demo finished"
    );

    subscription.dispose()?;
    client.dispose();
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("subscription-demo failed: {error}");
            ExitCode::from(2)
        }
    }
}
