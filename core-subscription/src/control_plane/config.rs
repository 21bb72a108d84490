//! Subscription configuration and the not-started guard protecting it.

use crate::control_plane::lifecycle::{Lifecycle, LifecycleState};
use crate::error::CoreError;
use crate::model::{ItemKind, TypeSelector, WhereExpr};
use crate::observability::events;
use chrono::{DateTime, Utc};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};
use tracing::debug;
use uuid::Uuid;

const COMPONENT: &str = "subscription_config";

/// What a subscription asks the client for.
#[derive(Clone, Debug, PartialEq)]
pub struct SubscriptionConfig {
    pub where_expr: WhereExpr,
    pub type_selector: TypeSelector,
    pub app_scopes: Vec<String>,
    pub exclude_deleted: bool,
    pub exclude_existing: bool,
    pub wait_for_existing: bool,
    pub exclude_data_body: bool,
    pub as_at_time: DateTime<Utc>,
    pub minimum_usn: u64,
    pub item_kind: ItemKind,
}

impl SubscriptionConfig {
    pub fn new(app_scopes: Vec<String>) -> Self {
        Self {
            where_expr: WhereExpr::All,
            type_selector: TypeSelector::Unspecified,
            app_scopes,
            exclude_deleted: false,
            exclude_existing: false,
            wait_for_existing: false,
            exclude_data_body: false,
            as_at_time: Utc::now(),
            minimum_usn: 0,
            item_kind: ItemKind::Undefined,
        }
    }
}

/// Fails with a usage error unless configuration may still change.
pub(crate) fn check_not_started(id: Uuid, state: LifecycleState) -> Result<(), CoreError> {
    match state {
        LifecycleState::Active => Err(CoreError::AlreadyStarted(id)),
        LifecycleState::Disposed => Err(CoreError::Disposed(id)),
        LifecycleState::Idle | LifecycleState::Cancelled => Ok(()),
    }
}

/// Configuration behind a lock that is only writable while the lifecycle allows it.
///
/// Writers check the lifecycle while holding the write lock and activation
/// holds the read lock across its state transition, so every accepted write
/// happens-before the subscription goes live.
pub(crate) struct GuardedConfig {
    id: Uuid,
    inner: RwLock<SubscriptionConfig>,
}

impl GuardedConfig {
    pub(crate) fn new(id: Uuid, config: SubscriptionConfig) -> Self {
        Self {
            id,
            inner: RwLock::new(config),
        }
    }

    pub(crate) fn read<R>(&self, read: impl FnOnce(&SubscriptionConfig) -> R) -> R {
        read(&self.inner.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub(crate) fn snapshot(&self) -> SubscriptionConfig {
        self.read(SubscriptionConfig::clone)
    }

    /// Holds configuration stable while the caller transitions the lifecycle.
    pub(crate) fn freeze(&self) -> RwLockReadGuard<'_, SubscriptionConfig> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn update(
        &self,
        lifecycle: &Lifecycle,
        field: &'static str,
        update: impl FnOnce(&mut SubscriptionConfig),
    ) -> Result<(), CoreError> {
        let mut config = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = check_not_started(self.id, lifecycle.load()) {
            debug!(
                event = events::SUBSCRIPTION_CONFIG_REJECTED,
                component = COMPONENT,
                subscription_id = %self.id,
                field,
                err = %err,
                "configuration change rejected"
            );
            return Err(err);
        }
        update(&mut config);
        Ok(())
    }
}
