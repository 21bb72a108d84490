//! Stable event names used in the `event` field of log records.

pub const SUBSCRIPTION_CREATED: &str = "subscription_created";
pub const SUBSCRIPTION_START: &str = "subscription_start";
pub const SUBSCRIPTION_START_FAILED: &str = "subscription_start_failed";
pub const SUBSCRIPTION_CANCEL: &str = "subscription_cancel";
pub const SUBSCRIPTION_DISPOSE: &str = "subscription_dispose";
pub const SUBSCRIPTION_CONFIG_REJECTED: &str = "subscription_config_rejected";

pub const UPDATE_DROPPED_INACTIVE: &str = "update_dropped_inactive";
pub const UPDATE_CALLBACK_PANICKED: &str = "update_callback_panicked";

pub const STATE_CHANGE_QUEUED: &str = "state_change_queued";
pub const STATE_CHANGE_DISCARDED: &str = "state_change_discarded";
pub const STATE_HANDLER_PANICKED: &str = "state_handler_panicked";

pub const DISPATCH_WORKER_START: &str = "dispatch_worker_start";
pub const DISPATCH_WORKER_STOP: &str = "dispatch_worker_stop";
pub const DISPATCH_JOB_PANICKED: &str = "dispatch_job_panicked";

pub const CLIENT_STATE_CHANGE: &str = "client_state_change";
pub const CLIENT_SUBSCRIPTION_REGISTERED: &str = "client_subscription_registered";
pub const CLIENT_SUBSCRIPTION_STARTED: &str = "client_subscription_started";
pub const CLIENT_SUBSCRIPTION_CANCELLED: &str = "client_subscription_cancelled";
pub const CLIENT_UNKNOWN_SUBSCRIPTION: &str = "client_unknown_subscription";
pub const CLIENT_REPLAY_FAILED: &str = "client_replay_failed";
pub const CLIENT_ITEM_PUBLISHED: &str = "client_item_published";
pub const CLIENT_UNSUBSCRIBE_FAILED: &str = "client_unsubscribe_failed";
