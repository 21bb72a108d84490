//! Data-plane layer.
//!
//! Delivery primitives shared by both notification paths: fault-isolated
//! callback invocation, multi-subscriber events, and the pending-cancel handle
//! returned by the split cancellation protocol.

pub(crate) mod event_handlers;
pub(crate) mod pending_cancel;
pub(crate) mod update_delivery;
