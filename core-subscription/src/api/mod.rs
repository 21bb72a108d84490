//! API facade layer.
//!
//! The outward surface is the [`Subscription`](subscription::Subscription)
//! itself plus the [`CoreClient`](client::CoreClient) contract that item-cache
//! clients implement to serve it.

pub mod client;
pub mod subscription;
