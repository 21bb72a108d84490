//! Structured logging vocabulary.
//!
//! Library code emits `tracing` events with a stable `event` field taken from
//! [`events`] and formats identifiers through [`fields`], so log scrapers can
//! match on `event=<name>` without parsing free-form messages.

pub mod events;
pub mod fields;
