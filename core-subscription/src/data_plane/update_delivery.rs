//! Fault-isolated invocation of user code.

use crate::observability::fields;
use std::panic::{self, AssertUnwindSafe};

/// Runs `callback`, converting a panic into its message.
///
/// User callbacks run on client delivery threads and dispatch workers; a
/// panic must never unwind into those.
pub(crate) fn invoke_isolated<R>(callback: impl FnOnce() -> R) -> Result<R, String> {
    panic::catch_unwind(AssertUnwindSafe(callback))
        .map_err(|payload| fields::panic_message(payload.as_ref()))
}
