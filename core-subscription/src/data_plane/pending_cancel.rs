//! Handle for a cancellation that has been requested but may still be in flight.

use crate::error::CoreError;
use futures::channel::oneshot;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use uuid::Uuid;

/// Outstanding client-side teardown of one subscription.
///
/// Either pass it to [`crate::Subscription::cancel_end`] (blocking) or await
/// it, e.g. to cancel many subscriptions and wait for all of them together.
#[must_use = "a pending cancellation must be completed with cancel_end or awaited"]
#[derive(Debug)]
pub struct PendingCancel {
    id: Uuid,
    receiver: oneshot::Receiver<Result<(), CoreError>>,
}

/// Completes the [`PendingCancel`] it was created with.
#[derive(Debug)]
pub struct CancelCompleter {
    id: Uuid,
    sender: oneshot::Sender<Result<(), CoreError>>,
}

impl PendingCancel {
    /// Creates a handle and the completer the client uses to resolve it.
    pub fn new(id: Uuid) -> (CancelCompleter, PendingCancel) {
        let (sender, receiver) = oneshot::channel();
        (CancelCompleter { id, sender }, PendingCancel { id, receiver })
    }

    /// A handle whose teardown has already finished.
    pub fn completed(id: Uuid) -> Self {
        Self::resolved(id, Ok(()))
    }

    /// A handle whose teardown has already finished with `result`.
    pub fn resolved(id: Uuid, result: Result<(), CoreError>) -> Self {
        let (completer, pending) = Self::new(id);
        completer.complete(result);
        pending
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Blocks until the teardown completes.
    ///
    /// Parks the calling thread. Inside a current-thread tokio runtime this
    /// deadlocks if the completer runs as a task on that same runtime; await
    /// the handle there instead. The same holds for dropping or disposing an
    /// active subscription whose client completes cancellations that way.
    pub fn wait(self) -> Result<(), CoreError> {
        futures::executor::block_on(self)
    }
}

impl Future for PendingCancel {
    type Output = Result<(), CoreError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let id = this.id;
        Pin::new(&mut this.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(CoreError::CancelAbandoned(id))))
    }
}

impl CancelCompleter {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn complete(self, result: Result<(), CoreError>) {
        // The waiter may have been dropped; nothing is owed to it then.
        let _ = self.sender.send(result);
    }
}
