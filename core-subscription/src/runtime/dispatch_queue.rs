//! Ordered, single-consumer dispatch queue backed by a dedicated worker.

use crate::observability::{events, fields};
use crate::runtime::worker_runtime::spawn_worker_loop;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, trace, Instrument, Span};

const COMPONENT: &str = "dispatch_queue";

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs dispatched jobs one at a time, in submission order, off the caller's thread.
///
/// `dispatch` never blocks. A job that panics is logged and the worker moves
/// on to the next one. Closing the queue lets already-queued jobs finish and
/// discards anything dispatched afterwards.
pub struct DispatchQueue {
    name: String,
    sender: Mutex<Option<UnboundedSender<Job>>>,
}

impl DispatchQueue {
    /// Creates the queue and starts its worker inside `span`.
    pub fn new(name: &str, span: Span) -> Self {
        let (tx, rx) = unbounded_channel::<Job>();
        let worker_name = name.to_string();

        let sender = match spawn_worker_loop(
            format!("dispatch-{name}"),
            Self::dispatch_loop(worker_name, rx).instrument(span),
        ) {
            Ok(_detached) => Some(tx),
            Err(err) => {
                error!(
                    component = COMPONENT,
                    queue = name,
                    err = %err,
                    "unable to start dispatch worker; queue is closed"
                );
                None
            }
        };

        Self {
            name: name.to_string(),
            sender: Mutex::new(sender),
        }
    }

    async fn dispatch_loop(name: String, mut receiver: UnboundedReceiver<Job>) {
        debug!(
            event = events::DISPATCH_WORKER_START,
            component = COMPONENT,
            queue = %name,
            "dispatch worker started"
        );

        while let Some(job) = receiver.recv().await {
            trace!(component = COMPONENT, queue = %name, "running dispatched job");
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                error!(
                    event = events::DISPATCH_JOB_PANICKED,
                    component = COMPONENT,
                    queue = %name,
                    panic = %fields::panic_message(payload.as_ref()),
                    "dispatched job panicked"
                );
            }
        }

        debug!(
            event = events::DISPATCH_WORKER_STOP,
            component = COMPONENT,
            queue = %name,
            "dispatch worker stopped"
        );
    }

    /// Queues `handler(data)`. Returns false, discarding the job, if the queue is closed.
    pub fn dispatch<T, F>(&self, data: T, handler: F) -> bool
    where
        T: Send + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = sender.as_ref() else {
            debug!(component = COMPONENT, queue = %self.name, "dispatch on closed queue");
            return false;
        };

        sender.send(Box::new(move || handler(data))).is_ok()
    }

    /// Stops accepting jobs. Returns true for the call that actually closed the queue.
    ///
    /// Does not wait for the worker, so it is safe to call from inside a job.
    pub fn close(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl Drop for DispatchQueue {
    fn drop(&mut self) {
        self.close();
    }
}
