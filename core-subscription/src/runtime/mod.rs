//! Runtime integration layer.
//!
//! Isolates worker-thread and async-runtime boundaries so threading behavior
//! stays localized: each subscription owns one [`DispatchQueue`] whose worker
//! drives a current-thread tokio runtime on its own thread.
//!
//! ```
//! use core_subscription::DispatchQueue;
//! use std::sync::mpsc;
//!
//! let queue = DispatchQueue::new("doc", tracing::Span::none());
//! let (tx, rx) = mpsc::channel();
//! queue.dispatch("hello", move |greeting| tx.send(greeting).unwrap());
//! assert_eq!(rx.recv().unwrap(), "hello");
//! ```

pub(crate) mod dispatch_queue;
pub(crate) mod worker_runtime;
