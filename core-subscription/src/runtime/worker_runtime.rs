//! Runtime helper for spawning dispatch worker loops.

use std::future::Future;
use std::io;
use std::thread;
use tokio::runtime::{Builder, Runtime};

/// Runs `run_loop` to completion on a dedicated named thread driving its own
/// current-thread runtime.
///
/// The runtime is built on the calling thread so construction failures reach
/// the caller instead of killing the worker.
pub(crate) fn spawn_worker_loop<Fut>(
    thread_name: String,
    run_loop: Fut,
) -> io::Result<thread::JoinHandle<()>>
where
    Fut: Future<Output = ()> + Send + 'static,
{
    let runtime: Runtime = Builder::new_current_thread().enable_all().build()?;

    thread::Builder::new()
        .name(thread_name)
        .spawn(move || runtime.block_on(run_loop))
}
