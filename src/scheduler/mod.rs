//! Execution scheduling for independent detector work.
//!
//! The scanner fans out independent detectors (age, geo, TLS, intel) and
//! whole-batch scans. On a multi-threaded runtime those futures run
//! concurrently; on a current-thread runtime (tests, embedding hosts) they
//! run one after another so a single slow probe cannot starve the reactor.
//! The mode is picked once at startup from the runtime flavor and never
//! changes mid-scan, so a batch is either fully concurrent or fully
//! sequential.

use futures::future::BoxFuture;
use tokio::runtime::RuntimeFlavor;

/// How detector futures are driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduler {
    /// Drive all futures at once and collect results in input order.
    Concurrent,
    /// Drive futures one at a time, in input order.
    Serialized,
}

impl Scheduler {
    /// Picks a mode from the ambient runtime flavor.
    ///
    /// Must be called from within a tokio runtime.
    pub fn detect() -> Self {
        match tokio::runtime::Handle::current().runtime_flavor() {
            RuntimeFlavor::MultiThread => Scheduler::Concurrent,
            _ => Scheduler::Serialized,
        }
    }

    /// Forces concurrent execution.
    pub fn concurrent() -> Self {
        Scheduler::Concurrent
    }

    /// Forces sequential execution.
    pub fn serialized() -> Self {
        Scheduler::Serialized
    }

    /// Runs every future to completion and returns outputs in input order.
    pub async fn join_all<T>(&self, futures: Vec<BoxFuture<'_, T>>) -> Vec<T> {
        match self {
            Scheduler::Concurrent => futures::future::join_all(futures).await,
            Scheduler::Serialized => {
                let mut results = Vec::with_capacity(futures.len());
                for fut in futures {
                    results.push(fut.await);
                }
                results
            }
        }
    }

    /// Runs CPU-bound work off the async reactor.
    ///
    /// The closure always goes to the blocking pool, which exists on both
    /// runtime flavors. A current-thread runtime has only the one reactor
    /// thread, so keeping blocking work off it matters most there.
    pub async fn offload<T, F>(&self, work: F) -> T
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        match tokio::task::spawn_blocking(work).await {
            Ok(value) => value,
            Err(e) => {
                // spawn_blocking only fails on panic or shutdown; a
                // panicking closure should propagate.
                std::panic::resume_unwind(e.into_panic())
            }
        }
    }
}
