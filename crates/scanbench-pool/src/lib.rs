//! Bounded worker pool with named workers, idle-timeout shrinkage, and
//! scoped shutdown.
//!
//! The pool runs a fixed number of workers (core == max by design: the
//! harness always wants a fully provisioned concurrency level, not elastic
//! scaling). Workers that sit idle past the configured timeout retire and
//! are respawned lazily on the next [`WorkerPool::submit`]. Shutting down
//! discards the backlog and cancels in-flight tasks at their next
//! suspension point.
//!
//! For scope-bound usage, [`WorkerPool::into_scoped`] wraps the pool in a
//! guard that guarantees [`WorkerPool::shutdown_now`] runs on every exit
//! path, so no worker outlives the scope that created the pool.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// How long a worker may sit idle before it retires.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(180);

/// Returned by [`WorkerPool::submit`] once the pool has been shut down.
/// Never retried internally; always surfaced to the caller.
#[derive(Debug, Error)]
#[error("worker pool '{pool}' has been shut down")]
pub struct RejectedExecutionError {
    /// Name of the rejecting pool.
    pub pool: String,
}

type Task = BoxFuture<'static, ()>;

/// A bounded pool of named worker tasks draining a FIFO backlog.
///
/// Cloning yields another handle to the same pool; shutdown through any
/// handle is observed by all of them.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    size: usize,
    idle_timeout: Duration,
    queue: Mutex<VecDeque<Task>>,
    notify: Notify,
    live: AtomicUsize,
    next_worker_id: AtomicUsize,
    shut_down: AtomicBool,
    cancel: CancellationToken,
}

impl WorkerPool {
    /// Create a running pool of `size` workers named after `name`.
    ///
    /// Must be called within a Tokio runtime. Panics if `size` is zero.
    pub fn new(size: usize, idle_timeout: Duration, name: impl Into<String>) -> Self {
        assert!(size > 0, "worker pool size must be non-zero");
        let inner = Arc::new(Inner {
            name: name.into(),
            size,
            idle_timeout,
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            live: AtomicUsize::new(0),
            next_worker_id: AtomicUsize::new(0),
            shut_down: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        });
        inner.spawn_workers();
        Self { inner }
    }

    /// Create a pool with [`DEFAULT_IDLE_TIMEOUT`].
    pub fn with_default_timeout(size: usize, name: impl Into<String>) -> Self {
        Self::new(size, DEFAULT_IDLE_TIMEOUT, name)
    }

    /// Enqueue a unit of work for execution by one of the pool's workers.
    ///
    /// The backlog is FIFO and unbounded. Fails with
    /// [`RejectedExecutionError`] if the pool has been shut down.
    pub fn submit<F>(&self, task: F) -> Result<(), RejectedExecutionError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        {
            let mut queue = self.inner.queue();
            // The flag is checked under the queue lock so a task can never
            // slip in behind a concurrent shutdown's backlog discard.
            if self.inner.shut_down.load(Ordering::SeqCst) {
                return Err(RejectedExecutionError {
                    pool: self.inner.name.clone(),
                });
            }
            queue.push_back(Box::pin(task));
        }
        self.inner.notify.notify_one();
        self.inner.spawn_workers();
        Ok(())
    }

    /// Stop accepting work, discard the backlog, and cancel in-flight
    /// tasks at their next suspension point. Idempotent.
    ///
    /// Callers must treat any submitted task as possibly only partially
    /// executed after this returns.
    pub fn shutdown_now(&self) {
        let discarded = {
            let mut queue = self.inner.queue();
            if self.inner.shut_down.swap(true, Ordering::SeqCst) {
                return;
            }
            let discarded = queue.len();
            queue.clear();
            discarded
        };
        self.inner.cancel.cancel();
        tracing::debug!(
            pool = %self.inner.name,
            discarded,
            "worker pool shut down"
        );
    }

    /// Wrap the pool in a guard that calls [`WorkerPool::shutdown_now`]
    /// when dropped.
    pub fn into_scoped(self) -> ScopedPool {
        ScopedPool { pool: self }
    }

    /// Configured worker count.
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Pool name, as carried in worker tracing spans.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Number of workers currently alive.
    pub fn live_workers(&self) -> usize {
        self.inner.live.load(Ordering::SeqCst)
    }

    /// Whether [`WorkerPool::shutdown_now`] has been called.
    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }
}

impl Inner {
    /// Lock the backlog. Poisoning is impossible to act on here, so a
    /// poisoned lock is recovered rather than propagated.
    fn queue(&self) -> MutexGuard<'_, VecDeque<Task>> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Spawn workers until the live count reaches the configured size.
    fn spawn_workers(self: &Arc<Self>) {
        loop {
            if self.shut_down.load(Ordering::SeqCst) {
                return;
            }
            let live = self.live.load(Ordering::SeqCst);
            if live >= self.size {
                return;
            }
            if self
                .live
                .compare_exchange(live, live + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                continue;
            }
            let id = self.next_worker_id.fetch_add(1, Ordering::SeqCst);
            let worker = Arc::clone(self);
            let span = tracing::debug_span!("pool_worker", pool = %self.name, worker = id);
            tokio::spawn(worker.worker_loop().instrument(span));
        }
    }

    async fn worker_loop(self: Arc<Self>) {
        tracing::debug!("worker started");
        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            let task = self.queue().pop_front();
            match task {
                Some(task) => {
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        _ = task => {}
                    }
                }
                None => {
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        waited = tokio::time::timeout(self.idle_timeout, self.notify.notified()) => {
                            if waited.is_err() {
                                // Re-check the backlog so a submit racing the
                                // timeout is not left waiting for a respawn.
                                if !self.queue().is_empty() {
                                    continue;
                                }
                                tracing::debug!(
                                    idle_timeout = ?self.idle_timeout,
                                    "worker idle past timeout, retiring"
                                );
                                break;
                            }
                        }
                    }
                }
            }
        }
        self.live.fetch_sub(1, Ordering::SeqCst);
        // A submit can race the retirement: it pushes its task after this
        // worker's last emptiness check but while the worker still counts as
        // live, so its spawn attempt is a no-op. Re-check after decrementing
        // and respawn so that task is never stranded.
        if !self.shut_down.load(Ordering::SeqCst) && !self.queue().is_empty() {
            self.spawn_workers();
        }
        tracing::debug!("worker exited");
    }
}

/// Scoped acquisition of a [`WorkerPool`]: shutdown is guaranteed on every
/// exit path of the owning scope, normal return or error alike.
pub struct ScopedPool {
    pool: WorkerPool,
}

impl std::ops::Deref for ScopedPool {
    type Target = WorkerPool;

    fn deref(&self) -> &WorkerPool {
        &self.pool
    }
}

impl Drop for ScopedPool {
    fn drop(&mut self) {
        self.pool.shutdown_now();
    }
}
