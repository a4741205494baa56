//! The store seam: batch-scan capability, per-range fetch, and the
//! scatter/gather front-end that parallelizes fetches over a worker pool.
//!
//! Real store clients implement [`BatchScan`] (opaque, self-parallelizing
//! scans) or [`RangeFetch`] (point lookups a [`ScatterGather`] front-end
//! fans out). [`MemStore`] is the in-memory reference implementation used
//! by the self-contained benchmark and the test suite.

use std::collections::{BTreeMap, VecDeque};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use scanbench_pool::WorkerPool;
use tokio::sync::mpsc;

use crate::error::ScanError;
use crate::row::{expected_value, row_key};
use crate::sampler::Range;

/// An observed store entry.
pub type KeyValue = (String, Vec<u8>);

/// Stream of observed entries, in no particular order relative to the
/// submitted range set.
pub type ScanStream = BoxStream<'static, Result<KeyValue, ScanError>>;

/// A store's batch-scan capability: evaluate a set of ranges and stream
/// back every matching entry.
#[async_trait]
pub trait BatchScan: Send + Sync {
    /// Submit the range set and obtain the observed stream. Keys may
    /// arrive in any order; callers must not assume any interleaving.
    async fn scan(&self, ranges: Vec<Range>) -> Result<ScanStream, ScanError>;

    /// Release client- and server-side resources. Scanning a closed
    /// handle fails with [`ScanError::HandleClosed`].
    async fn close(&self);
}

/// A store's point-lookup capability: resolve one range to its matching
/// entries. This is the primitive [`ScatterGather`] parallelizes.
#[async_trait]
pub trait RangeFetch: Send + Sync + 'static {
    /// Fetch all entries matching a single range.
    async fn fetch(&self, range: Range) -> Result<Vec<KeyValue>, ScanError>;

    /// Release the underlying handle.
    async fn close(&self);
}

/// In-memory reference store backed by an ordered map.
pub struct MemStore {
    rows: tokio::sync::RwLock<BTreeMap<String, Vec<u8>>>,
    closed: AtomicBool,
}

impl MemStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            rows: tokio::sync::RwLock::new(BTreeMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Create a store holding every row of `[min, max)` with its
    /// deterministic expected value, standing in for an externally
    /// populated table.
    pub fn populate(min: u64, max: u64, value_size: usize) -> Self {
        let rows = (min..max)
            .map(|row_id| (row_key(row_id), expected_value(row_id, value_size)))
            .collect();
        Self {
            rows: tokio::sync::RwLock::new(rows),
            closed: AtomicBool::new(false),
        }
    }

    /// Insert or overwrite an entry.
    pub async fn insert(&self, key: impl Into<String>, value: Vec<u8>) {
        self.rows.write().await.insert(key.into(), value);
    }

    /// Remove an entry, returning its previous value.
    pub async fn remove(&self, key: &str) -> Option<Vec<u8>> {
        self.rows.write().await.remove(key)
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    fn ensure_open(&self) -> Result<(), ScanError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ScanError::HandleClosed);
        }
        Ok(())
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RangeFetch for MemStore {
    async fn fetch(&self, range: Range) -> Result<Vec<KeyValue>, ScanError> {
        self.ensure_open()?;
        let key = range.key();
        let rows = self.rows.read().await;
        Ok(rows
            .get(&key)
            .map(|value| vec![(key, value.clone())])
            .unwrap_or_default())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl BatchScan for MemStore {
    async fn scan(&self, ranges: Vec<Range>) -> Result<ScanStream, ScanError> {
        self.ensure_open()?;
        let rows = self.rows.read().await;
        let entries: Vec<Result<KeyValue, ScanError>> = ranges
            .into_iter()
            .filter_map(|range| {
                let key = range.key();
                rows.get(&key).map(|value| Ok((key, value.clone())))
            })
            .collect();
        Ok(stream::iter(entries).boxed())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

enum GatherMsg {
    Entries(Vec<KeyValue>),
    Failed(ScanError),
    ShardDone,
}

/// Scatter/gather front-end: shards a range set across a [`WorkerPool`],
/// fetches each shard concurrently, and merges the results into one
/// logical observed stream.
pub struct ScatterGather<S> {
    store: Arc<S>,
    pool: WorkerPool,
}

impl<S: RangeFetch> ScatterGather<S> {
    /// Build a scatter/gather scanner over `store`, dispatching through
    /// `pool`. One shard is cut per pool worker.
    pub fn new(store: Arc<S>, pool: WorkerPool) -> Self {
        Self { store, pool }
    }
}

#[async_trait]
impl<S: RangeFetch> BatchScan for ScatterGather<S> {
    async fn scan(&self, ranges: Vec<Range>) -> Result<ScanStream, ScanError> {
        let shard_len = ranges.len().div_ceil(self.pool.size()).max(1);
        let (tx, rx) = mpsc::unbounded_channel();

        let mut shards = 0usize;
        for shard in ranges.chunks(shard_len) {
            let shard: Vec<Range> = shard.to_vec();
            let store = Arc::clone(&self.store);
            let tx = tx.clone();
            self.pool.submit(async move {
                for range in shard {
                    match store.fetch(range).await {
                        Ok(entries) => {
                            if tx.send(GatherMsg::Entries(entries)).is_err() {
                                return;
                            }
                        }
                        Err(err) => {
                            let _ = tx.send(GatherMsg::Failed(err));
                            return;
                        }
                    }
                }
                let _ = tx.send(GatherMsg::ShardDone);
            })?;
            shards += 1;
        }
        drop(tx);

        tracing::debug!(shards, pool = %self.pool.name(), "scattered range set");
        Ok(GatherStream::new(rx, shards).boxed())
    }

    async fn close(&self) {
        self.store.close().await;
    }
}

/// Merges shard results back into one stream. The stream only ends
/// cleanly once every shard has reported completion; a worker pool torn
/// down mid-scan therefore surfaces as an execution error, never as a
/// silently truncated result set.
struct GatherStream {
    rx: mpsc::UnboundedReceiver<GatherMsg>,
    buffered: VecDeque<KeyValue>,
    outstanding: usize,
    failed: bool,
}

impl GatherStream {
    fn new(rx: mpsc::UnboundedReceiver<GatherMsg>, outstanding: usize) -> Self {
        Self {
            rx,
            buffered: VecDeque::new(),
            outstanding,
            failed: false,
        }
    }
}

impl Stream for GatherStream {
    type Item = Result<KeyValue, ScanError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.failed {
                return Poll::Ready(None);
            }
            if let Some(entry) = this.buffered.pop_front() {
                return Poll::Ready(Some(Ok(entry)));
            }
            if this.outstanding == 0 {
                return Poll::Ready(None);
            }
            match this.rx.poll_recv(cx) {
                Poll::Ready(Some(GatherMsg::Entries(entries))) => {
                    this.buffered.extend(entries);
                }
                Poll::Ready(Some(GatherMsg::Failed(err))) => {
                    this.failed = true;
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(Some(GatherMsg::ShardDone)) => {
                    this.outstanding -= 1;
                }
                Poll::Ready(None) => {
                    this.failed = true;
                    return Poll::Ready(Some(Err(ScanError::execution(format!(
                        "scatter/gather aborted with {} shard(s) unfinished",
                        this.outstanding
                    )))));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ranges_for(rows: impl IntoIterator<Item = u64>) -> Vec<Range> {
        rows.into_iter().map(Range::single).collect()
    }

    async fn collect(mut stream: ScanStream) -> Result<Vec<KeyValue>, ScanError> {
        let mut entries = Vec::new();
        while let Some(entry) = stream.next().await {
            entries.push(entry?);
        }
        Ok(entries)
    }

    #[tokio::test]
    async fn test_mem_store_scan_returns_only_requested_rows() {
        let store = MemStore::populate(0, 100, 16);
        let stream = store.scan(ranges_for([3, 7, 99])).await.unwrap();
        let mut entries = collect(stream).await.unwrap();
        entries.sort();

        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["row_0000000003", "row_0000000007", "row_0000000099"]);
        assert_eq!(entries[0].1, expected_value(3, 16));
    }

    #[tokio::test]
    async fn test_mem_store_scan_after_close_fails() {
        let store = MemStore::populate(0, 10, 8);
        BatchScan::close(&store).await;
        let err = store.scan(ranges_for([1])).await.err().unwrap();
        assert!(matches!(err, ScanError::HandleClosed));
    }

    #[tokio::test]
    async fn test_scatter_gather_returns_all_shards() {
        let store = Arc::new(MemStore::populate(0, 1000, 8));
        let pool = WorkerPool::with_default_timeout(4, "scatter-test").into_scoped();
        let scanner = ScatterGather::new(store, (*pool).clone());

        let rows: Vec<u64> = (0..1000).step_by(7).collect();
        let stream = scanner.scan(ranges_for(rows.clone())).await.unwrap();
        let entries = collect(stream).await.unwrap();

        assert_eq!(entries.len(), rows.len());
        let mut seen: Vec<String> = entries.into_iter().map(|(k, _)| k).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), rows.len());
    }

    #[tokio::test]
    async fn test_scatter_gather_on_shut_down_pool_fails() {
        let store = Arc::new(MemStore::populate(0, 10, 8));
        let pool = WorkerPool::with_default_timeout(2, "dead-pool");
        pool.shutdown_now();
        let scanner = ScatterGather::new(store, pool);

        let err = scanner.scan(ranges_for([1, 2])).await.err().unwrap();
        assert!(matches!(err, ScanError::Execution { .. }));
    }

    #[tokio::test]
    async fn test_scatter_gather_surfaces_mid_scan_pool_shutdown() {
        struct StallingStore;

        #[async_trait]
        impl RangeFetch for StallingStore {
            async fn fetch(&self, _range: Range) -> Result<Vec<KeyValue>, ScanError> {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Vec::new())
            }

            async fn close(&self) {}
        }

        let pool = WorkerPool::with_default_timeout(2, "stall-pool");
        let scanner = ScatterGather::new(Arc::new(StallingStore), pool.clone());
        let mut stream = scanner.scan(ranges_for([1, 2, 3, 4])).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        pool.shutdown_now();

        let entry = stream.next().await.expect("stream must not end silently");
        assert!(matches!(entry, Err(ScanError::Execution { .. })));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_scatter_gather_propagates_fetch_errors() {
        struct FailingStore;

        #[async_trait]
        impl RangeFetch for FailingStore {
            async fn fetch(&self, range: Range) -> Result<Vec<KeyValue>, ScanError> {
                if range.row_id() == 2 {
                    return Err(ScanError::execution("tablet server went away".to_string()));
                }
                Ok(vec![(range.key(), b"ok".to_vec())])
            }

            async fn close(&self) {}
        }

        let pool = WorkerPool::with_default_timeout(1, "fail-pool").into_scoped();
        let scanner = ScatterGather::new(Arc::new(FailingStore), (*pool).clone());
        let mut stream = scanner.scan(ranges_for([1, 2, 3])).await.unwrap();

        let mut saw_error = false;
        while let Some(entry) = stream.next().await {
            if entry.is_err() {
                saw_error = true;
                break;
            }
        }
        assert!(saw_error);
    }

    #[tokio::test]
    async fn test_scatter_gather_empty_range_set() {
        let store = Arc::new(MemStore::populate(0, 10, 8));
        let pool = WorkerPool::with_default_timeout(2, "empty-pool").into_scoped();
        let scanner = ScatterGather::new(store, (*pool).clone());

        let stream = scanner.scan(Vec::new()).await.unwrap();
        assert!(collect(stream).await.unwrap().is_empty());
    }
}
