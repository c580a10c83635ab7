use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::source::ProxySource;

/// How often staleness is checked while a TTL is armed.
const EXPIRY_POLL: Duration = Duration::from_secs(1);

/// What every observer must see as one unit: the pooled batch and when it
/// was last restocked.
struct PoolState {
    addresses: Vec<String>,
    refreshed_at: Instant,
}

/// Rotating pool of proxy addresses. The state lives behind a single lock
/// and a background maintenance task is the only writer that restocks it;
/// `take()` signals that task whenever it drains the pool low.
pub struct ProxyPool {
    state: Arc<Mutex<PoolState>>,
    demand: Arc<Notify>,
    worker: JoinHandle<()>,
}

impl ProxyPool {
    /// Builds the pool and fills it once from `source`, so a stocked source
    /// is visible to the very first `take()`. The source is then handed to
    /// the maintenance task for all later refills.
    pub async fn new(source: Box<dyn ProxySource>, ttl: Duration) -> Self {
        let addresses = source.refresh().await;
        let state = Arc::new(Mutex::new(PoolState {
            addresses,
            refreshed_at: Instant::now(),
        }));
        let demand = Arc::new(Notify::new());
        let worker = tokio::spawn(maintain(state.clone(), demand.clone(), source, ttl));

        Self {
            state,
            demand,
            worker,
        }
    }

    /// Pops one address, most recently stocked first. An exhausted pool
    /// yields the empty string; callers treat that as "none available right
    /// now", not as an error.
    pub async fn take(&self) -> String {
        let mut state = self.state.lock().await;
        let address = state.addresses.pop().unwrap_or_default();
        if state.addresses.len() <= 1 {
            self.demand.notify_one();
        }
        address
    }

    /// Number of addresses currently pooled.
    pub async fn available(&self) -> usize {
        self.state.lock().await.addresses.len()
    }
}

impl Drop for ProxyPool {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

/// One cycle per wakeup: demand (a `take` drained the pool to at most one
/// entry) or, with a TTL armed, the expiry poll tick. Expired contents are
/// dropped wholesale; a refill puts the fresh batch behind the at-most-one
/// leftover so the leftover keeps the serving end and rotation order
/// survives the refill.
async fn maintain(
    state: Arc<Mutex<PoolState>>,
    demand: Arc<Notify>,
    source: Box<dyn ProxySource>,
    ttl: Duration,
) {
    loop {
        let mut demanded = true;
        if ttl.is_zero() {
            demand.notified().await;
        } else {
            tokio::select! {
                _ = demand.notified() => {}
                _ = tokio::time::sleep(EXPIRY_POLL) => demanded = false,
            }
        }

        let mut state = state.lock().await;
        let expired = !ttl.is_zero() && state.refreshed_at.elapsed() > ttl;
        if expired {
            state.addresses.clear();
        }

        if state.addresses.len() <= 1 && (demanded || expired) {
            // The guard stays held across the fetch: nobody observes the
            // pool mid-refill.
            let mut refilled = source.refresh().await;
            tracing::info!("Refilled pool with {} proxies", refilled.len());
            refilled.append(&mut state.addresses);
            state.addresses = refilled;
            state.refreshed_at = Instant::now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticSource;
    use async_trait::async_trait;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Hands out the given batches one refresh at a time, then empties.
    struct ScriptedSource {
        batches: StdMutex<Vec<Vec<String>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn boxed(batches: &[&[&str]], calls: Arc<AtomicUsize>) -> Box<Self> {
            Box::new(Self {
                batches: StdMutex::new(
                    batches
                        .iter()
                        .map(|batch| batch.iter().map(|s| s.to_string()).collect())
                        .collect(),
                ),
                calls,
            })
        }
    }

    #[async_trait]
    impl ProxySource for ScriptedSource {
        async fn refresh(&self) -> Vec<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut batches = self.batches.lock().unwrap();
            if batches.is_empty() {
                Vec::new()
            } else {
                batches.remove(0)
            }
        }
    }

    async fn wait_for_stock(pool: &ProxyPool, want: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while pool.available().await < want {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("pool never reached the wanted stock");
    }

    #[tokio::test]
    async fn serves_newest_first() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pool = ProxyPool::new(
            ScriptedSource::boxed(&[&["a", "b", "c"]], calls),
            Duration::ZERO,
        )
        .await;

        assert_eq!(pool.take().await, "c");
        assert_eq!(pool.take().await, "b");
        assert_eq!(pool.take().await, "a");
    }

    #[tokio::test]
    async fn drained_pool_refills_before_serving_again() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pool = ProxyPool::new(
            ScriptedSource::boxed(&[&["first"], &["second"]], calls.clone()),
            Duration::ZERO,
        )
        .await;

        assert_eq!(pool.take().await, "first");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        wait_for_stock(&pool, 1).await;
        assert!(calls.load(Ordering::SeqCst) >= 2);
        assert_eq!(pool.take().await, "second");
    }

    #[tokio::test]
    async fn empty_source_yields_sentinel_and_never_blocks() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pool = ProxyPool::new(ScriptedSource::boxed(&[], calls), Duration::ZERO).await;

        tokio::time::timeout(Duration::from_secs(1), async {
            for _ in 0..5 {
                assert_eq!(pool.take().await, "");
            }
        })
        .await
        .expect("take on an empty pool must not block");
    }

    #[tokio::test(start_paused = true)]
    async fn stale_batch_is_discarded_after_ttl() {
        let calls = Arc::new(AtomicUsize::new(0));
        let pool = ProxyPool::new(
            ScriptedSource::boxed(&[&["stale1", "stale2", "stale3"], &["fresh"]], calls),
            Duration::from_secs(60),
        )
        .await;
        assert_eq!(pool.available().await, 3);

        // Let the maintenance task park on its expiry poll before the clock
        // jumps, then let it observe the expiry before we query.
        tokio::time::sleep(Duration::from_millis(1)).await;
        tokio::time::advance(Duration::from_secs(120)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(pool.take().await, "fresh");
        assert_eq!(pool.available().await, 0);
    }

    #[tokio::test]
    async fn concurrent_takes_hand_out_distinct_addresses() {
        let batch: Vec<String> = (0..8).map(|i| format!("10.0.0.{}:1080", i)).collect();
        let batch_refs: Vec<&str> = batch.iter().map(String::as_str).collect();
        let calls = Arc::new(AtomicUsize::new(0));
        let pool = ProxyPool::new(
            ScriptedSource::boxed(&[batch_refs.as_slice()], calls),
            Duration::ZERO,
        )
        .await;

        let mut served = join_all((0..8).map(|_| pool.take())).await;
        assert!(served.iter().all(|address| !address.is_empty()));

        served.sort();
        served.dedup();
        assert_eq!(served.len(), 8);
    }

    #[tokio::test]
    async fn static_source_rotates_in_operator_order() {
        let source = StaticSource::new(vec![
            "socks5://x:1".to_string(),
            "socks5://y:2".to_string(),
            "socks5://z:3".to_string(),
        ]);
        let pool = ProxyPool::new(Box::new(source), Duration::ZERO).await;

        for expected in ["x:1", "y:2", "z:3", "x:1", "y:2", "z:3"] {
            wait_for_stock(&pool, 1).await;
            assert_eq!(pool.take().await, format!("socks5://{}", expected));
        }
    }
}
