//! Periodic eviction of stale segment cache entries.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::interval;

use crate::state::AppState;

const LOOP_INTERVAL_SECS: u64 = 30;

pub async fn run_cache_prune_loop(state: Arc<AppState>, shutdown: broadcast::Receiver<()>) {
    run_with_interval(state, shutdown, Duration::from_secs(LOOP_INTERVAL_SECS)).await
}

async fn run_with_interval(state: Arc<AppState>, mut shutdown: broadcast::Receiver<()>, period: Duration) {
    let mut ticker = interval(period);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Cache prune loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                state.cache().prune();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, SegmentCache};
    use crate::config::Config;
    use crate::persistence::init_database;
    use searoute_core::segment::SegmentRecord;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingCache {
        prunes: AtomicUsize,
    }

    impl SegmentCache for CountingCache {
        fn get(&self, _key: &str) -> Result<Option<SegmentRecord>, CacheError> {
            Ok(None)
        }
        fn put(&self, _key: &str, _record: SegmentRecord) -> Result<(), CacheError> {
            Ok(())
        }
        fn invalidate(&self, _key: &str) -> Result<(), CacheError> {
            Ok(())
        }
        fn prune(&self) {
            self.prunes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn prunes_on_each_tick_until_shutdown() {
        let path = std::env::temp_dir()
            .join(format!("searoute-loop-{}.db", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .to_string();
        let db = init_database(&path, 1).await.unwrap();
        let cache = Arc::new(CountingCache::default());
        let state = Arc::new(AppState::with_cache(db, Config::from_env(), cache.clone()));
        tokio::time::pause();

        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(run_with_interval(state, rx, Duration::from_secs(1)));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        tx.send(()).unwrap();
        handle.await.unwrap();

        // ticks at 0s, 1s, 2s
        assert_eq!(cache.prunes.load(Ordering::SeqCst), 3);
    }
}
