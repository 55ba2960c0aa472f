//! Time-bounded catalog snapshot cache.
//!
//! One snapshot slot guarded by one mutex. The lock is held across the whole
//! check-and-refresh so at most one upstream fetch sequence runs at a time;
//! callers queued behind a refresh receive that refresh's outcome instead of
//! starting another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::backends::CatalogGateway;
use crate::errors::FetchError;
use crate::location_matcher::LocationMatcher;
use crate::protocol::{Artist, LocationIndex};

/// One immutable, internally consistent copy of the catalog.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub artists: Vec<Artist>,
    pub locations: LocationIndex,
    /// Sorted, deduplicated selectable regions derived from `locations`.
    pub location_options: Vec<String>,
    pub fetched_at: Instant,
}

impl CatalogSnapshot {
    pub fn is_fresh(&self, validity_window: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) < validity_window
    }

    pub fn artist(&self, artist_id: u32) -> Option<&Artist> {
        self.artists.iter().find(|artist| artist.id == artist_id)
    }

    pub fn locations_for(&self, artist_id: u32) -> &[String] {
        self.locations
            .get(&artist_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

type RefreshOutcome = Result<Arc<CatalogSnapshot>, FetchError>;

#[derive(Default)]
struct CacheSlot {
    snapshot: Option<Arc<CatalogSnapshot>>,
    /// Outcome of the most recent refresh, tagged with its sequence number.
    last_refresh: Option<(u64, RefreshOutcome)>,
    invalidated: bool,
}

/// Lazily refreshed catalog cache shared by every request handler.
pub struct CatalogCache {
    gateway: Arc<dyn CatalogGateway>,
    matcher: LocationMatcher,
    validity_window: Duration,
    slot: Mutex<CacheSlot>,
    completed_refreshes: AtomicU64,
}

impl CatalogCache {
    pub fn new(
        gateway: Arc<dyn CatalogGateway>,
        matcher: LocationMatcher,
        validity_window: Duration,
    ) -> Self {
        Self {
            gateway,
            matcher,
            validity_window,
            slot: Mutex::new(CacheSlot::default()),
            completed_refreshes: AtomicU64::new(0),
        }
    }

    pub fn gateway(&self) -> &Arc<dyn CatalogGateway> {
        &self.gateway
    }

    pub fn matcher(&self) -> LocationMatcher {
        self.matcher
    }

    fn lock_slot(&self) -> MutexGuard<'_, CacheSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the current snapshot, refreshing it first when stale or unset.
    ///
    /// On failure the previously held snapshot stays in place.
    pub fn get_snapshot(&self) -> Result<Arc<CatalogSnapshot>, FetchError> {
        let refreshes_seen = self.completed_refreshes.load(Ordering::SeqCst);
        let mut slot = self.lock_slot();

        if let Some((sequence, outcome)) = &slot.last_refresh {
            if *sequence > refreshes_seen {
                debug!("Catalog cache: sharing outcome of refresh #{}", sequence);
                return outcome.clone();
            }
        }

        if !slot.invalidated {
            if let Some(snapshot) = &slot.snapshot {
                if snapshot.is_fresh(self.validity_window, Instant::now()) {
                    return Ok(Arc::clone(snapshot));
                }
            }
        }

        // Only written while the slot lock is held.
        let sequence = self.completed_refreshes.load(Ordering::SeqCst) + 1;
        let outcome = self.fetch_snapshot().map(Arc::new);
        match &outcome {
            Ok(snapshot) => {
                slot.snapshot = Some(Arc::clone(snapshot));
                slot.invalidated = false;
            }
            Err(err) => warn!("Catalog refresh #{} failed: {}", sequence, err),
        }
        slot.last_refresh = Some((sequence, outcome.clone()));
        self.completed_refreshes.store(sequence, Ordering::SeqCst);
        outcome
    }

    /// Held snapshot regardless of freshness. Never touches the network.
    pub fn peek(&self) -> Option<Arc<CatalogSnapshot>> {
        self.lock_slot().snapshot.clone()
    }

    /// Forces the next `get_snapshot` to refresh. The old snapshot is kept
    /// until that refresh succeeds.
    pub fn invalidate(&self) {
        self.lock_slot().invalidated = true;
    }

    fn fetch_snapshot(&self) -> Result<CatalogSnapshot, FetchError> {
        let started = Instant::now();
        let artists = self.gateway.fetch_artists()?;
        let locations = self.gateway.fetch_location_index()?;
        let location_options = self.matcher.unique_location_options(&locations);
        info!(
            "Catalog refreshed: {} artists, {} location entries, {} location options in {:?}",
            artists.len(),
            locations.len(),
            location_options.len(),
            started.elapsed()
        );
        Ok(CatalogSnapshot {
            artists,
            locations,
            location_options,
            fetched_at: Instant::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    use super::CatalogCache;
    use crate::backends::CatalogGateway;
    use crate::errors::FetchError;
    use crate::location_matcher::LocationMatcher;
    use crate::protocol::{Artist, LocationIndex};

    #[derive(Default)]
    struct FakeGateway {
        artist_calls: AtomicUsize,
        index_calls: AtomicUsize,
        fail_index: AtomicBool,
        fetch_delay: Duration,
    }

    impl FakeGateway {
        fn slow(delay: Duration) -> Self {
            Self {
                fetch_delay: delay,
                ..Self::default()
            }
        }

        fn artist_calls(&self) -> usize {
            self.artist_calls.load(Ordering::SeqCst)
        }
    }

    impl CatalogGateway for FakeGateway {
        fn fetch_artists(&self) -> Result<Vec<Artist>, FetchError> {
            let call = self.artist_calls.fetch_add(1, Ordering::SeqCst) + 1;
            thread::sleep(self.fetch_delay);
            Ok(vec![Artist {
                id: 1,
                name: format!("Refresh {call}"),
                image: String::new(),
                members: vec!["Solo".to_string()],
                creation_date: 2000,
                first_album: "01-01-2001".to_string(),
            }])
        }

        fn fetch_location_index(&self) -> Result<LocationIndex, FetchError> {
            self.index_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_index.load(Ordering::SeqCst) {
                return Err(FetchError::request("locations", "upstream down"));
            }
            Ok(LocationIndex::from([(
                1,
                vec!["seattle-washington-usa".to_string()],
            )]))
        }

        fn fetch_dates(&self, _artist_id: u32) -> Result<Vec<String>, FetchError> {
            Ok(Vec::new())
        }

        fn fetch_locations(&self, _artist_id: u32) -> Result<Vec<String>, FetchError> {
            Ok(Vec::new())
        }
    }

    fn cache_with(gateway: Arc<FakeGateway>, window: Duration) -> CatalogCache {
        CatalogCache::new(gateway, LocationMatcher::default(), window)
    }

    #[test]
    fn test_first_call_fetches_and_builds_location_options() {
        let gateway = Arc::new(FakeGateway::default());
        let cache = cache_with(gateway.clone(), Duration::from_secs(600));

        let snapshot = cache.get_snapshot().expect("refresh should succeed");

        assert_eq!(gateway.artist_calls(), 1);
        assert_eq!(snapshot.artists.len(), 1);
        assert_eq!(
            snapshot.location_options,
            vec!["seattle, washington, usa", "usa", "washington, usa"]
        );
        assert_eq!(snapshot.locations_for(1).len(), 1);
        assert!(snapshot.locations_for(99).is_empty());
    }

    #[test]
    fn test_calls_within_window_reuse_the_same_snapshot() {
        let gateway = Arc::new(FakeGateway::default());
        let cache = cache_with(gateway.clone(), Duration::from_secs(600));

        let first = cache.get_snapshot().expect("refresh should succeed");
        let second = cache.get_snapshot().expect("cached snapshot should be served");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(gateway.artist_calls(), 1);
        assert_eq!(gateway.index_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_expired_snapshot_is_replaced() {
        let gateway = Arc::new(FakeGateway::default());
        let cache = cache_with(gateway.clone(), Duration::ZERO);

        let first = cache.get_snapshot().expect("refresh should succeed");
        let second = cache.get_snapshot().expect("refresh should succeed");

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(gateway.artist_calls(), 2);
        assert_eq!(second.artists[0].name, "Refresh 2");
        assert!(second.fetched_at >= first.fetched_at);
    }

    #[test]
    fn test_failed_refresh_keeps_previous_snapshot() {
        let gateway = Arc::new(FakeGateway::default());
        let cache = cache_with(gateway.clone(), Duration::ZERO);
        let first = cache.get_snapshot().expect("refresh should succeed");

        gateway.fail_index.store(true, Ordering::SeqCst);
        let error = cache.get_snapshot().expect_err("refresh should fail");

        assert!(matches!(error, FetchError::Request { .. }));
        let held = cache.peek().expect("previous snapshot should be kept");
        assert!(Arc::ptr_eq(&first, &held));
    }

    #[test]
    fn test_failure_is_not_cached_for_later_callers() {
        let gateway = Arc::new(FakeGateway::default());
        let cache = cache_with(gateway.clone(), Duration::from_secs(600));

        gateway.fail_index.store(true, Ordering::SeqCst);
        assert!(cache.get_snapshot().is_err());
        gateway.fail_index.store(false, Ordering::SeqCst);

        assert!(cache.get_snapshot().is_ok());
        assert_eq!(gateway.artist_calls(), 2);
    }

    #[test]
    fn test_invalidate_forces_refresh_but_keeps_snapshot_until_then() {
        let gateway = Arc::new(FakeGateway::default());
        let cache = cache_with(gateway.clone(), Duration::from_secs(600));
        let first = cache.get_snapshot().expect("refresh should succeed");

        cache.invalidate();
        assert!(Arc::ptr_eq(&first, &cache.peek().expect("snapshot kept")));

        let second = cache.get_snapshot().expect("refresh should succeed");
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(gateway.artist_calls(), 2);
    }

    #[test]
    fn test_peek_never_fetches() {
        let gateway = Arc::new(FakeGateway::default());
        let cache = cache_with(gateway.clone(), Duration::from_secs(600));
        assert!(cache.peek().is_none());
        assert_eq!(gateway.artist_calls(), 0);
    }

    #[test]
    fn test_concurrent_stale_callers_share_one_refresh() {
        let gateway = Arc::new(FakeGateway::slow(Duration::from_millis(100)));
        let cache = Arc::new(cache_with(gateway.clone(), Duration::from_secs(600)));
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get_snapshot()
                })
            })
            .collect();
        let results: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().expect("worker should not panic"))
            .collect();

        assert_eq!(gateway.artist_calls(), 1);
        let first = results[0].as_ref().expect("refresh should succeed");
        for result in &results {
            let snapshot = result.as_ref().expect("refresh should succeed");
            assert!(Arc::ptr_eq(first, snapshot));
        }
    }

    #[test]
    fn test_concurrent_stale_callers_share_one_failure() {
        let gateway = Arc::new(FakeGateway::slow(Duration::from_millis(200)));
        gateway.fail_index.store(true, Ordering::SeqCst);
        let cache = Arc::new(cache_with(gateway.clone(), Duration::from_secs(600)));
        let barrier = Arc::new(Barrier::new(3));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get_snapshot()
                })
            })
            .collect();
        let errors: Vec<FetchError> = handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .expect("worker should not panic")
                    .expect_err("refresh should fail")
            })
            .collect();

        assert_eq!(gateway.artist_calls(), 1);
        assert!(errors.iter().all(|error| *error == errors[0]));
        assert!(cache.peek().is_none());
    }

    #[test]
    fn test_concurrent_callers_on_expired_snapshot_share_one_failure() {
        let gateway = Arc::new(FakeGateway::slow(Duration::from_millis(200)));
        let cache = Arc::new(cache_with(gateway.clone(), Duration::ZERO));
        let primed = cache.get_snapshot().expect("first refresh should succeed");
        gateway.fail_index.store(true, Ordering::SeqCst);
        let barrier = Arc::new(Barrier::new(3));

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get_snapshot()
                })
            })
            .collect();
        let errors: Vec<FetchError> = handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .expect("worker should not panic")
                    .expect_err("expired snapshot must not be served")
            })
            .collect();

        assert_eq!(gateway.artist_calls(), 2);
        assert!(errors.iter().all(|error| *error == errors[0]));
        let held = cache.peek().expect("primed snapshot should be kept");
        assert!(Arc::ptr_eq(&primed, &held));
    }

    #[test]
    fn test_concurrent_callers_after_invalidate_share_one_refresh() {
        let gateway = Arc::new(FakeGateway::slow(Duration::from_millis(100)));
        let cache = Arc::new(cache_with(gateway.clone(), Duration::from_secs(600)));
        let primed = cache.get_snapshot().expect("first refresh should succeed");
        cache.invalidate();
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get_snapshot()
                })
            })
            .collect();
        let snapshots: Vec<_> = handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .expect("worker should not panic")
                    .expect("refresh should succeed")
            })
            .collect();

        assert_eq!(gateway.artist_calls(), 2);
        assert!(!Arc::ptr_eq(&primed, &snapshots[0]));
        assert_eq!(snapshots[0].artists[0].name, "Refresh 2");
        assert!(snapshots
            .iter()
            .all(|snapshot| Arc::ptr_eq(snapshot, &snapshots[0])));
    }
}
