use log::debug;
#[cfg(test)]
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Source of wall-clock time, in unix millis.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;

    fn now_secs(&self) -> i64 {
        self.now_millis().div_euclid(1000)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    pub fn advance(&self, by: Duration) {
        let by = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(by, Ordering::SeqCst);
    }

    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct CacheEntry<T> {
    snapshot: Arc<T>,
    computed_at_millis: i64,
}

/// Single-entry cache with a fixed time-to-live.
///
/// Recomputation is lazy: it happens inside the first `get_with` after the
/// entry expired or was invalidated. Entries are replaced whole, so a reader
/// racing `invalidate` sees either the old snapshot or a new one.
pub struct FreshnessCache<T> {
    name: &'static str,
    ttl_millis: i64,
    clock: Arc<dyn Clock>,
    entry: Mutex<Option<CacheEntry<T>>>,
}

impl<T> FreshnessCache<T> {
    pub fn new(name: &'static str, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            ttl_millis: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            clock,
            entry: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_millis as u64)
    }

    /// The stored snapshot, if it is younger than the TTL.
    pub fn fresh(&self) -> Option<Arc<T>> {
        let now = self.clock.now_millis();
        let entry = self.lock();
        let hit = entry.as_ref().and_then(|e| {
            let age = now - e.computed_at_millis;
            // a clock that went backwards counts as expired
            (0..self.ttl_millis)
                .contains(&age)
                .then(|| Arc::clone(&e.snapshot))
        });
        debug!(
            "CACHE {} - {}",
            self.name,
            if hit.is_some() { "hit" } else { "miss" }
        );
        hit
    }

    /// Return the fresh snapshot or compute, store and return a new one.
    /// The lock is not held while `compute` runs.
    pub fn get_with<F>(&self, compute: F) -> Arc<T>
    where
        F: FnOnce() -> T,
    {
        if let Some(snapshot) = self.fresh() {
            return snapshot;
        }
        self.store(compute())
    }

    /// Replace the entry, stamped with the current time.
    pub fn store(&self, value: T) -> Arc<T> {
        let snapshot = Arc::new(value);
        let computed_at_millis = self.clock.now_millis();
        *self.lock() = Some(CacheEntry {
            snapshot: Arc::clone(&snapshot),
            computed_at_millis,
        });
        debug!("CACHE {} - stored at {}", self.name, computed_at_millis);
        snapshot
    }

    /// Drop the entry; the next `get_with` recomputes regardless of TTL.
    pub fn invalidate(&self) {
        *self.lock() = None;
        debug!("CACHE {} - invalidated", self.name);
    }

    pub fn computed_at(&self) -> Option<i64> {
        self.lock().as_ref().map(|e| e.computed_at_millis)
    }

    fn lock(&self) -> MutexGuard<'_, Option<CacheEntry<T>>> {
        // entries are swapped whole, so a poisoned lock still holds a
        // consistent value
        self.entry.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::{Clock, FreshnessCache, ManualClock};
    use std::cell::Cell;
    use std::sync::Arc;
    use std::time::Duration;

    fn cache(clock: &Arc<ManualClock>) -> FreshnessCache<u32> {
        FreshnessCache::new("test", Duration::from_secs(30), clock.clone())
    }

    #[test]
    fn serves_same_snapshot_within_ttl() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let cache = cache(&clock);
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            calls.get()
        };

        let a = cache.get_with(compute);
        clock.advance(Duration::from_millis(29_999));
        let b = cache.get_with(compute);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn recomputes_after_ttl() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = cache(&clock);
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            calls.get()
        };

        assert_eq!(*cache.get_with(compute), 1);
        clock.advance(Duration::from_secs(30));
        assert_eq!(*cache.get_with(compute), 2);
        assert_eq!(cache.computed_at(), Some(30_000));
    }

    #[test]
    fn invalidate_forces_recompute() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = cache(&clock);
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            calls.get()
        };

        cache.get_with(compute);
        for expected in 2..5 {
            cache.invalidate();
            assert!(cache.fresh().is_none());
            assert_eq!(cache.computed_at(), None);
            assert_eq!(*cache.get_with(compute), expected);
        }
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn clock_going_backwards_expires_entry() {
        let clock = Arc::new(ManualClock::new(50_000));
        let cache = cache(&clock);
        cache.store(7);
        assert!(cache.fresh().is_some());
        clock.set(10_000);
        assert!(cache.fresh().is_none());
    }

    #[test]
    fn empty_cache_misses() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = cache(&clock);
        assert!(cache.fresh().is_none());
        assert_eq!(cache.ttl(), Duration::from_secs(30));
    }

    #[test]
    fn manual_clock_seconds_floor() {
        let clock = ManualClock::new(-1);
        assert_eq!(clock.now_secs(), -1);
        clock.set(1_999);
        assert_eq!(clock.now_secs(), 1);
    }
}
