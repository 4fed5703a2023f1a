use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

struct Entry<T> {
    stored_at: Instant,
    value: T,
}

/// Single-slot read-through memo with a fixed time-to-live.
///
/// The lock is never held across an await; two callers that both miss will
/// both recompute and the later `put` wins.
pub struct TtlCache<T> {
    ttl: Duration,
    slot: Mutex<Option<Entry<T>>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value, if any. An expired entry is dropped on read.
    pub fn get(&self) -> Option<T> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let fresh = slot.as_ref().map(|entry| entry.stored_at.elapsed() < self.ttl);
        match fresh {
            Some(true) => slot.as_ref().map(|entry| entry.value.clone()),
            Some(false) => {
                *slot = None;
                None
            }
            None => None,
        }
    }

    pub fn put(&self, value: T) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Entry {
            stored_at: Instant::now(),
            value,
        });
    }

    pub fn clear(&self) {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    /// Age of the stored value, fresh or not.
    pub fn age(&self) -> Option<Duration> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|entry| entry.stored_at.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_within_ttl() {
        let cache = TtlCache::new(Duration::from_secs(600));
        assert!(cache.get().is_none());
        cache.put(vec![1, 2]);
        assert_eq!(cache.get(), Some(vec![1, 2]));
        assert!(cache.age().is_some());
    }

    #[test]
    fn test_zero_ttl_always_misses() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.put("x");
        assert!(cache.get().is_none());
        assert!(cache.age().is_none());
    }

    #[test]
    fn test_clear() {
        let cache = TtlCache::new(Duration::from_secs(600));
        cache.put(1);
        cache.clear();
        assert!(cache.get().is_none());
    }
}
