// Time-boxed, single-flight caches.
//
// The refresh runs while the slot's async mutex is held, so concurrent callers
// on an expired entry wait for one fetch instead of issuing their own. A
// failed refresh leaves the slot as it was; a refresh whose value is rejected
// empties it.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

#[derive(Debug)]
struct Entry<T> {
    value: Arc<T>,
    fetched_at: DateTime<Utc>,
}

/// A single cached value with a freshness window.
#[derive(Debug)]
pub struct TtlCache<T> {
    ttl: Duration,
    slot: Mutex<Option<Entry<T>>>,
}

impl<T> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached value if it is younger than the TTL at `now`,
    /// otherwise run `refresh` and cache its result.
    pub async fn get_or_refresh<F, Fut, E>(&self, now: DateTime<Utc>, refresh: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_refresh_if(now, refresh, |_| true).await
    }

    /// Like [`get_or_refresh`](Self::get_or_refresh), but a fresh value is only
    /// stored when `cacheable` accepts it. Rejected values are still returned.
    pub async fn get_or_refresh_if<F, Fut, E, C>(
        &self,
        now: DateTime<Utc>,
        refresh: F,
        cacheable: C,
    ) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: FnOnce(&T) -> bool,
    {
        Ok(self.fetch_stamped_if(now, refresh, cacheable).await?.0)
    }

    /// The value together with the time it was cached, read under one lock.
    /// The stamp is None when the value was rejected by `cacheable`; the
    /// expired entry it replaced is dropped in that case.
    pub async fn fetch_stamped_if<F, Fut, E, C>(
        &self,
        now: DateTime<Utc>,
        refresh: F,
        cacheable: C,
    ) -> Result<(Arc<T>, Option<DateTime<Utc>>), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        C: FnOnce(&T) -> bool,
    {
        let mut slot = self.slot.lock().await;
        if let Some(entry) = slot.as_ref() {
            if now - entry.fetched_at < self.ttl {
                return Ok((Arc::clone(&entry.value), Some(entry.fetched_at)));
            }
        }

        let value = Arc::new(refresh().await?);
        if cacheable(&value) {
            *slot = Some(Entry {
                value: Arc::clone(&value),
                fetched_at: now,
            });
            Ok((value, Some(now)))
        } else {
            *slot = None;
            Ok((value, None))
        }
    }

    /// True when the slot holds nothing fresh at `now`. A slot that is
    /// mid-refresh is never stale.
    fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.slot.try_lock() {
            Ok(slot) => slot
                .as_ref()
                .map_or(true, |e| now - e.fetched_at >= self.ttl),
            Err(_) => false,
        }
    }

    /// When the cached value was fetched, if one is held.
    pub async fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.slot.lock().await.as_ref().map(|e| e.fetched_at)
    }

    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}

/// One [`TtlCache`] per key. Refreshes for different keys proceed
/// independently; refreshes for the same key are single-flight.
#[derive(Debug)]
pub struct KeyedTtlCache<K, T> {
    ttl: Duration,
    slots: Mutex<HashMap<K, Arc<TtlCache<T>>>>,
}

impl<K, T> KeyedTtlCache<K, T>
where
    K: Eq + Hash + Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_or_refresh<F, Fut, E>(
        &self,
        key: &K,
        now: DateTime<Utc>,
        refresh: F,
    ) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let slot = {
            let mut slots = self.slots.lock().await;
            if !slots.contains_key(key) {
                // Slots are only cloned under this lock, so a count of one
                // means no caller is using it.
                slots.retain(|_, slot| Arc::strong_count(slot) > 1 || !slot.is_stale(now));
            }
            Arc::clone(
                slots
                    .entry(key.clone())
                    .or_insert_with(|| Arc::new(TtlCache::new(self.ttl))),
            )
        };
        slot.get_or_refresh(now, refresh).await
    }

    pub async fn invalidate(&self, key: &K) {
        self.slots.lock().await.remove(key);
    }

    /// Number of keys currently holding a slot.
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn fresh_entry_is_reused() {
        let cache = TtlCache::new(Duration::hours(12));
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let fetch = || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(vec![1, 2, 3])
        };

        let a = cache.get_or_refresh(t0(), fetch).await.unwrap();
        let b = cache
            .get_or_refresh(t0() + Duration::hours(11), fetch)
            .await
            .unwrap();

        assert_eq!(*a, vec![1, 2, 3]);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.fetched_at().await, Some(t0()));
    }

    #[tokio::test]
    async fn expired_entry_is_refetched() {
        let cache = TtlCache::new(Duration::hours(12));
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let fetch = || async move { Ok::<_, ()>(counter.fetch_add(1, Ordering::SeqCst)) };

        assert_eq!(*cache.get_or_refresh(t0(), fetch).await.unwrap(), 0);
        let later = t0() + Duration::hours(12);
        assert_eq!(*cache.get_or_refresh(later, fetch).await.unwrap(), 1);
        assert_eq!(cache.fetched_at().await, Some(later));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_entry() {
        let cache = TtlCache::new(Duration::hours(1));
        cache
            .get_or_refresh(t0(), || async { Ok::<_, &str>("old") })
            .await
            .unwrap();

        let later = t0() + Duration::hours(2);
        let err = cache
            .get_or_refresh(later, || async { Err::<&str, _>("boom") })
            .await
            .unwrap_err();
        assert_eq!(err, "boom");
        assert_eq!(cache.fetched_at().await, Some(t0()));

        let value = cache
            .get_or_refresh(later, || async { Ok::<_, &str>("new") })
            .await
            .unwrap();
        assert_eq!(*value, "new");
    }

    #[tokio::test]
    async fn rejected_values_are_not_stored() {
        let cache: TtlCache<Vec<u32>> = TtlCache::new(Duration::hours(1));
        let value = cache
            .get_or_refresh_if(t0(), || async { Ok::<_, ()>(vec![]) }, |v| !v.is_empty())
            .await
            .unwrap();
        assert!(value.is_empty());
        assert_eq!(cache.fetched_at().await, None);
    }

    #[tokio::test]
    async fn rejected_refresh_drops_expired_entry() {
        let cache: TtlCache<Vec<u32>> = TtlCache::new(Duration::hours(1));
        let keep = |v: &Vec<u32>| !v.is_empty();
        let (_, stamp) = cache
            .fetch_stamped_if(t0(), || async { Ok::<_, ()>(vec![1]) }, keep)
            .await
            .unwrap();
        assert_eq!(stamp, Some(t0()));

        let later = t0() + Duration::hours(2);
        let (value, stamp) = cache
            .fetch_stamped_if(later, || async { Ok::<_, ()>(vec![]) }, keep)
            .await
            .unwrap();
        assert!(value.is_empty());
        assert_eq!(stamp, None);
        assert_eq!(cache.fetched_at().await, None);
    }

    #[tokio::test]
    async fn cached_value_carries_its_fetch_time() {
        let cache = TtlCache::new(Duration::hours(1));
        cache
            .get_or_refresh(t0(), || async { Ok::<_, ()>(1u32) })
            .await
            .unwrap();
        let (value, stamp) = cache
            .fetch_stamped_if(t0() + Duration::minutes(30), || async { Ok::<_, ()>(2u32) }, |_| true)
            .await
            .unwrap();
        assert_eq!(*value, 1);
        assert_eq!(stamp, Some(t0()));
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let cache = Arc::new(TtlCache::new(Duration::hours(1)));
        let calls = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                let counter = &calls;
                cache
                    .get_or_refresh(t0(), || async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok::<_, ()>(7u32)
                    })
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(*handle.await.unwrap(), 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn keyed_cache_isolates_keys() {
        let cache: KeyedTtlCache<String, String> = KeyedTtlCache::new(Duration::hours(1));
        let a = cache
            .get_or_refresh(&"a".to_string(), t0(), || async { Ok::<_, ()>("A".to_string()) })
            .await
            .unwrap();
        let b = cache
            .get_or_refresh(&"b".to_string(), t0(), || async { Ok::<_, ()>("B".to_string()) })
            .await
            .unwrap();
        assert_eq!(*a, "A");
        assert_eq!(*b, "B");

        cache.invalidate(&"a".to_string()).await;
        let a2 = cache
            .get_or_refresh(&"a".to_string(), t0(), || async { Ok::<_, ()>("A2".to_string()) })
            .await
            .unwrap();
        assert_eq!(*a2, "A2");
    }
    #[tokio::test]
    async fn keyed_cache_prunes_expired_keys_on_insert() {
        let cache: KeyedTtlCache<String, u32> = KeyedTtlCache::new(Duration::hours(1));
        for key in ["a", "b", "c"] {
            cache
                .get_or_refresh(&key.to_string(), t0(), || async { Ok::<_, ()>(1) })
                .await
                .unwrap();
        }
        assert_eq!(cache.len().await, 3);

        // Still fresh: nothing pruned.
        cache
            .get_or_refresh(&"d".to_string(), t0() + Duration::minutes(30), || async {
                Ok::<_, ()>(1)
            })
            .await
            .unwrap();
        assert_eq!(cache.len().await, 4);

        // a, b, c have aged out; d is still fresh.
        cache
            .get_or_refresh(&"e".to_string(), t0() + Duration::minutes(75), || async {
                Ok::<_, ()>(1)
            })
            .await
            .unwrap();
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn keyed_cache_drops_slot_of_failed_first_fetch() {
        let cache: KeyedTtlCache<String, u32> = KeyedTtlCache::new(Duration::hours(1));
        let err = cache
            .get_or_refresh(&"bogus".to_string(), t0(), || async { Err::<u32, _>("nope") })
            .await
            .unwrap_err();
        assert_eq!(err, "nope");

        cache
            .get_or_refresh(&"real".to_string(), t0(), || async { Ok::<_, &str>(1) })
            .await
            .unwrap();
        assert_eq!(cache.len().await, 1);
    }
}
