use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use super::{AccessorRequest, ResolutionError, ResolvedAccessor};

/// A cached resolution outcome. Failures are cached too.
pub type Resolution = Result<Arc<ResolvedAccessor>, ResolutionError>;

pub type AccessorCache = MemoCache<AccessorRequest, Resolution>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub computations: u64,
}

/// Memoizing map that computes each key at most once.
///
/// Every key owns a `OnceLock` slot. The first caller for a key runs the
/// computation inside the slot; concurrent callers for the same key block
/// on that slot and then read the finished value. Entries live until
/// explicitly invalidated.
pub struct MemoCache<K, V> {
    slots: DashMap<K, Arc<OnceLock<V>>>,
    hits: AtomicU64,
    computations: AtomicU64,
}

impl<K, V> Default for MemoCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MemoCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            hits: AtomicU64::new(0),
            computations: AtomicU64::new(0),
        }
    }

    pub fn get_or_compute<F>(&self, key: &K, compute: F) -> V
    where
        F: FnOnce(&K) -> V,
    {
        if let Some(value) = self.peek(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return value;
        }

        // Clone the slot out so no map lock is held while computing.
        let slot = Arc::clone(self.slots.entry(key.clone()).or_default().value());

        let mut computed = false;
        let value = slot
            .get_or_init(|| {
                computed = true;
                self.computations.fetch_add(1, Ordering::Relaxed);
                compute(key)
            })
            .clone();

        if !computed {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    /// The finished value for `key`, without computing or waiting.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.slots.get(key).and_then(|slot| slot.get().cloned())
    }

    pub fn invalidate(&self, key: &K) -> bool {
        self.slots.remove(key).is_some()
    }

    pub fn invalidate_all(&self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.slots.len(),
            hits: self.hits.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
        }
    }
}

impl MemoCache<AccessorRequest, Resolution> {
    pub fn get_or_resolve<F>(&self, request: &AccessorRequest, resolver: F) -> Resolution
    where
        F: FnOnce(&AccessorRequest) -> Resolution,
    {
        self.get_or_compute(request, resolver)
    }

    pub fn failures(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.value().get(), Some(Err(_))))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::accessor::MatchQuality;
    use crate::host::{Invoker, MemberHandle, MemberInfo, ObjectRef, Value};

    fn profile_ctor() -> AccessorRequest {
        AccessorRequest::constructor("ProfileHolder", &[])
    }

    fn resolved(request: &AccessorRequest) -> Resolution {
        let invoker: Invoker = Arc::new(|_: Option<&ObjectRef>, _: &[Value]| Ok(Value::Null));
        Ok(Arc::new(ResolvedAccessor::new(
            request.clone(),
            "test.ProfileHolder".into(),
            MemberInfo::constructor(&[]),
            MatchQuality::Exact,
            MemberHandle::Callable(invoker),
        )))
    }

    #[test]
    fn test_second_lookup_is_a_hit() {
        let cache = AccessorCache::new();
        let resolutions = AtomicUsize::new(0);
        let request = profile_ctor();

        let first = cache
            .get_or_resolve(&request, |r| {
                resolutions.fetch_add(1, Ordering::SeqCst);
                resolved(r)
            })
            .unwrap();
        let second = cache
            .get_or_resolve(&request, |r| {
                resolutions.fetch_add(1, Ordering::SeqCst);
                resolved(r)
            })
            .unwrap();

        assert_eq!(resolutions.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            cache.stats(),
            CacheStats {
                entries: 1,
                hits: 1,
                computations: 1
            }
        );
    }

    #[test]
    fn test_failures_are_cached_until_invalidated() {
        let cache = AccessorCache::new();
        let resolutions = AtomicUsize::new(0);
        let request = profile_ctor();
        let fail = |r: &AccessorRequest| -> Resolution {
            resolutions.fetch_add(1, Ordering::SeqCst);
            Err(ResolutionError::NotFound {
                request: r.clone(),
                version: "1.20.4".into(),
                tried: Vec::new(),
            })
        };

        assert!(cache.get_or_resolve(&request, fail).is_err());
        assert!(cache.get_or_resolve(&request, fail).is_err());
        assert_eq!(resolutions.load(Ordering::SeqCst), 1);
        assert_eq!(cache.failures(), 1);

        assert!(cache.invalidate(&request));
        assert!(!cache.invalidate(&request));
        assert!(cache.get_or_resolve(&request, resolved).is_ok());
        assert_eq!(resolutions.load(Ordering::SeqCst), 1);
        assert_eq!(cache.failures(), 0);
    }

    #[test]
    fn test_concurrent_callers_share_one_resolution() {
        const CALLERS: usize = 16;

        let cache = AccessorCache::new();
        let resolutions = AtomicUsize::new(0);
        let barrier = Barrier::new(CALLERS);
        let request = profile_ctor();

        let results: Vec<Resolution> = thread::scope(|scope| {
            let handles: Vec<_> = (0..CALLERS)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        cache.get_or_resolve(&request, |r| {
                            resolutions.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            resolved(r)
                        })
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(resolutions.load(Ordering::SeqCst), 1);
        let first = results[0].as_ref().unwrap();
        for result in &results {
            assert!(Arc::ptr_eq(first, result.as_ref().unwrap()));
        }
        let stats = cache.stats();
        assert_eq!(stats.computations, 1);
        assert_eq!(stats.hits, (CALLERS - 1) as u64);
    }

    #[test]
    fn test_generic_memo() {
        let cache: MemoCache<String, usize> = MemoCache::default();
        assert_eq!(cache.get_or_compute(&"abc".to_owned(), |k| k.len()), 3);
        assert_eq!(cache.peek(&"abc".to_owned()), Some(3));
        assert_eq!(cache.peek(&"zz".to_owned()), None);
        cache.invalidate_all();
        assert!(cache.is_empty());
    }
}
