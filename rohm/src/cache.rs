use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// Values keyed by the type they describe, each computed at most once.
#[derive(Default)]
pub struct TypeCache {
    inner: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl TypeCache {
    /// Returns the cached value for `T`, building it on first use. A failed build
    /// caches nothing, so the next call tries again and fails the same way.
    pub fn get_or_try_init<T, V, E>(&self, build: impl FnOnce() -> Result<V, E>) -> Result<Arc<V>, E>
    where
        T: 'static,
        V: Send + Sync + 'static,
    {
        let key = TypeId::of::<T>();
        if let Some(found) = self.lookup::<V>(key) {
            return Ok(found);
        }
        // built outside the lock, the first insert wins
        let built: Arc<dyn Any + Send + Sync> = Arc::new(build()?);
        let erased = {
            let mut map = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            map.entry(key).or_insert(built).clone()
        };
        Ok(Self::downcast(erased))
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup<V: Send + Sync + 'static>(&self, key: TypeId) -> Option<Arc<V>> {
        let map = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        map.get(&key).cloned().map(Self::downcast)
    }

    fn downcast<V: Send + Sync + 'static>(erased: Arc<dyn Any + Send + Sync>) -> Arc<V> {
        match Arc::downcast::<V>(erased) {
            Ok(value) => value,
            // one TypeId always maps to one value type
            Err(_) => unreachable!("type cache entry holds a foreign value type"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct A;
    struct B;

    #[test]
    fn builds_once_per_type() {
        let cache = TypeCache::default();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let v = cache.get_or_try_init::<A, String, ()>(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("a".to_string())
            }).unwrap();
            assert_eq!(v.as_str(), "a");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        cache.get_or_try_init::<B, String, ()>(|| Ok("b".to_string())).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = TypeCache::default();
        assert!(cache.get_or_try_init::<A, String, &str>(|| Err("bad")).is_err());
        assert!(cache.is_empty());
        assert_eq!(*cache.get_or_try_init::<A, String, &str>(|| Ok("ok".to_string())).unwrap(), "ok");
    }
}
