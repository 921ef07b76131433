//! 单槽位响应缓存。
//!
//! 只保存最近一次成功的响应；写入时整体替换（ArcSwap 单次原子交换），读者不会看到半写入的状态。

use arc_swap::ArcSwapOption;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct CacheEntry<T> {
    payload: Arc<T>,
    stored_at: Instant,
}

#[derive(Debug)]
pub struct ResponseCache<T> {
    ttl: Duration,
    slot: ArcSwapOption<CacheEntry<T>>,
}

impl<T> ResponseCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: ArcSwapOption::empty(),
        }
    }

    pub fn read(&self) -> Option<Arc<T>> {
        self.read_at(Instant::now())
    }

    /// 存活时间 < TTL 才算命中。
    pub fn read_at(&self, now: Instant) -> Option<Arc<T>> {
        let entry = self.slot.load_full()?;
        if now.saturating_duration_since(entry.stored_at) < self.ttl {
            Some(entry.payload.clone())
        } else {
            None
        }
    }

    pub fn write(&self, payload: T) -> Arc<T> {
        self.write_at(payload, Instant::now())
    }

    pub fn write_at(&self, payload: T, now: Instant) -> Arc<T> {
        let payload = Arc::new(payload);
        self.slot.store(Some(Arc::new(CacheEntry {
            payload: payload.clone(),
            stored_at: now,
        })));
        payload
    }
}

impl<T> Default for ResponseCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cache_misses() {
        let cache: ResponseCache<String> = ResponseCache::default();
        assert!(cache.read().is_none());
    }

    #[test]
    fn entry_is_valid_strictly_within_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let t0 = Instant::now();
        cache.write_at("first".to_string(), t0);

        assert_eq!(cache.read_at(t0).as_deref().map(String::as_str), Some("first"));
        assert!(cache.read_at(t0 + Duration::from_secs(59)).is_some());
        assert!(cache.read_at(t0 + Duration::from_secs(60)).is_none());
    }

    #[test]
    fn write_replaces_previous_entry() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let t0 = Instant::now();
        cache.write_at("first".to_string(), t0);
        cache.write_at("second".to_string(), t0 + Duration::from_secs(90));

        let hit = cache.read_at(t0 + Duration::from_secs(100)).unwrap();
        assert_eq!(hit.as_str(), "second");
    }

    #[test]
    fn zero_ttl_never_hits() {
        let cache = ResponseCache::new(Duration::ZERO);
        let t0 = Instant::now();
        cache.write_at(1u32, t0);
        assert!(cache.read_at(t0).is_none());
    }
}
