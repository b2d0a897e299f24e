use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

/// 缓存中的最近结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CachedResult {
    pub count: u64,
    pub size_bytes: u64,
    #[serde(skip)]
    pub age: Duration,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    interval: Duration,
    last: Option<(u64, u64)>,
    last_refresh: DateTime<Utc>,
}

/// 各类别“可清理量”缓存，失效后下一次预览只重新扫描该类别
#[derive(Debug)]
pub struct CategoryCache {
    default_interval: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl CategoryCache {
    pub fn new(default_interval: Duration) -> Self {
        Self {
            default_interval,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 登记类别的刷新间隔；已有结果保留
    pub fn register(&self, category_id: &str, interval: Duration) {
        let mut guard = self.lock();
        guard
            .entry(category_id.to_string())
            .and_modify(|e| e.interval = interval)
            .or_insert(CacheEntry {
                interval,
                last: None,
                last_refresh: DateTime::UNIX_EPOCH,
            });
    }

    /// 从未扫描过，或距上次刷新已满一个间隔
    pub fn needs_refresh(&self, category_id: &str, now: DateTime<Utc>) -> bool {
        let guard = self.lock();
        match guard.get(category_id) {
            Some(entry) if entry.last.is_some() => now - entry.last_refresh >= entry.interval,
            _ => true,
        }
    }

    pub fn record_result(&self, category_id: &str, count: u64, size_bytes: u64, now: DateTime<Utc>) {
        let mut guard = self.lock();
        let default_interval = self.default_interval;
        let entry = guard
            .entry(category_id.to_string())
            .or_insert_with(|| CacheEntry {
                interval: default_interval,
                last: None,
                last_refresh: DateTime::UNIX_EPOCH,
            });
        entry.last = Some((count, size_bytes));
        entry.last_refresh = now;
    }

    pub fn get_last(&self, category_id: &str, now: DateTime<Utc>) -> Option<CachedResult> {
        let guard = self.lock();
        let entry = guard.get(category_id)?;
        let (count, size_bytes) = entry.last?;
        Some(CachedResult {
            count,
            size_bytes,
            age: now - entry.last_refresh,
        })
    }

    /// 强制下一次检查时重新扫描
    pub fn invalidate(&self, category_id: &str) {
        if let Some(entry) = self.lock().get_mut(category_id) {
            entry.last_refresh = DateTime::UNIX_EPOCH;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_lifecycle_follows_interval() {
        let cache = CategoryCache::new(Duration::seconds(2));
        let t0 = Utc::now();
        cache.register("temp", Duration::seconds(2));

        assert!(cache.needs_refresh("temp", t0));

        cache.record_result("temp", 4, 400, t0);
        assert!(!cache.needs_refresh("temp", t0));
        assert!(!cache.needs_refresh("temp", t0 + Duration::milliseconds(1999)));
        assert!(cache.needs_refresh("temp", t0 + Duration::seconds(2)));
    }

    #[test]
    fn unknown_category_always_needs_refresh() {
        let cache = CategoryCache::new(Duration::seconds(2));
        assert!(cache.needs_refresh("never-seen", Utc::now()));
        assert!(cache.get_last("never-seen", Utc::now()).is_none());
    }

    #[test]
    fn invalidate_forces_only_that_category() {
        let cache = CategoryCache::new(Duration::seconds(60));
        let t0 = Utc::now();
        cache.record_result("temp", 1, 10, t0);
        cache.record_result("dns", 2, 20, t0);

        cache.invalidate("temp");

        assert!(cache.needs_refresh("temp", t0));
        assert!(!cache.needs_refresh("dns", t0));
        // 旧数值仍保留，供扫描失败时回退
        assert_eq!(cache.get_last("temp", t0).map(|r| r.count), Some(1));
    }

    #[test]
    fn get_last_reports_age() {
        let cache = CategoryCache::new(Duration::seconds(2));
        let t0 = Utc::now();
        cache.record_result("temp", 3, 30, t0);

        let last = cache.get_last("temp", t0 + Duration::seconds(7)).unwrap();
        assert_eq!((last.count, last.size_bytes), (3, 30));
        assert_eq!(last.age, Duration::seconds(7));
    }

    #[test]
    fn register_keeps_existing_results() {
        let cache = CategoryCache::new(Duration::seconds(2));
        let t0 = Utc::now();
        cache.record_result("temp", 3, 30, t0);
        cache.register("temp", Duration::seconds(10));

        assert!(!cache.needs_refresh("temp", t0 + Duration::seconds(5)));
    }
}
