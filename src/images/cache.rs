use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Content id -> validated image URL, with passive TTL expiry.
///
/// Expired entries are dropped when read. At capacity, a write first evicts
/// the oldest half of the entries by save time.
pub struct ImageResolutionCache {
    ttl: Option<Duration>,
    max: usize,
    store: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl ImageResolutionCache {
    /// `ttl_secs <= 0` disables expiry, as does a TTL too large to represent.
    /// `max == 0` disables eviction.
    pub fn new(ttl_secs: i64, max: usize) -> Self {
        Self {
            ttl: (ttl_secs > 0)
                .then(|| Duration::try_seconds(ttl_secs))
                .flatten(),
            max,
            store: Mutex::new(HashMap::new()),
        }
    }

    /// Cached URL for `key`, or an empty string.
    pub fn get(&self, key: &str) -> String {
        self.get_at(key, Utc::now())
    }

    pub fn set(&self, key: &str, url: &str) {
        self.set_at(key, url, Utc::now())
    }

    fn get_at(&self, key: &str, now: DateTime<Utc>) -> String {
        if key.is_empty() {
            return String::new();
        }
        let Ok(mut store) = self.store.lock() else {
            return String::new();
        };

        match store.get(key) {
            Some((_, saved_at)) if self.expired(*saved_at, now) => {
                store.remove(key);
                String::new()
            }
            Some((url, _)) => url.clone(),
            None => String::new(),
        }
    }

    fn set_at(&self, key: &str, url: &str, now: DateTime<Utc>) {
        if key.is_empty() || url.is_empty() {
            return;
        }
        let Ok(mut store) = self.store.lock() else {
            return;
        };

        if self.max > 0 && store.len() >= self.max {
            let mut by_age: Vec<(String, DateTime<Utc>)> =
                store.iter().map(|(k, (_, ts))| (k.clone(), *ts)).collect();
            by_age.sort_by_key(|(_, ts)| *ts);

            let evict = (self.max / 2).max(1);
            for (k, _) in by_age.into_iter().take(evict) {
                store.remove(&k);
            }
            log::debug!("image cache evicted {evict} entries");
        }

        store.insert(key.to_string(), (url.to_string(), now));
    }

    fn expired(&self, saved_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self.ttl {
            Some(ttl) => now - saved_at > ttl,
            None => false,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.store.lock().map(|s| s.len()).unwrap_or(0)
    }
}
