//! Bounded in-memory LRU cache for derived results

use lru::LruCache;

/// Approximate heap footprint of a cached value, in bytes
pub trait Weigh {
    fn weight(&self) -> usize;
}

impl Weigh for String {
    fn weight(&self) -> usize {
        self.capacity()
    }
}

impl<T: Weigh> Weigh for Option<T> {
    fn weight(&self) -> usize {
        self.as_ref().map_or(0, Weigh::weight)
    }
}

impl<T: Weigh> Weigh for Vec<T> {
    fn weight(&self) -> usize {
        self.capacity() * std::mem::size_of::<T>() + self.iter().map(Weigh::weight).sum::<usize>()
    }
}

/// LRU store bounded by a byte budget rather than an entry count
///
/// Entries are evicted least-recently-used first until the budget holds
/// again. A value bigger than the whole budget is never stored.
pub struct ComputeCache<V> {
    entries: LruCache<String, (V, usize)>,
    used_bytes: usize,
    budget_bytes: usize,
    hits: u64,
    misses: u64,
}

impl<V: Weigh + Clone> ComputeCache<V> {
    pub fn new(budget_bytes: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            used_bytes: 0,
            budget_bytes,
            hits: 0,
            misses: 0,
        }
    }

    /// Budget given in megabytes
    pub fn with_megabytes(megabytes: u64) -> Self {
        let bytes = megabytes.saturating_mul(1024 * 1024);
        Self::new(usize::try_from(bytes).unwrap_or(usize::MAX))
    }

    /// Returns a copy of the value and marks it most recently used
    pub fn get(&mut self, key: &str) -> Option<V> {
        match self.entries.get(key) {
            Some((value, _)) => {
                self.hits += 1;
                Some(value.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn put(&mut self, key: String, value: V) {
        let size = key.len() + std::mem::size_of::<V>() + value.weight();

        if let Some((_, old_size)) = self.entries.pop(&key) {
            self.used_bytes -= old_size;
        }

        if size > self.budget_bytes {
            tracing::debug!(
                "Not caching {} bytes: exceeds compute cache budget of {} bytes",
                size,
                self.budget_bytes
            );
            return;
        }

        self.entries.put(key, (value, size));
        self.used_bytes += size;

        while self.used_bytes > self.budget_bytes {
            match self.entries.pop_lru() {
                Some((_, (_, evicted))) => self.used_bytes -= evicted,
                None => break,
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.used_bytes = 0;
    }
}
