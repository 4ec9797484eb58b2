use serde::Serialize;
use vtmem_utils::sync::{AtomicU64, Ordering};

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct CacheStat {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub size: usize,
}

impl CacheStat {
    fn new(hits: u64, misses: u64, size: usize) -> Self {
        let total = hits + misses;
        Self {
            hits,
            misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
            size,
        }
    }
}

impl std::fmt::Display for CacheStat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "hits: {:>8}, misses: {:>8}, hit_rate: {:>6.2}%, size: {:>8}",
            self.hits,
            self.misses,
            self.hit_rate * 100.0,
            self.size
        )
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub instance_layout: CacheStat,
    pub array_layout: CacheStat,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Cache Statistics:")?;
        writeln!(f, "  Instance Layout:  {}", self.instance_layout)?;
        writeln!(f, "  Array Layout:     {}", self.array_layout)?;
        Ok(())
    }
}

/// Layout cache counters.
///
/// All counters use `Ordering::Relaxed`; they are independent and never used to
/// synchronize other memory.
#[derive(Debug, Default)]
pub struct LayoutMetrics {
    pub instance_layout_cache_hits: AtomicU64,
    pub instance_layout_cache_misses: AtomicU64,
    pub array_layout_cache_hits: AtomicU64,
    pub array_layout_cache_misses: AtomicU64,
}

impl LayoutMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_instance_layout_cache_hit(&self) {
        self.instance_layout_cache_hits
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_instance_layout_cache_miss(&self) {
        self.instance_layout_cache_misses
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_array_layout_cache_hit(&self) {
        self.array_layout_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_array_layout_cache_miss(&self) {
        self.array_layout_cache_misses
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_statistics(&self, instance_size: usize, array_size: usize) -> CacheStats {
        CacheStats {
            instance_layout: CacheStat::new(
                self.instance_layout_cache_hits.load(Ordering::Relaxed),
                self.instance_layout_cache_misses.load(Ordering::Relaxed),
                instance_size,
            ),
            array_layout: CacheStat::new(
                self.array_layout_cache_hits.load(Ordering::Relaxed),
                self.array_layout_cache_misses.load(Ordering::Relaxed),
                array_size,
            ),
        }
    }
}
