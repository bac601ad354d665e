//! Cache and load statistics.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Lock-free counters updated by the manager on every lookup and load.
#[derive(Debug, Default)]
pub struct LoadCounters {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    total_loads: AtomicU64,
    failed_loads: AtomicU64,
    total_load_micros: AtomicU64,
}

impl LoadCounters {
    pub fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished load attempt.
    pub fn record_load(&self, success: bool, elapsed: Duration) {
        self.total_loads.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failed_loads.fetch_add(1, Ordering::Relaxed);
        }
        self.total_load_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    /// A load rejected before any decode ran.
    pub fn record_rejected(&self) {
        self.total_loads.fetch_add(1, Ordering::Relaxed);
        self.failed_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn total_loads(&self) -> u64 {
        self.total_loads.load(Ordering::Relaxed)
    }

    pub fn failed_loads(&self) -> u64 {
        self.failed_loads.load(Ordering::Relaxed)
    }

    pub fn total_load_time(&self) -> Duration {
        Duration::from_micros(self.total_load_micros.load(Ordering::Relaxed))
    }
}

/// Point-in-time snapshot of a manager.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceStatistics {
    pub total_resources: usize,
    pub loaded_resources: usize,
    pub failed_resources: usize,
    pub cached_resources: usize,
    /// Sum of payload size estimates, in bytes.
    pub memory_usage: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_loads: u64,
    pub failed_loads: u64,
    pub total_load_time: Duration,
    pub average_load_time: Duration,
}

impl ResourceStatistics {
    /// Hit ratio in `[0, 1]`, 0 when nothing was looked up yet.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.cache_hits + self.cache_misses;
        if lookups == 0 {
            0.0
        } else {
            self.cache_hits as f64 / lookups as f64
        }
    }

    /// Fold another snapshot into this one.
    pub fn merge(&mut self, other: &ResourceStatistics) {
        self.total_resources += other.total_resources;
        self.loaded_resources += other.loaded_resources;
        self.failed_resources += other.failed_resources;
        self.cached_resources += other.cached_resources;
        self.memory_usage += other.memory_usage;
        self.cache_hits += other.cache_hits;
        self.cache_misses += other.cache_misses;
        self.total_loads += other.total_loads;
        self.failed_loads += other.failed_loads;
        self.total_load_time += other.total_load_time;
        self.average_load_time = average(self.total_load_time, self.total_loads);
    }
}

pub(crate) fn average(total: Duration, count: u64) -> Duration {
    match u32::try_from(count) {
        Ok(0) => Duration::ZERO,
        Ok(n) => total / n,
        Err(_) => Duration::from_secs_f64(total.as_secs_f64() / count as f64),
    }
}

impl fmt::Display for ResourceStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Resources: {} total, {} loaded, {} failed, {} cached",
            self.total_resources, self.loaded_resources, self.failed_resources, self.cached_resources
        )?;
        writeln!(f, "Memory: {:.2} KiB", self.memory_usage as f64 / 1024.0)?;
        writeln!(
            f,
            "Cache: {} hits, {} misses ({:.1}% hit rate)",
            self.cache_hits,
            self.cache_misses,
            self.hit_rate() * 100.0
        )?;
        write!(
            f,
            "Loads: {} total, {} failed, {:.2?} total time, {:.2?} average",
            self.total_loads, self.failed_loads, self.total_load_time, self.average_load_time
        )
    }
}
