//! Short-lived weather cache shared by concurrent planning runs.

use dashmap::DashMap;
use evroute_core::{Coordinate, WeatherSample};
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Cache cells are 0.1° on a side (roughly 11 km at the equator).
const GRID_CELLS_PER_DEGREE: f64 = 10.0;

pub trait CacheEntry {
    fn fetched_at(&self) -> Instant;
}

/// Drop entries older than `max_age`, then the oldest until at most `max_entries` remain.
pub fn prune_cache<K, V>(cache: &DashMap<K, V>, max_entries: usize, max_age: Duration)
where
    K: Clone + Eq + Hash,
    V: CacheEntry,
{
    let now = Instant::now();
    let mut entries: Vec<(K, Instant)> = cache
        .iter()
        .map(|entry| (entry.key().clone(), entry.value().fetched_at()))
        .collect();

    entries.retain(|(key, fetched_at)| {
        let expired = now.duration_since(*fetched_at) > max_age;
        if expired {
            cache.remove(key);
        }
        !expired
    });

    if cache.len() <= max_entries {
        return;
    }

    entries.sort_by_key(|(_, fetched_at)| *fetched_at);
    for (key, _) in entries {
        if cache.len() <= max_entries {
            break;
        }
        cache.remove(&key);
    }
}

type GridKey = (i64, i64);

#[derive(Debug, Clone)]
struct CachedWeather {
    fetched_at: Instant,
    sample: WeatherSample,
}

impl CacheEntry for CachedWeather {
    fn fetched_at(&self) -> Instant {
        self.fetched_at
    }
}

#[derive(Debug)]
pub struct WeatherCache {
    entries: DashMap<GridKey, CachedWeather>,
    ttl: Duration,
    max_entries: usize,
}

impl WeatherCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    fn key(point: Coordinate) -> GridKey {
        (
            (point.lat * GRID_CELLS_PER_DEGREE).round() as i64,
            (point.lon * GRID_CELLS_PER_DEGREE).round() as i64,
        )
    }

    /// Fresh sample for the grid cell containing `point`, if any.
    pub fn get(&self, point: Coordinate) -> Option<WeatherSample> {
        let key = Self::key(point);
        let entry = self.entries.get(&key)?;
        if entry.fetched_at.elapsed() > self.ttl {
            drop(entry);
            self.entries.remove(&key);
            return None;
        }
        Some(entry.sample.clone())
    }

    pub fn insert(&self, point: Coordinate, sample: WeatherSample) {
        self.entries.insert(
            Self::key(point),
            CachedWeather {
                fetched_at: Instant::now(),
                sample,
            },
        );
        if self.entries.len() > self.max_entries {
            prune_cache(&self.entries, self.max_entries, self.ttl);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for WeatherCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(600), 4096)
    }
}
