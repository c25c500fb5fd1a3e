use crate::data::bar::PriceBar;
use crate::data::loader::PriceSource;
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

//(symbol, source id)
type CacheKey = (String, String);

#[derive(Debug, Clone)]
struct CacheEntry {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    bars: Arc<Vec<PriceBar>>,
    fetched_at: Instant,
}

impl CacheEntry {
    fn serves(&self, start: DateTime<Utc>, end: DateTime<Utc>, ttl: Duration) -> bool {
        self.start <= start && self.end >= end && self.fetched_at.elapsed() < ttl
    }
}

//wraps a price source with a read-mostly cache of raw bars
//an entry only serves ranges it covers and only while it is younger than the ttl;
//concurrent misses fetch independently and the last writer wins
pub struct CachedPriceSource<S: PriceSource> {
    inner: S,
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl<S: PriceSource> CachedPriceSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        CachedPriceSource {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    //drops every cached entry
    pub fn clear(&self) {
        match self.entries.write() {
            Ok(mut entries) => entries.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    fn key(&self, symbol: &str) -> CacheKey {
        (symbol.to_string(), self.inner.source_id().to_string())
    }

    fn lookup(
        &self,
        key: &CacheKey,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<Arc<Vec<PriceBar>>> {
        let entries = match self.entries.read() {
            Ok(entries) => entries,
            Err(_) => {
                warn!("price cache lock poisoned, bypassing cache");
                return None;
            }
        };
        entries
            .get(key)
            .filter(|entry| entry.serves(start, end, self.ttl))
            .map(|entry| Arc::clone(&entry.bars))
    }
}

impl<S: PriceSource> PriceSource for CachedPriceSource<S> {
    fn source_id(&self) -> &str {
        self.inner.source_id()
    }

    fn fetch(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>> {
        let key = self.key(symbol);

        if let Some(bars) = self.lookup(&key, start, end) {
            debug!(symbol, source = self.inner.source_id(), "price cache hit");
            return Ok(bars.as_ref().clone());
        }

        debug!(symbol, source = self.inner.source_id(), "price cache miss");
        let bars = self.inner.fetch(symbol, start, end)?;

        let entry = CacheEntry {
            start,
            end,
            bars: Arc::new(bars.clone()),
            fetched_at: Instant::now(),
        };
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, entry);
        }

        Ok(bars)
    }
}
