//! Single-flight result cache with per-kind TTLs.
//!
//! Entries are keyed by (symbol, analysis kind, parameter hash, data
//! version). The first caller for a key computes; callers that arrive while
//! that computation runs wait for it instead of starting their own. Failures
//! are handed to every waiter and never cached. If the computing caller goes
//! away without finishing (panic, early return), its slot is released and the
//! waiters are woken with an error.
//!
//! Ready entries are evicted when their TTL lapses, when a newer data version
//! for the same symbol, kind and parameters is requested, or on `invalidate`.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use quantscope_core::config::EngineConfig;
use quantscope_core::fingerprint::{DataVersion, ParamHash};
use quantscope_core::{AnalyticsError, Deadline};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::{CacheStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Indicators,
    Correlation,
    Risk,
    Anomaly,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 4] = [
        AnalysisKind::Indicators,
        AnalysisKind::Correlation,
        AnalysisKind::Risk,
        AnalysisKind::Anomaly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Indicators => "indicators",
            AnalysisKind::Correlation => "correlation",
            AnalysisKind::Risk => "risk",
            AnalysisKind::Anomaly => "anomaly",
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time-to-live per analysis kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub indicators: Duration,
    pub correlation: Duration,
    pub risk: Duration,
    pub anomaly: Duration,
}

impl TtlPolicy {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            indicators: Duration::from_secs(config.indicator_ttl_secs),
            correlation: Duration::from_secs(config.correlation_ttl_secs),
            risk: Duration::from_secs(config.risk_ttl_secs),
            anomaly: Duration::from_secs(config.anomaly_ttl_secs),
        }
    }

    /// Same TTL for every kind.
    pub fn uniform(ttl: Duration) -> Self {
        Self {
            indicators: ttl,
            correlation: ttl,
            risk: ttl,
            anomaly: ttl,
        }
    }

    pub fn for_kind(&self, kind: AnalysisKind) -> Duration {
        match kind {
            AnalysisKind::Indicators => self.indicators,
            AnalysisKind::Correlation => self.correlation,
            AnalysisKind::Risk => self.risk,
            AnalysisKind::Anomaly => self.anomaly,
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Identity of one cached analysis.
///
/// Multi-asset results use the comma-joined symbol list as `symbol` and the
/// combined data version of every input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub kind: AnalysisKind,
    pub params: ParamHash,
    pub version: DataVersion,
}

impl CacheKey {
    pub fn new(
        symbol: impl Into<String>,
        kind: AnalysisKind,
        params: ParamHash,
        version: DataVersion,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            kind,
            params,
            version,
        }
    }

    /// Key used with an external `CacheStore`: a readable prefix plus a
    /// BLAKE3 digest of every key component.
    pub fn storage_key(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for part in [
            self.symbol.as_str(),
            self.kind.as_str(),
            self.params.0.as_str(),
            self.version.fingerprint.as_str(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update(&[0]);
        }
        let digest = hasher.finalize().to_hex();
        format!("quantscope:{}:{}:{}", self.kind, self.symbol, &digest[..32])
    }

    fn covers(&self, symbol: &str) -> bool {
        self.symbol.split(',').any(|s| s == symbol)
    }

    /// Whether `self` carries newer (or revised) data than `other` for the
    /// same symbol, kind and parameters.
    fn supersedes(&self, other: &CacheKey) -> bool {
        self.symbol == other.symbol
            && self.kind == other.kind
            && self.params == other.params
            && self.version != other.version
            && other.version.as_of <= self.version.as_of
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}@{}",
            self.kind,
            self.symbol,
            self.version.short()
        )
    }
}

/// How a lookup was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheOutcome {
    /// Fresh entry already in memory.
    Hit,
    /// This caller ran the computation.
    Miss,
    /// Another caller was already computing; this one waited for it.
    Joined,
    /// Loaded from the external store.
    Store,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub joins: u64,
    pub evictions: u64,
    pub store_hits: u64,
    pub entries: usize,
    pub in_flight: usize,
}

impl CacheStats {
    /// Share of lookups that did not start a computation.
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.joins + self.store_hits;
        let total = served + self.misses;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }
}

/// A cached value and how it was obtained.
#[derive(Debug)]
pub struct Cached<T> {
    pub value: Arc<T>,
    pub outcome: CacheOutcome,
}

type Shared = Arc<dyn Any + Send + Sync>;

enum Slot {
    Ready { value: Shared, expires_at: Instant },
    Pending(Arc<Flight>),
}

/// One in-progress computation that waiters block on.
struct Flight {
    outcome: Mutex<Option<Result<Shared, AnalyticsError>>>,
    done: Condvar,
}

impl Flight {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    fn finish(&self, result: Result<Shared, AnalyticsError>) {
        let mut outcome = lock(&self.outcome);
        if outcome.is_none() {
            *outcome = Some(result);
        }
        self.done.notify_all();
    }

    fn wait(&self, deadline: &Deadline, context: &str) -> Result<Shared, AnalyticsError> {
        let mut outcome = lock(&self.outcome);
        loop {
            if let Some(result) = outcome.as_ref() {
                return result.clone();
            }
            match deadline.remaining() {
                None => {
                    outcome = self
                        .done
                        .wait(outcome)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Some(left) if left.is_zero() => {
                    return Err(AnalyticsError::Timeout {
                        context: format!("waiting for {context}"),
                        budget_ms: deadline.budget_ms(),
                    });
                }
                Some(left) => {
                    outcome = self
                        .done
                        .wait_timeout(outcome, left)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }
    }
}

enum Lookup {
    Fresh(Shared),
    InFlight(Arc<Flight>),
    Absent,
}

#[derive(Default)]
struct Slots {
    map: HashMap<CacheKey, Slot>,
    stats: CacheStats,
}

impl Slots {
    fn evict_superseded(&mut self, key: &CacheKey) {
        let before = self.map.len();
        self.map
            .retain(|k, slot| !(matches!(slot, Slot::Ready { .. }) && key.supersedes(k)));
        let evicted = before - self.map.len();
        if evicted > 0 {
            debug!(key = %key, evicted, "newer data version evicted cached results");
            self.stats.evictions += evicted as u64;
        }
    }

    /// Drop every ready entry whose TTL has lapsed by `now`.
    fn evict_expired(&mut self, now: Instant) -> usize {
        let before = self.map.len();
        self.map
            .retain(|_, slot| !matches!(slot, Slot::Ready { expires_at, .. } if *expires_at <= now));
        let evicted = before - self.map.len();
        if evicted > 0 {
            debug!(evicted, "expired cache entries evicted");
            self.stats.evictions += evicted as u64;
        }
        evicted
    }
}

/// The engine's result cache. The only shared mutable state in a request.
pub struct ResultCache {
    slots: Mutex<Slots>,
    ttl: TtlPolicy,
    store: Option<Arc<dyn CacheStore>>,
}

impl ResultCache {
    pub fn new(ttl: TtlPolicy) -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            ttl,
            store: None,
        }
    }

    /// Write every computed result through to `store` and consult it on
    /// in-memory misses.
    pub fn with_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn ttl(&self) -> &TtlPolicy {
        &self.ttl
    }

    /// Return the cached value for `key`, or run `compute` exactly once
    /// across all concurrent callers for that key.
    ///
    /// Joining callers wait at most until `deadline` and then fail with
    /// `Timeout`; the computation itself keeps running for its own caller.
    pub fn get_or_compute<T, F>(
        &self,
        key: &CacheKey,
        deadline: &Deadline,
        compute: F,
    ) -> Result<Cached<T>, AnalyticsError>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
        F: FnOnce() -> Result<T, AnalyticsError>,
    {
        let flight = {
            let mut slots = self.lock();
            slots.evict_superseded(key);
            slots.evict_expired(Instant::now());
            let lookup = match slots.map.get(key) {
                Some(Slot::Ready { value, .. }) => Lookup::Fresh(value.clone()),
                Some(Slot::Pending(flight)) => Lookup::InFlight(flight.clone()),
                None => Lookup::Absent,
            };
            match lookup {
                Lookup::Fresh(value) => {
                    slots.stats.hits += 1;
                    drop(slots);
                    debug!(key = %key, "cache hit");
                    return downcast(value, key).map(|value| Cached {
                        value,
                        outcome: CacheOutcome::Hit,
                    });
                }
                Lookup::InFlight(flight) => {
                    slots.stats.joins += 1;
                    drop(slots);
                    debug!(key = %key, "joining in-flight computation");
                    let value = flight.wait(deadline, &key.to_string())?;
                    return downcast(value, key).map(|value| Cached {
                        value,
                        outcome: CacheOutcome::Joined,
                    });
                }
                Lookup::Absent => {}
            }
            slots.stats.misses += 1;
            let flight = Arc::new(Flight::new());
            slots.map.insert(key.clone(), Slot::Pending(flight.clone()));
            flight
        };

        let guard = FlightGuard {
            cache: self,
            key,
            flight,
            finished: false,
        };

        let (result, outcome) = match self.load_from_store::<T>(key) {
            Some(value) => (Ok(value), CacheOutcome::Store),
            None => {
                debug!(key = %key, "cache miss; computing");
                (compute(), CacheOutcome::Miss)
            }
        };

        match result {
            Ok(value) => {
                let value = Arc::new(value);
                if outcome == CacheOutcome::Miss {
                    self.write_through(key, value.as_ref());
                }
                let shared: Shared = value.clone();
                guard.complete(Ok(shared));
                Ok(Cached { value, outcome })
            }
            Err(err) => {
                debug!(key = %key, error = %err, "computation failed; not cached");
                guard.complete(Err(err.clone()));
                Err(err)
            }
        }
    }

    /// Drop every ready entry that involves `symbol`. Returns how many were
    /// removed. In-flight computations are left to finish.
    pub fn invalidate(&self, symbol: &str) -> usize {
        let mut slots = self.lock();
        let before = slots.map.len();
        slots
            .map
            .retain(|k, slot| !(matches!(slot, Slot::Ready { .. }) && k.covers(symbol)));
        let removed = before - slots.map.len();
        slots.stats.evictions += removed as u64;
        removed
    }

    /// Drop every ready entry whose TTL has lapsed. Lookups already sweep
    /// expired entries; this is for callers that want memory back while idle.
    pub fn purge_expired(&self) -> usize {
        self.lock().evict_expired(Instant::now())
    }

    pub fn clear(&self) {
        let mut slots = self.lock();
        slots
            .map
            .retain(|_, slot| matches!(slot, Slot::Pending(_)));
    }

    pub fn stats(&self) -> CacheStats {
        let slots = self.lock();
        let in_flight = slots
            .map
            .values()
            .filter(|s| matches!(s, Slot::Pending(_)))
            .count();
        CacheStats {
            entries: slots.map.len() - in_flight,
            in_flight,
            ..slots.stats
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        lock(&self.slots)
    }

    /// Publish a finished computation: ready entry on success, slot removed
    /// on failure. A slot that was replaced meanwhile is left alone.
    fn settle(&self, key: &CacheKey, flight: &Arc<Flight>, result: Result<Shared, AnalyticsError>) {
        {
            let mut slots = self.lock();
            let ours = matches!(
                slots.map.get(key),
                Some(Slot::Pending(current)) if Arc::ptr_eq(current, flight)
            );
            if ours {
                match &result {
                    Ok(value) => {
                        slots.map.insert(
                            key.clone(),
                            Slot::Ready {
                                value: value.clone(),
                                expires_at: Instant::now() + self.ttl.for_kind(key.kind),
                            },
                        );
                    }
                    Err(_) => {
                        slots.map.remove(key);
                    }
                }
            }
        }
        flight.finish(result);
    }

    fn load_from_store<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let store = self.store.as_ref()?;
        let storage_key = key.storage_key();
        match store.get(&storage_key) {
            Ok(Some(json)) => match serde_json::from_value(json) {
                Ok(value) => {
                    self.lock().stats.store_hits += 1;
                    debug!(key = %storage_key, "loaded from cache store");
                    Some(value)
                }
                Err(e) => {
                    warn!(key = %storage_key, error = %e, "discarding undecodable store entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %storage_key, error = %e, "cache store read failed");
                None
            }
        }
    }

    fn write_through<T: Serialize>(&self, key: &CacheKey, value: &T) {
        let Some(store) = &self.store else { return };
        let result = serde_json::to_value(value)
            .map_err(StoreError::from)
            .and_then(|json| store.put(&key.storage_key(), json, self.ttl.for_kind(key.kind)));
        if let Err(e) = result {
            warn!(key = %key, error = %e, "cache store write failed");
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(TtlPolicy::default())
    }
}

impl fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCache")
            .field("ttl", &self.ttl)
            .field("stats", &self.stats())
            .field("store", &self.store.is_some())
            .finish()
    }
}

/// Releases a pending slot if its computation never completes.
struct FlightGuard<'a> {
    cache: &'a ResultCache,
    key: &'a CacheKey,
    flight: Arc<Flight>,
    finished: bool,
}

impl FlightGuard<'_> {
    fn complete(mut self, result: Result<Shared, AnalyticsError>) {
        self.finished = true;
        self.cache.settle(self.key, &self.flight, result);
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!(key = %self.key, "in-flight computation abandoned; releasing waiters");
        let err = AnalyticsError::component(
            "cache",
            format!("computation for {} was abandoned", self.key),
        );
        self.cache.settle(self.key, &self.flight, Err(err));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn downcast<T: Send + Sync + 'static>(value: Shared, key: &CacheKey) -> Result<Arc<T>, AnalyticsError> {
    value.downcast::<T>().map_err(|_| {
        AnalyticsError::component(
            "cache",
            format!("cached value for {key} has an unexpected type"),
        )
    })
}
