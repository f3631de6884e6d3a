use crate::core::errors::ApiError;
use crate::core::kernel::flight::{spawn_flight, Flight};
use crate::core::types::{Category, Language};
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Loads one reference-data list from the service.
pub type ReferenceFetcher<T> =
    Arc<dyn Fn(CacheKey) -> BoxFuture<'static, Result<Vec<T>, ApiError>> + Send + Sync>;

/// Identifies one cached list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub category: Category,
    pub language: Language,
}

impl CacheKey {
    pub const fn new(category: Category, language: Language) -> Self {
        Self { category, language }
    }
}

struct Snapshot<T> {
    items: Arc<[T]>,
    fetched_at: Instant,
}

struct Slot<T> {
    ready: Option<Snapshot<T>>,
    loading: Option<(u64, Flight<Arc<[T]>>)>,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self {
            ready: None,
            loading: None,
        }
    }
}

/// Lazily loaded, per-language reference data.
///
/// The first `get` for a key fetches; later ones are served from memory. At most one
/// fetch per key runs at a time and every concurrent caller shares it. With a TTL
/// set, an expired entry is still returned immediately while a single background
/// refresh replaces it.
pub struct ReferenceDataCache<T> {
    slots: Arc<DashMap<CacheKey, Slot<T>>>,
    fetcher: ReferenceFetcher<T>,
    enabled: bool,
    ttl: Option<Duration>,
    closed: Arc<AtomicBool>,
    next_id: AtomicU64,
}

impl<T> std::fmt::Debug for ReferenceDataCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceDataCache")
            .field("entries", &self.slots.len())
            .field("enabled", &self.enabled)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl<T> ReferenceDataCache<T>
where
    T: Send + Sync + 'static,
{
    /// # Arguments
    /// * `fetcher` - Loads the list for a key
    /// * `enabled` - When `false`, nothing is retained and every `get` fetches
    /// * `ttl` - Age after which an entry is served stale and refreshed
    pub fn new(fetcher: ReferenceFetcher<T>, enabled: bool, ttl: Option<Duration>) -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
            fetcher,
            enabled,
            ttl,
            closed: Arc::new(AtomicBool::new(false)),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn ensure_open(&self) -> Result<(), ApiError> {
        if self.closed.load(Ordering::Acquire) {
            Err(ApiError::ClientClosed)
        } else {
            Ok(())
        }
    }

    fn is_stale(&self, snapshot: &Snapshot<T>) -> bool {
        self.ttl
            .map_or(false, |ttl| snapshot.fetched_at.elapsed() >= ttl)
    }

    /// Return the list for `key`, fetching it on first use.
    #[instrument(skip(self), fields(category = ?key.category, language = %key.language))]
    pub async fn get(&self, key: CacheKey) -> Result<Arc<[T]>, ApiError> {
        self.ensure_open()?;
        let flight = {
            let mut slot = self.slots.entry(key).or_default();
            if let Some(snapshot) = &slot.ready {
                let items = Arc::clone(&snapshot.items);
                if self.is_stale(snapshot) && slot.loading.is_none() {
                    debug!("Cached entry expired, refreshing in the background");
                    self.start_fetch(key, &mut slot);
                }
                return Ok(items);
            }
            match &slot.loading {
                Some((_, flight)) => flight.clone(),
                None => self.start_fetch(key, &mut slot),
            }
        };
        flight.await
    }

    /// Fetch `key` again, joining a fetch that is already running.
    #[instrument(skip(self), fields(category = ?key.category, language = %key.language))]
    pub async fn refresh(&self, key: CacheKey) -> Result<Arc<[T]>, ApiError> {
        self.ensure_open()?;
        let flight = {
            let mut slot = self.slots.entry(key).or_default();
            match &slot.loading {
                Some((_, flight)) => flight.clone(),
                None => self.start_fetch(key, &mut slot),
            }
        };
        flight.await
    }

    fn start_fetch(&self, key: CacheKey, slot: &mut Slot<T>) -> Flight<Arc<[T]>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let fetch = (self.fetcher)(key);
        let slots = Arc::clone(&self.slots);
        let closed = Arc::clone(&self.closed);
        let retain = self.enabled;

        let flight = spawn_flight(async move {
            let result = fetch.await.map(Arc::<[T]>::from);
            if let Some(mut slot) = slots.get_mut(&key) {
                if slot.loading.as_ref().map(|(current, _)| *current) == Some(id) {
                    slot.loading = None;
                    match &result {
                        Ok(items) if retain && !closed.load(Ordering::Acquire) => {
                            debug!(?key, count = items.len(), "Reference data cached");
                            slot.ready = Some(Snapshot {
                                items: Arc::clone(items),
                                fetched_at: Instant::now(),
                            });
                        }
                        Ok(_) => {}
                        Err(e) => warn!(?key, error = %e, "Reference data fetch failed"),
                    }
                }
            }
            result
        });

        slot.loading = Some((id, flight.clone()));
        flight
    }

    /// Cached list for `key` without fetching, stale or not.
    pub fn peek(&self, key: CacheKey) -> Option<Arc<[T]>> {
        self.slots
            .get(&key)
            .and_then(|slot| slot.ready.as_ref().map(|s| Arc::clone(&s.items)))
    }

    pub fn is_loading(&self, key: CacheKey) -> bool {
        self.slots
            .get(&key)
            .map_or(false, |slot| slot.loading.is_some())
    }

    /// Drop the cached list for `key`. A running fetch is left alone.
    pub fn invalidate(&self, key: CacheKey) {
        if let Some(mut slot) = self.slots.get_mut(&key) {
            slot.ready = None;
        }
    }

    pub fn clear(&self) {
        for mut slot in self.slots.iter_mut() {
            slot.ready = None;
        }
    }

    /// Drop everything and refuse later lookups.
    ///
    /// Callers already waiting on a fetch still receive its result.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.clear();
    }
}
