use crate::core::errors::ApiError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A cloneable handle on one shared, in-flight operation.
///
/// Every clone resolves to the same result. The work itself runs on a spawned task,
/// so dropping any (or every) handle never cancels it.
pub type Flight<T> = Shared<BoxFuture<'static, Result<T, ApiError>>>;

/// Spawn `future` and return a shareable handle on its outcome.
pub fn spawn_flight<T, F>(future: F) -> Flight<T>
where
    T: Clone + Send + Sync + 'static,
    F: Future<Output = Result<T, ApiError>> + Send + 'static,
{
    let handle = tokio::spawn(future);
    async move {
        handle.await.unwrap_or_else(|e| {
            Err(ApiError::Other(format!("background task failed: {}", e)))
        })
    }
    .boxed()
    .shared()
}

/// Per-key single-flight registry.
///
/// While an operation for a key is running, every caller for that key joins it.
/// The entry is removed as soon as the operation finishes, so the next call for the
/// same key starts a fresh one. Nothing is cached here.
pub struct FlightMap<K, T> {
    flights: Arc<DashMap<K, (u64, Flight<T>)>>,
    next_id: AtomicU64,
}

impl<K, T> Default for FlightMap<K, T>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> FlightMap<K, T>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            flights: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Join the running operation for `key`, or start one built by `start`.
    ///
    /// `start` is only invoked when no operation is running. The returned flag is
    /// `true` when this call started the operation.
    pub fn join_or_start<F, Fut>(&self, key: K, start: F) -> (Flight<T>, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        match self.flights.entry(key.clone()) {
            Entry::Occupied(entry) => (entry.get().1.clone(), false),
            Entry::Vacant(entry) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let flights = Arc::clone(&self.flights);
                let work = start();
                let flight = spawn_flight(async move {
                    let result = work.await;
                    flights.remove_if(&key, |_, (flight_id, _)| *flight_id == id);
                    result
                });
                entry.insert((id, flight.clone()));
                (flight, true)
            }
        }
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.flights.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn concurrent_callers_share_one_execution() {
        let map: Arc<FlightMap<u32, String>> = Arc::new(FlightMap::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = vec![];
        for _ in 0..8 {
            let map = Arc::clone(&map);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                let (flight, _) = map.join_or_start(7, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok("seven".to_string())
                });
                flight.await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok("seven".to_string()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn finished_flight_is_not_reused() {
        let map: FlightMap<&'static str, usize> = FlightMap::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for expected in 1..=2 {
            let calls = Arc::clone(&calls);
            let (flight, started) = map.join_or_start("key", move || async move {
                Ok(calls.fetch_add(1, Ordering::SeqCst) + 1)
            });
            assert!(started);
            assert_eq!(flight.await, Ok(expected));
        }
    }

    #[tokio::test]
    async fn dropped_waiter_does_not_cancel_the_flight() {
        let map: FlightMap<u8, u8> = FlightMap::new();
        let gate = Arc::new(Notify::new());
        let finished = Arc::new(AtomicUsize::new(0));

        let (first, _) = {
            let gate = Arc::clone(&gate);
            let finished = Arc::clone(&finished);
            map.join_or_start(1, move || async move {
                gate.notified().await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(42)
            })
        };
        let (second, started) = map.join_or_start(1, || async { Ok(0) });
        assert!(!started);

        // the first waiter gives up
        let timed_out = tokio::time::timeout(Duration::from_millis(10), first).await;
        assert!(timed_out.is_err());

        gate.notify_one();
        assert_eq!(second.await, Ok(42));
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn errors_reach_every_waiter() {
        let map: FlightMap<u8, u8> = FlightMap::new();
        let (a, _) = map.join_or_start(1, || async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Err(ApiError::NotFound("Player".to_string()))
        });
        let (b, _) = map.join_or_start(1, || async { Ok(1) });
        let (ra, rb) = tokio::join!(a, b);
        assert_eq!(ra, Err(ApiError::NotFound("Player".to_string())));
        assert_eq!(ra, rb);
    }
}
