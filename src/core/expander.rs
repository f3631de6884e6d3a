use crate::core::errors::ApiError;
use crate::core::kernel::flight::FlightMap;
use futures_util::future::BoxFuture;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::debug;

/// Fetches the full entity for an identity.
pub type EntityFetcher<K, V> =
    Arc<dyn Fn(K) -> BoxFuture<'static, Result<V, ApiError>> + Send + Sync>;

/// Turns identities into full entities, one fetch per identity at a time.
///
/// Nothing is remembered once a fetch finishes: every new resolution round goes to
/// the service again.
pub struct EntityExpander<K, V> {
    flights: FlightMap<K, V>,
    fetcher: EntityFetcher<K, V>,
}

impl<K, V> std::fmt::Debug for EntityExpander<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityExpander").finish_non_exhaustive()
    }
}

impl<K, V> EntityExpander<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(fetcher: EntityFetcher<K, V>) -> Self {
        Self {
            flights: FlightMap::new(),
            fetcher,
        }
    }

    /// Fetch the entity for `identity`, joining a fetch already running for it.
    pub async fn expand(&self, identity: K) -> Result<V, ApiError> {
        let fetcher = Arc::clone(&self.fetcher);
        let key = identity.clone();
        let (flight, started) = self
            .flights
            .join_or_start(identity, move || fetcher(key));
        if !started {
            debug!("Joining running fetch");
        }
        flight.await
    }

    pub fn in_flight(&self) -> usize {
        self.flights.len()
    }
}

/// Resolution progress of a partial handle
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveState<V> {
    Unresolved,
    Resolving,
    Resolved(V),
    Failed(ApiError),
}

// Resolutions running across a handle and its clones, and the state from before the
// first of them began.
struct Progress<V> {
    active: usize,
    before: Option<ResolveState<V>>,
}

struct SharedState<V> {
    state: watch::Sender<ResolveState<V>>,
    progress: Mutex<Progress<V>>,
}

impl<V> SharedState<V> {
    fn progress(&self) -> MutexGuard<'_, Progress<V>> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) {
        let mut progress = self.progress();
        let previous = self.state.send_replace(ResolveState::Resolving);
        if progress.active == 0 {
            progress.before = Some(previous);
        }
        progress.active += 1;
    }

    fn finish(&self, outcome: ResolveState<V>) {
        let mut progress = self.progress();
        progress.active = progress.active.saturating_sub(1);
        if progress.active == 0 {
            progress.before = None;
        }
        self.state.send_replace(outcome);
    }

    fn abandon(&self) {
        let mut progress = self.progress();
        progress.active = progress.active.saturating_sub(1);
        if progress.active > 0 {
            return;
        }
        if let Some(before) = progress.before.take() {
            self.state.send_if_modified(|state| {
                if matches!(state, ResolveState::Resolving) {
                    *state = before;
                    true
                } else {
                    false
                }
            });
        }
    }
}

/// A lightweight handle that knows its identity and can fetch the full entity.
///
/// Clones share their resolution state.
pub struct Partial<K, V> {
    identity: K,
    expander: Arc<EntityExpander<K, V>>,
    shared: Arc<SharedState<V>>,
}

impl<K: Clone, V> Clone for Partial<K, V> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            expander: Arc::clone(&self.expander),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K: std::fmt::Debug, V> std::fmt::Debug for Partial<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Partial")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

// Backs out of a resolve that is dropped before it completes. The pre-resolve state
// comes back only once no other resolve of the handle is still running.
struct AbandonOnDrop<'a, V> {
    shared: &'a SharedState<V>,
    armed: bool,
}

impl<V> AbandonOnDrop<'_, V> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<V> Drop for AbandonOnDrop<'_, V> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.abandon();
        }
    }
}

impl<K, V> Partial<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + std::fmt::Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(identity: K, expander: Arc<EntityExpander<K, V>>) -> Self {
        let (state, _) = watch::channel(ResolveState::Unresolved);
        Self {
            identity,
            expander,
            shared: Arc::new(SharedState {
                state,
                progress: Mutex::new(Progress {
                    active: 0,
                    before: None,
                }),
            }),
        }
    }

    pub fn identity(&self) -> &K {
        &self.identity
    }

    pub fn state(&self) -> ResolveState<V> {
        self.shared.state.borrow().clone()
    }

    /// Watch state transitions of this handle and its clones
    pub fn subscribe(&self) -> watch::Receiver<ResolveState<V>> {
        self.shared.state.subscribe()
    }

    /// Last successfully resolved value, if any
    pub fn resolved(&self) -> Option<V> {
        match &*self.shared.state.borrow() {
            ResolveState::Resolved(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Fetch the full entity.
    ///
    /// Every call fetches afresh unless a fetch for the same identity is already
    /// running, in which case it is joined. A previous failure is never replayed.
    pub async fn resolve(&self) -> Result<V, ApiError> {
        self.shared.begin();
        let guard = AbandonOnDrop {
            shared: &self.shared,
            armed: true,
        };

        let result = self.expander.expand(self.identity.clone()).await;
        guard.disarm();

        self.shared.finish(match &result {
            Ok(value) => ResolveState::Resolved(value.clone()),
            Err(e) => ResolveState::Failed(e.clone()),
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting_expander(calls: Arc<AtomicUsize>) -> Arc<EntityExpander<u64, (u64, usize)>> {
        Arc::new(EntityExpander::new(Arc::new(move |id| {
            let calls = Arc::clone(&calls);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok((id, n))
            }
            .boxed()
        })))
    }

    #[tokio::test]
    async fn test_same_identity_shares_one_fetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let expander = counting_expander(Arc::clone(&calls));
        let a = Partial::new(5, Arc::clone(&expander));
        let b = Partial::new(5, Arc::clone(&expander));

        let (ra, rb) = tokio::join!(a.resolve(), b.resolve());
        assert_eq!(ra.unwrap(), (5, 1));
        assert_eq!(rb.unwrap(), (5, 1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.state(), ResolveState::Resolved((5, 1)));
        assert_eq!(expander.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_different_identities_fetch_separately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let expander = counting_expander(Arc::clone(&calls));
        let a = Partial::new(1, Arc::clone(&expander));
        let b = Partial::new(2, Arc::clone(&expander));
        let (ra, rb) = tokio::join!(a.resolve(), b.resolve());
        assert_eq!(ra.unwrap().0, 1);
        assert_eq!(rb.unwrap().0, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_resolving_again_fetches_fresh() {
        let calls = Arc::new(AtomicUsize::new(0));
        let partial = Partial::new(9, counting_expander(Arc::clone(&calls)));
        assert_eq!(partial.resolve().await.unwrap(), (9, 1));
        assert_eq!(partial.resolve().await.unwrap(), (9, 2));
        assert_eq!(partial.resolved(), Some((9, 2)));
    }

    #[tokio::test]
    async fn test_failure_is_not_replayed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher: EntityFetcher<u64, u64> = {
            let calls = Arc::clone(&calls);
            Arc::new(move |id| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(ApiError::NotFound("Player".to_string()))
                    } else {
                        Ok(id)
                    }
                }
                .boxed()
            })
        };
        let partial = Partial::new(3, Arc::new(EntityExpander::new(fetcher)));

        assert!(partial.resolve().await.is_err());
        assert!(matches!(partial.state(), ResolveState::Failed(ApiError::NotFound(_))));
        assert_eq!(partial.resolve().await, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancelled_resolve_reverts_state() {
        let calls = Arc::new(AtomicUsize::new(0));
        let partial = Partial::new(4, counting_expander(Arc::clone(&calls)));

        let timed_out = tokio::time::timeout(Duration::from_millis(5), partial.resolve()).await;
        assert!(timed_out.is_err());
        assert_eq!(partial.state(), ResolveState::Unresolved);

        // the abandoned fetch is still running and gets joined
        assert_eq!(partial.resolve().await.unwrap(), (4, 1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelling_one_of_two_resolves_keeps_resolving() {
        let calls = Arc::new(AtomicUsize::new(0));
        let partial = Partial::new(6, counting_expander(Arc::clone(&calls)));

        let first = {
            let handle = partial.clone();
            tokio::spawn(async move { handle.resolve().await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = {
            let handle = partial.clone();
            tokio::spawn(async move { handle.resolve().await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;

        first.abort();
        assert!(first.await.unwrap_err().is_cancelled());
        assert_eq!(partial.state(), ResolveState::Resolving);

        assert_eq!(second.await.unwrap(), Ok((6, 1)));
        assert_eq!(partial.state(), ResolveState::Resolved((6, 1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelling_every_resolve_restores_prior_state() {
        let calls = Arc::new(AtomicUsize::new(0));
        let partial = Partial::new(7, counting_expander(Arc::clone(&calls)));
        partial.resolve().await.unwrap();

        let copy = partial.clone();
        let (a, b) = tokio::join!(
            tokio::time::timeout(Duration::from_millis(5), partial.resolve()),
            tokio::time::timeout(Duration::from_millis(5), copy.resolve()),
        );
        assert!(a.is_err() && b.is_err());
        assert_eq!(partial.state(), ResolveState::Resolved((7, 1)));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let calls = Arc::new(AtomicUsize::new(0));
        let partial = Partial::new(8, counting_expander(Arc::clone(&calls)));
        let copy = partial.clone();
        let mut changes = copy.subscribe();

        partial.resolve().await.unwrap();
        assert!(changes.has_changed().unwrap());
        assert_eq!(copy.resolved(), Some((8, 1)));
    }
}
