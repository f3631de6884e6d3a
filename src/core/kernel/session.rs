use crate::core::errors::ApiError;
use crate::core::kernel::flight::{spawn_flight, Flight};
use futures_util::future::BoxFuture;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Opens a new session on the service and returns its token.
pub type SessionFactory =
    Arc<dyn Fn() -> BoxFuture<'static, Result<String, ApiError>> + Send + Sync>;

/// An authenticated session token and its usage timestamps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub created_at: Instant,
    pub last_used_at: Instant,
}

impl Session {
    pub fn new(token: String, now: Instant) -> Self {
        Self {
            token,
            created_at: now,
            last_used_at: now,
        }
    }

    pub fn is_valid_at(&self, now: Instant, policy: &SessionPolicy) -> bool {
        let idle = now.saturating_duration_since(self.last_used_at);
        let age = now.saturating_duration_since(self.created_at);
        idle < policy.idle_timeout && policy.max_age.map_or(true, |max_age| age < max_age)
    }
}

/// When a cached session must be replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Inactivity after which the service forgets the session
    pub idle_timeout: Duration,
    /// Optional hard cap on a session's age
    pub max_age: Option<Duration>,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            idle_timeout: crate::core::config::DEFAULT_SESSION_TIMEOUT,
            max_age: None,
        }
    }
}

enum SessionState {
    Empty,
    Creating { id: u64, flight: Flight<Session> },
    Active(Session),
    Closed,
}

/// Owner of the client's single session.
///
/// Concurrent callers that find no valid session share one creation round-trip.
/// The round-trip runs detached, so it completes and installs its session even if
/// every caller waiting on it is cancelled.
pub struct SessionManager {
    state: Arc<Mutex<SessionState>>,
    factory: SessionFactory,
    policy: SessionPolicy,
    next_id: AtomicU64,
}

impl SessionManager {
    pub fn new(factory: SessionFactory, policy: SessionPolicy) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::Empty)),
            factory,
            policy,
            next_id: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Return the current session if still valid, creating a new one otherwise.
    pub async fn ensure_valid_session(&self) -> Result<Session, ApiError> {
        let flight = {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            let existing = match &*state {
                SessionState::Closed => return Err(ApiError::ClientClosed),
                SessionState::Active(session) if session.is_valid_at(now, &self.policy) => {
                    return Ok(session.clone());
                }
                SessionState::Active(session) => {
                    debug!(token = %session.token, "Session timed out, renewing");
                    None
                }
                SessionState::Creating { flight, .. } => Some(flight.clone()),
                SessionState::Empty => None,
            };
            match existing {
                Some(flight) => flight,
                None => self.start_creation(&mut state),
            }
        };
        flight.await
    }

    fn start_creation(&self, state: &mut SessionState) -> Flight<Session> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let factory = Arc::clone(&self.factory);
        let shared_state = Arc::clone(&self.state);

        let flight = spawn_flight(async move {
            let result = factory()
                .await
                .map(|token| Session::new(token, Instant::now()));

            let mut state = shared_state.lock().await;
            // a close or newer creation may have replaced us meanwhile
            if matches!(&*state, SessionState::Creating { id: current, .. } if *current == id) {
                *state = match &result {
                    Ok(session) => {
                        info!("Session created");
                        SessionState::Active(session.clone())
                    }
                    Err(e) => {
                        warn!(error = %e, "Session creation failed");
                        SessionState::Empty
                    }
                };
            }
            result
        });

        *state = SessionState::Creating {
            id,
            flight: flight.clone(),
        };
        flight
    }

    /// Record a successful call made with `token`.
    pub async fn mark_used(&self, token: &str) {
        if let SessionState::Active(session) = &mut *self.state.lock().await {
            if session.token == token {
                session.last_used_at = Instant::now();
            }
        }
    }

    /// Drop the session identified by `token` if it is still the current one.
    ///
    /// Returns `true` when the session was discarded.
    pub async fn invalidate(&self, token: &str) -> bool {
        let mut state = self.state.lock().await;
        match &*state {
            SessionState::Active(session) if session.token == token => {
                debug!("Session invalidated");
                *state = SessionState::Empty;
                true
            }
            _ => false,
        }
    }

    /// Snapshot of the current session, valid or not.
    pub async fn current(&self) -> Option<Session> {
        match &*self.state.lock().await {
            SessionState::Active(session) => Some(session.clone()),
            _ => None,
        }
    }

    /// Drop the session for good. Later calls fail with `ClientClosed`.
    pub async fn close(&self) {
        *self.state.lock().await = SessionState::Closed;
    }

    pub async fn is_closed(&self) -> bool {
        matches!(&*self.state.lock().await, SessionState::Closed)
    }
}
