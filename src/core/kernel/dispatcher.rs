use crate::core::config::ConfigError;
use crate::core::errors::{classify_ret_msg, ApiError};
use crate::core::kernel::limiter::{RateLimiter, RateLimits};
use crate::core::kernel::rest::HttpTransport;
use crate::core::kernel::session::{SessionFactory, SessionManager, SessionPolicy};
use crate::core::kernel::signer::{current_timestamp, Signer, CREATE_SESSION};
use futures_util::FutureExt;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, error, instrument, trace, warn};

/// Backoff applied to transport failures and 503 responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: usize,
    /// Delay before the first retry; doubles on every further one
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: crate::core::config::DEFAULT_MAX_RETRIES,
            base_delay: crate::core::config::DEFAULT_RETRY_BASE_DELAY,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    fn strategy(&self) -> impl Iterator<Item = Duration> {
        // from_millis(2) doubles each step; factor scales the first step to base_delay
        let factor = (self.base_delay.as_millis() as u64 / 2).max(1);
        let zero_delay = self.base_delay.is_zero();
        ExponentialBackoff::from_millis(2)
            .factor(factor)
            .max_delay(self.max_delay)
            .map(move |delay| if zero_delay { Duration::ZERO } else { jitter(delay) })
            .take(self.max_retries)
    }
}

/// Everything the dispatcher needs besides the transport and the signer
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub base_url: String,
    pub retry: RetryPolicy,
    pub session: SessionPolicy,
    pub limits: RateLimits,
}

/// Transport plus retry handling, shared with the session factory
#[derive(Clone)]
struct Wire {
    transport: Arc<dyn HttpTransport>,
    retry: RetryPolicy,
}

impl Wire {
    /// Send the request built by `build`, retrying transport failures and an
    /// unavailable service with backoff.
    ///
    /// Every attempt rebuilds the URL, so each one carries a fresh timestamp and
    /// signature. With a `limiter`, every attempt, retries included, takes one
    /// admission.
    async fn fetch<F>(&self, build: F, limiter: Option<&RateLimiter>) -> Result<Value, ApiError>
    where
        F: Fn() -> Result<Url, ApiError>,
    {
        RetryIf::spawn(
            self.retry.strategy(),
            || self.fetch_once(&build, limiter),
            |e: &ApiError| {
                let retry = e.is_retryable();
                if retry {
                    warn!(error = %e, "Request failed, retrying");
                }
                retry
            },
        )
        .await
    }

    async fn fetch_once<F>(
        &self,
        build: &F,
        limiter: Option<&RateLimiter>,
    ) -> Result<Value, ApiError>
    where
        F: Fn() -> Result<Url, ApiError>,
    {
        if let Some(limiter) = limiter {
            limiter.admit().await?;
        }
        let url = build()?;
        trace!(url = %url, "Dispatching request");

        let response = self.transport.get(url.as_str()).await?;
        let value: Value = match response.status {
            200..=299 => serde_json::from_str(&response.body)?,
            503 => {
                return Err(ApiError::ServiceUnavailable(
                    "503: Service Unavailable".to_string(),
                ))
            }
            status => {
                return Err(ApiError::Http {
                    status,
                    message: response.body,
                })
            }
        };

        // maintenance is also announced inside 200 bodies
        if let Err(e @ ApiError::ServiceUnavailable(_)) = check_envelope(&value) {
            return Err(e);
        }
        Ok(value)
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(default)]
    ret_msg: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
}

/// Inspect the `ret_msg` envelope of a decoded response.
///
/// Objects carry it at the top level. Single-element arrays carry it on their only
/// element; longer arrays are batch results whose per-item messages belong to the
/// caller.
pub fn check_envelope(value: &Value) -> Result<(), ApiError> {
    let message = match value {
        Value::Object(map) => map.get("ret_msg"),
        Value::Array(items) if items.len() == 1 => items[0].get("ret_msg"),
        _ => None,
    };
    match message.and_then(Value::as_str).and_then(classify_ret_msg) {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Append `{method}json` and the positional parameters to the base URL.
pub fn build_url(base: &Url, method_name: &str, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| {
            ConfigError::InvalidConfiguration(format!("Base URL cannot be a base: {}", base))
        })?
        .pop_if_empty()
        .push(&format!("{}json", method_name))
        .extend(segments);
    Ok(url)
}

fn session_factory(wire: Wire, signer: Arc<dyn Signer>, base_url: Url) -> SessionFactory {
    Arc::new(move || {
        let wire = wire.clone();
        let signer = Arc::clone(&signer);
        let base_url = base_url.clone();
        async move {
            let build = || {
                let payload = signer.session_payload(&current_timestamp());
                let segments: Vec<&str> = payload.iter().map(String::as_str).collect();
                build_url(&base_url, CREATE_SESSION, &segments)
            };
            let response: SessionResponse =
                serde_json::from_value(wire.fetch(build, None).await?)?;

            match response.session_id.filter(|id| !id.is_empty()) {
                Some(session_id) => Ok(session_id),
                None => {
                    let message = response
                        .ret_msg
                        .unwrap_or_else(|| "Session was not approved".to_string());
                    Err(match classify_ret_msg(&message) {
                        Some(ApiError::MalformedResponse(_)) | None => {
                            ApiError::AuthenticationFailure(message)
                        }
                        Some(other) => other,
                    })
                }
            }
        }
        .boxed()
    })
}

/// Sends single logical API calls.
///
/// Each call gets a valid session, passes rate-limit admission, is signed and sent,
/// and has its response envelope classified. A rejected session is renewed and the
/// call retried once; transport failures are retried with backoff.
pub struct RequestDispatcher {
    base_url: Url,
    wire: Wire,
    signer: Arc<dyn Signer>,
    sessions: SessionManager,
    limiter: RateLimiter,
    closed: AtomicBool,
}

impl std::fmt::Debug for RequestDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDispatcher")
            .field("base_url", &self.base_url.as_str())
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl RequestDispatcher {
    pub fn new(
        config: DispatcherConfig,
        transport: Arc<dyn HttpTransport>,
        signer: Arc<dyn Signer>,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/')).map_err(|e| {
            ConfigError::InvalidConfiguration(format!(
                "Invalid base URL '{}': {}",
                config.base_url, e
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidConfiguration(format!(
                "Base URL cannot be a base: {}",
                base_url
            ))
            .into());
        }

        let wire = Wire {
            transport,
            retry: config.retry,
        };
        let factory = session_factory(wire.clone(), Arc::clone(&signer), base_url.clone());

        Ok(Self {
            base_url,
            wire,
            signer,
            sessions: SessionManager::new(factory, config.session),
            limiter: RateLimiter::new(config.limits),
            closed: AtomicBool::new(false),
        })
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), ApiError> {
        if self.is_closed() {
            Err(ApiError::ClientClosed)
        } else {
            Ok(())
        }
    }

    /// Make one API call and return the decoded JSON body
    ///
    /// # Arguments
    /// * `method_name` - Service method, without the `json` suffix
    /// * `params` - Positional parameters appended to the path
    #[instrument(skip(self, params), fields(param_count = params.len()))]
    pub async fn call(&self, method_name: &str, params: &[&str]) -> Result<Value, ApiError> {
        self.ensure_open()?;
        let method = method_name.to_lowercase();
        let mut renewed = false;

        loop {
            let session = self.sessions.ensure_valid_session().await?;
            self.ensure_open()?;

            let build = || {
                let timestamp = current_timestamp();
                let signature = self.signer.sign(&method, &timestamp);
                let mut segments = vec![
                    self.signer.developer_id(),
                    signature.as_str(),
                    session.token.as_str(),
                    timestamp.as_str(),
                ];
                segments.extend_from_slice(params);
                build_url(&self.base_url, &method, &segments)
            };

            let outcome = self
                .wire
                .fetch(build, Some(&self.limiter))
                .await
                .and_then(|value| check_envelope(&value).map(|()| value));
            match outcome {
                Ok(value) => {
                    self.sessions.mark_used(&session.token).await;
                    debug!("Request succeeded");
                    return Ok(value);
                }
                Err(ApiError::SessionExpired(message)) if !renewed => {
                    warn!(%message, "Session rejected, renewing and retrying");
                    self.sessions.invalidate(&session.token).await;
                    renewed = true;
                }
                Err(e) => {
                    match &e {
                        ApiError::AuthenticationFailure(_) | ApiError::QuotaExceeded(_) => {
                            error!(error = %e, "Request rejected");
                        }
                        ApiError::ServiceUnavailable(_) => warn!(error = %e, "API unavailable"),
                        _ => debug!(error = %e, "Request returned an error"),
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Check the service is reachable. Needs neither a session nor a signature.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<String, ApiError> {
        self.ensure_open()?;
        let value = self
            .wire
            .fetch(|| build_url(&self.base_url, "ping", &[]), None)
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ApiError::MalformedResponse(format!("Unexpected ping reply: {}", value)))
    }

    /// Stop accepting calls, drop the session and release the connection pool.
    ///
    /// Calls already past their open check keep running to completion.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.sessions.close().await;
        self.wire.transport.close().await;
        debug!("Dispatcher closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_url_encodes_segments() {
        let base = Url::parse("https://api.paladins.com/paladinsapi.svc").unwrap();
        let url = build_url(&base, "getplayer", &["1004", "sig", "Some Name"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.paladins.com/paladinsapi.svc/getplayerjson/1004/sig/Some%20Name"
        );

        let ping = build_url(&base, "ping", &[]).unwrap();
        assert_eq!(ping.as_str(), "https://api.paladins.com/paladinsapi.svc/pingjson");
    }

    #[test]
    fn test_envelope_object_and_single_item() {
        assert!(check_envelope(&json!({"ret_msg": null, "version_string": "1.0"})).is_ok());
        assert!(matches!(
            check_envelope(&json!({"ret_msg": "Invalid session id."})),
            Err(ApiError::SessionExpired(_))
        ));
        assert!(matches!(
            check_envelope(&json!([{"ret_msg": "Player Privacy Flag set for: playerIdLookup=1"}])),
            Err(ApiError::PrivateProfile(_))
        ));
        assert!(check_envelope(&json!("pong")).is_ok());
        assert!(check_envelope(&json!([])).is_ok());
    }

    #[test]
    fn test_envelope_ignores_batch_items() {
        let batch = json!([
            {"ret_msg": "Player Privacy Flag set for: playerIdLookup=1"},
            {"ret_msg": null, "Id": 2}
        ]);
        assert!(check_envelope(&batch).is_ok());
    }

    #[test]
    fn test_retry_strategy_is_bounded() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(150),
        };
        let delays: Vec<Duration> = policy.strategy().collect();
        assert_eq!(delays.len(), 3);
        assert!(delays.iter().all(|d| *d <= Duration::from_millis(150)));

        let instant = RetryPolicy {
            base_delay: Duration::ZERO,
            ..policy
        };
        assert!(instant.strategy().all(|d| d.is_zero()));
    }
}
