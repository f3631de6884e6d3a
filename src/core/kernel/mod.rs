//! Kernel - transport, authentication and call plumbing shared by every endpoint
//!
//! The kernel knows nothing about champions or players. It turns a method name and a
//! list of positional parameters into one signed, rate-limited, session-bearing GET
//! request and hands back the decoded JSON body.
//!
//! # Components
//!
//! ## Transport
//! - `HttpTransport`: the one network seam, a GET on an absolute URL
//! - `ReqwestRest`: pooled reqwest implementation, closable
//!
//! ## Authentication
//! - `Signer`: pure signature function over credentials, method and timestamp
//! - `Md5Signer`: MD5 signatures used by the Hi-Rez API family
//!
//! ## Call control
//! - `SessionManager`: single session, created at most once concurrently
//! - `RateLimiter`: per-minute waits and daily fail-fast
//! - `RequestDispatcher`: the full call pipeline, with session renewal and
//!   transport retries
//! - `FlightMap`: per-key single-flight registry used by the higher layers
//!
//! # Example
//! ```rust,no_run
//! use arez::core::kernel::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), arez::core::errors::ApiError> {
//! let signer = Arc::new(Md5Signer::new("1004", "23DF3C7E9BD14D84BF892AD206B6755C"));
//! let transport = Arc::new(ReqwestRest::new()?);
//! let dispatcher = RequestDispatcher::new(
//!     DispatcherConfig {
//!         base_url: "https://api.paladins.com/paladinsapi.svc".to_string(),
//!         retry: RetryPolicy::default(),
//!         session: SessionPolicy::default(),
//!         limits: RateLimits::new(120, 7500),
//!     },
//!     transport,
//!     signer,
//! )?;
//!
//! let status = dispatcher.call("gethirezserverstatus", &[]).await?;
//! println!("{}", status);
//! dispatcher.close().await;
//! # Ok(())
//! # }
//! ```

pub mod dispatcher;
pub mod flight;
pub mod limiter;
pub mod rest;
pub mod session;
pub mod signer;

// Re-export key types for convenience
pub use dispatcher::{build_url, check_envelope, DispatcherConfig, RequestDispatcher, RetryPolicy};
pub use flight::{spawn_flight, Flight, FlightMap};
pub use limiter::{RateLimiter, RateLimits, RateWindow};
pub use rest::{HttpTransport, ReqwestRest, RestClientBuilder, RestClientConfig, TransportResponse};
pub use session::{Session, SessionFactory, SessionManager, SessionPolicy};
pub use signer::{current_timestamp, format_timestamp, Md5Signer, Signer};
