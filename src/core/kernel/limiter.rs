use crate::core::errors::ApiError;
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Call quotas enforced before a request leaves the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub per_minute: u32,
    pub per_day: u32,
    /// Length of the short window, one minute unless overridden for tests
    pub window: Duration,
}

impl RateLimits {
    pub const fn new(per_minute: u32, per_day: u32) -> Self {
        Self {
            per_minute,
            per_day,
            window: Duration::from_secs(60),
        }
    }
}

/// Counters for the current short window and the current UTC day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateWindow {
    pub window_start: Instant,
    pub calls_in_window: u32,
    pub daily_count: u32,
    pub daily_reset_at: DateTime<Utc>,
}

impl RateWindow {
    fn new(now: Instant, utc_now: DateTime<Utc>) -> Self {
        Self {
            window_start: now,
            calls_in_window: 0,
            daily_count: 0,
            daily_reset_at: next_utc_midnight(utc_now),
        }
    }

    fn roll(&mut self, now: Instant, utc_now: DateTime<Utc>, window: Duration) {
        if now.saturating_duration_since(self.window_start) >= window {
            self.window_start = now;
            self.calls_in_window = 0;
        }
        if utc_now >= self.daily_reset_at {
            self.daily_count = 0;
            self.daily_reset_at = next_utc_midnight(utc_now);
        }
    }
}

fn next_utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .succ_opt()
        .map_or_else(
            || now + chrono::Duration::days(1),
            |tomorrow| Utc.from_utc_datetime(&tomorrow.and_time(NaiveTime::MIN)),
        )
}

/// Admission control for outgoing calls.
///
/// A full short window suspends the caller until the window rolls over. A spent
/// daily quota fails immediately, since waiting for midnight is never useful.
pub struct RateLimiter {
    limits: RateLimits,
    window: Mutex<RateWindow>,
}

impl RateLimiter {
    pub fn new(limits: RateLimits) -> Self {
        Self {
            limits,
            window: Mutex::new(RateWindow::new(Instant::now(), Utc::now())),
        }
    }

    pub fn limits(&self) -> RateLimits {
        self.limits
    }

    /// Wait for a free slot, or fail with `QuotaExceeded` once the daily cap is spent.
    pub async fn admit(&self) -> Result<(), ApiError> {
        loop {
            let wait = {
                let mut window = self.window.lock().await;
                let now = Instant::now();
                window.roll(now, Utc::now(), self.limits.window);

                if window.daily_count >= self.limits.per_day {
                    warn!(
                        daily_count = window.daily_count,
                        resets_at = %window.daily_reset_at,
                        "Daily request limit reached"
                    );
                    return Err(ApiError::QuotaExceeded(format!(
                        "Daily request limit of {} reached",
                        self.limits.per_day
                    )));
                }

                if window.calls_in_window < self.limits.per_minute {
                    window.calls_in_window += 1;
                    window.daily_count += 1;
                    return Ok(());
                }

                (window.window_start + self.limits.window).saturating_duration_since(now)
            };

            debug!(
                wait_ms = wait.as_millis() as u64,
                "Per-minute limit reached, waiting for the next window"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Align the daily counter with a usage figure reported by the service.
    ///
    /// The counter only ever moves up, so local calls made since the report are kept.
    pub async fn sync_daily_usage(&self, used_today: u32) {
        let mut window = self.window.lock().await;
        window.roll(Instant::now(), Utc::now(), self.limits.window);
        window.daily_count = window.daily_count.max(used_today);
    }

    /// Snapshot of the counters
    pub async fn usage(&self) -> RateWindow {
        self.window.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_call_over_minute_limit_waits_for_window() {
        let limiter = RateLimiter::new(RateLimits::new(3, 100));
        let start = Instant::now();

        for _ in 0..3 {
            limiter.admit().await.unwrap();
        }
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.admit().await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert_eq!(limiter.usage().await.calls_in_window, 1);
        assert_eq!(limiter.usage().await.daily_count, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_daily_limit_fails_immediately() {
        let limiter = RateLimiter::new(RateLimits::new(100, 5));
        for _ in 0..5 {
            limiter.admit().await.unwrap();
        }
        let start = Instant::now();
        let result = limiter.admit().await;
        assert!(matches!(result, Err(ApiError::QuotaExceeded(_))));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_admissions_respect_window() {
        let limiter = Arc::new(RateLimiter::new(RateLimits::new(5, 100)));
        let start = Instant::now();

        let mut handles = vec![];
        for _ in 0..10 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.admit().await.map(|()| start.elapsed())
            }));
        }

        let mut immediate = 0;
        let mut delayed = 0;
        for handle in handles {
            let elapsed = handle.await.unwrap().unwrap();
            if elapsed < Duration::from_secs(60) {
                immediate += 1;
            } else {
                delayed += 1;
            }
        }
        assert_eq!(immediate, 5);
        assert_eq!(delayed, 5);
    }

    #[tokio::test]
    async fn test_sync_daily_usage_only_moves_up() {
        let limiter = RateLimiter::new(RateLimits::new(10, 10));
        limiter.admit().await.unwrap();
        limiter.sync_daily_usage(9).await;
        assert_eq!(limiter.usage().await.daily_count, 9);
        limiter.sync_daily_usage(2).await;
        assert_eq!(limiter.usage().await.daily_count, 9);

        limiter.admit().await.unwrap();
        assert!(matches!(
            limiter.admit().await,
            Err(ApiError::QuotaExceeded(_))
        ));
    }

    #[test]
    fn test_next_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 2, 28, 23, 59, 59).unwrap();
        assert_eq!(
            next_utc_midnight(now),
            Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap()
        );
    }
}
