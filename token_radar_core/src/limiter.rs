// Outbound request gating: a GCRA rate limiter in front of a circuit breaker.
// One gate is shared by every caller of a given upstream.

use crate::error::CoreError;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use log::{info, warn};
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    /// Set while the single half-open trial request is outstanding.
    trial_started: Option<Instant>,
    total_opens: u64,
}

/// Opens after `failure_threshold` consecutive failures. Once `cooldown`
/// has passed exactly one call is let through as a trial request; its
/// outcome closes or re-opens the circuit. Other callers are refused until
/// then. A trial that never reports back is replaced after another
/// `cooldown`.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    cooldown: Duration,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: &str, failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            name: name.to_string(),
            failure_threshold: failure_threshold.max(1),
            cooldown,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_started: None,
                total_opens: 0,
            }),
        }
    }

    /// `Err(remaining)` while the circuit is cooling down or a trial request is
    /// outstanding.
    pub fn check(&self) -> Result<(), Duration> {
        self.check_at(Instant::now())
    }

    pub fn check_at(&self, now: Instant) -> Result<(), Duration> {
        let mut inner = self.lock();
        let since = match inner.state {
            CircuitState::Closed => return Ok(()),
            CircuitState::Open => inner.opened_at,
            CircuitState::HalfOpen => inner.trial_started,
        };
        let elapsed = since
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or(self.cooldown);
        if elapsed < self.cooldown {
            return Err(self.cooldown - elapsed);
        }
        if inner.state == CircuitState::HalfOpen {
            warn!("[{}] trial request never reported back, allowing another", self.name);
        } else {
            info!("[{}] circuit half-open, allowing a trial request", self.name);
        }
        inner.state = CircuitState::HalfOpen;
        inner.trial_started = Some(now);
        Ok(())
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            info!("[{}] circuit closed after a successful trial request", self.name);
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_started = None;
    }

    pub fn record_failure(&self) {
        self.record_failure_at(Instant::now())
    }

    pub fn record_failure_at(&self, now: Instant) {
        let mut inner = self.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        let trip = match inner.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => inner.consecutive_failures >= self.failure_threshold,
            CircuitState::Open => false,
        };
        if trip {
            warn!(
                "[{}] circuit opened after {} consecutive failures (cooldown {}s)",
                self.name,
                inner.consecutive_failures,
                self.cooldown.as_secs()
            );
            inner.state = CircuitState::Open;
            inner.opened_at = Some(now);
            inner.trial_started = None;
            inner.total_opens += 1;
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn total_opens(&self) -> u64 {
        self.lock().total_opens
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        // No critical section can panic half-way through an update.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Point-in-time view of a gate, for health reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateStatus {
    pub name: String,
    pub circuit: CircuitState,
    pub total_opens: u64,
}

pub struct RequestGate {
    limiter: DefaultDirectRateLimiter,
    breaker: CircuitBreaker,
}

impl RequestGate {
    pub fn new(name: &str, requests_per_second: u32, failure_threshold: u32, cooldown: Duration) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::direct(Quota::per_second(rate)),
            breaker: CircuitBreaker::new(name, failure_threshold, cooldown),
        }
    }

    /// Wait for a rate-limit slot. Fails fast while the breaker is open.
    pub async fn acquire(&self) -> Result<(), CoreError> {
        if let Err(remaining) = self.breaker.check() {
            return Err(CoreError::Unavailable(format!(
                "circuit open, retry in {}s",
                remaining.as_secs().max(1)
            )));
        }
        self.limiter.until_ready().await;
        Ok(())
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn status(&self) -> GateStatus {
        GateStatus {
            name: self.breaker.name().to_string(),
            circuit: self.breaker.state(),
            total_opens: self.breaker.total_opens(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_failures() {
        let b = CircuitBreaker::new("test", 3, Duration::from_secs(30));
        let t0 = Instant::now();
        b.record_failure_at(t0);
        b.record_failure_at(t0);
        assert_eq!(b.state(), CircuitState::Closed);
        b.record_failure_at(t0);
        assert_eq!(b.state(), CircuitState::Open);
        assert_eq!(b.total_opens(), 1);

        let remaining = b.check_at(t0 + Duration::from_secs(10)).unwrap_err();
        assert_eq!(remaining, Duration::from_secs(20));
    }

    #[test]
    fn success_resets_failure_count() {
        let b = CircuitBreaker::new("test", 2, Duration::from_secs(30));
        b.record_failure();
        b.record_success();
        b.record_failure();
        assert_eq!(b.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_trial_closes_or_reopens() {
        let b = CircuitBreaker::new("test", 1, Duration::from_secs(5));
        let t0 = Instant::now();
        b.record_failure_at(t0);
        assert!(b.check_at(t0 + Duration::from_secs(1)).is_err());

        assert!(b.check_at(t0 + Duration::from_secs(5)).is_ok());
        assert_eq!(b.state(), CircuitState::HalfOpen);
        b.record_failure_at(t0 + Duration::from_secs(6));
        assert_eq!(b.state(), CircuitState::Open);
        assert_eq!(b.total_opens(), 2);

        assert!(b.check_at(t0 + Duration::from_secs(11)).is_ok());
        b.record_success();
        assert_eq!(b.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_admits_a_single_trial_request() {
        let b = CircuitBreaker::new("test", 1, Duration::from_secs(5));
        let t0 = Instant::now();
        b.record_failure_at(t0);

        assert!(b.check_at(t0 + Duration::from_secs(5)).is_ok());
        let refused = b.check_at(t0 + Duration::from_secs(6)).unwrap_err();
        assert_eq!(refused, Duration::from_secs(4));
        assert!(b.check_at(t0 + Duration::from_secs(7)).is_err());

        b.record_success();
        assert!(b.check_at(t0 + Duration::from_secs(7)).is_ok());
        assert!(b.check_at(t0 + Duration::from_secs(7)).is_ok());
    }

    #[test]
    fn lost_trial_request_is_replaced_after_cooldown() {
        let b = CircuitBreaker::new("test", 1, Duration::from_secs(5));
        let t0 = Instant::now();
        b.record_failure_at(t0);

        assert!(b.check_at(t0 + Duration::from_secs(5)).is_ok());
        assert!(b.check_at(t0 + Duration::from_secs(9)).is_err());
        assert!(b.check_at(t0 + Duration::from_secs(10)).is_ok());
        assert_eq!(b.state(), CircuitState::HalfOpen);
    }

    #[tokio::test]
    async fn gate_refuses_while_open() {
        let gate = RequestGate::new("test", 50, 1, Duration::from_secs(60));
        assert!(gate.acquire().await.is_ok());
        gate.breaker().record_failure();
        let err = gate.acquire().await.unwrap_err();
        assert!(matches!(err, CoreError::Unavailable(_)));
    }
}
