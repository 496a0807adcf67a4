//! Bounded exponential backoff around one remote send call.

use std::time::Duration;

use rand::Rng;

use crate::{config::CampaignConfig, transport::TransportError};

/// Fixed jitter ratio: every backoff sleep gains a uniform random addition
/// in `[0, JITTER_RATIO × sleep]` to avoid synchronized retries.
pub const JITTER_RATIO: f64 = 0.3;

/// Retry policy for one remote send.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Total attempts, including the first call.
    pub max_attempts: u32,
    /// Initial delay in seconds, floored at 1.0.
    pub initial_delay_secs: f64,
    /// Delay multiplier per retry, floored at 1.0.
    pub multiplier: f64,
    /// Delay cap in seconds, floored at the initial delay.
    pub max_delay_secs: f64,
}

impl BackoffPolicy {
    #[must_use]
    pub const fn from_config(config: &CampaignConfig) -> Self {
        Self {
            max_attempts: config.max_retry_attempts,
            initial_delay_secs: config.retry_backoff_initial_seconds,
            multiplier: config.retry_backoff_multiplier,
            max_delay_secs: config.retry_backoff_max_seconds,
        }
    }
}

/// The pre-jitter delay sequence: `d, d×m, d×m², …` capped at the maximum.
#[derive(Debug, Clone)]
struct BackoffSchedule {
    current: f64,
    multiplier: f64,
    max: f64,
}

impl BackoffSchedule {
    fn new(policy: &BackoffPolicy) -> Self {
        let initial = policy.initial_delay_secs.max(1.0);
        Self {
            current: initial,
            multiplier: policy.multiplier.max(1.0),
            max: policy.max_delay_secs.max(initial),
        }
    }

    fn sleep_secs(&self) -> f64 {
        self.current.min(self.max)
    }

    fn advance(&mut self) {
        self.current = (self.current * self.multiplier).min(self.max);
    }
}

/// Drive `send_fn` to completion with bounded exponential backoff.
///
/// A success returns immediately. A failure classified as fatal, or a
/// failure on the last allowed attempt, propagates unchanged without
/// sleeping. Every retry is announced by a `send_retry_scheduled` warning
/// carrying the attempt number, the total allowed, the error text, and the
/// computed (pre-jitter) sleep duration — the only externally observable
/// effect besides the eventual result.
///
/// # Errors
/// Returns the final [`TransportError`] once attempts are exhausted or a
/// fatal error is hit.
pub async fn send_with_retry<T, F, Fut>(
    policy: &BackoffPolicy,
    mut send_fn: F,
) -> Result<T, TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let mut schedule = BackoffSchedule::new(policy);
    let mut attempt: u32 = 1;

    loop {
        match send_fn().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if !error.is_retryable() || attempt >= policy.max_attempts {
                    return Err(error);
                }

                let sleep_base = schedule.sleep_secs();
                drover_common::events::send_retry_scheduled(
                    attempt,
                    policy.max_attempts,
                    &error.to_string(),
                    round_centis(sleep_base),
                );
                sleep_with_jitter(sleep_base).await;
                schedule.advance();
                attempt += 1;
            }
        }
    }
}

async fn sleep_with_jitter(base_secs: f64) {
    let jitter = rand::rng().random_range(0.0..=(base_secs * JITTER_RATIO));
    tokio::time::sleep(Duration::from_secs_f64(base_secs + jitter)).await;
}

fn round_centis(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn policy(max_attempts: u32, initial: f64, multiplier: f64, max: f64) -> BackoffPolicy {
        BackoffPolicy {
            max_attempts,
            initial_delay_secs: initial,
            multiplier,
            max_delay_secs: max,
        }
    }

    #[test]
    fn schedule_doubles_and_caps() {
        let mut schedule = BackoffSchedule::new(&policy(10, 5.0, 2.0, 60.0));
        let mut observed = Vec::new();
        for _ in 0..7 {
            observed.push(schedule.sleep_secs());
            schedule.advance();
        }
        assert_eq!(observed, vec![5.0, 10.0, 20.0, 40.0, 60.0, 60.0, 60.0]);
    }

    #[test]
    fn schedule_floors_degenerate_inputs() {
        // Initial below one second is floored
        let schedule = BackoffSchedule::new(&policy(3, 0.2, 2.0, 60.0));
        assert!((schedule.sleep_secs() - 1.0).abs() < f64::EPSILON);

        // A shrinking multiplier never shrinks the delay
        let mut schedule = BackoffSchedule::new(&policy(3, 5.0, 0.5, 60.0));
        schedule.advance();
        assert!((schedule.sleep_secs() - 5.0).abs() < f64::EPSILON);

        // Max below the initial delay is raised to it
        let schedule = BackoffSchedule::new(&policy(3, 10.0, 2.0, 3.0));
        assert!((schedule.sleep_secs() - 10.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn success_returns_immediately() {
        let calls = AtomicU32::new(0);
        let result = send_with_retry(&policy(3, 1.0, 2.0, 10.0), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, TransportError>(42) }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fatal_error_propagates_without_retrying() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, _> = send_with_retry(&policy(3, 1.0, 2.0, 10.0), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TransportError::Rejected("bad request".to_string())) }
        })
        .await;
        assert!(matches!(result, Err(TransportError::Rejected(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_error_is_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result = send_with_retry(&policy(3, 1.0, 2.0, 10.0), || {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call == 0 {
                    Err(TransportError::RateLimited("slow down".to_string()))
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausting_attempts_surfaces_the_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, _> = send_with_retry(&policy(3, 1.0, 2.0, 10.0), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TransportError::Server("boom".to_string())) }
        })
        .await;
        assert!(matches!(result, Err(TransportError::Server(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
