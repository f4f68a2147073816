//! Client-side handling of `Conflict`.
//!
//! The coordinator reports a lost race and stops. A caller that wants another
//! try must re-read the record, look at what the winner wrote, and derive a
//! fresh change against it. `RetryPolicy::update` packages that loop.

use std::time::Duration;

use serde::Deserialize;

use watchlist_api::{Mutation, Outcome, OwnerId, Payload, RecordId, VersionedRecord};

use crate::service::Watchlist;

fn default_max_attempts() -> u32 {
    5
}

fn default_base_backoff_ms() -> u64 {
    5
}

fn default_max_backoff_ms() -> u64 {
    200
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Update attempts per logical change, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// How the retry loop ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryOutcome<P> {
    /// Outcome of the last attempt. `Conflict` here means attempts ran out.
    Finished(Outcome<VersionedRecord<P>>),
    /// `derive` looked at `current` and chose not to write.
    Declined { current: VersionedRecord<P> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryReport<P> {
    pub result: RetryOutcome<P>,
    /// Update calls issued.
    pub attempts: u32,
    /// Attempts that ended in `Conflict`.
    pub conflicts: u32,
}

impl<P> RetryReport<P> {
    pub fn applied(&self) -> Option<&VersionedRecord<P>> {
        match &self.result {
            RetryOutcome::Finished(outcome) => outcome.applied(),
            RetryOutcome::Declined { .. } => None,
        }
    }

    /// Final outcome, with a decline reported as `None`.
    pub fn into_outcome(self) -> Option<Outcome<VersionedRecord<P>>> {
        match self.result {
            RetryOutcome::Finished(outcome) => Some(outcome),
            RetryOutcome::Declined { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_backoff: Duration,
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
            max_backoff: max_backoff.max(base_backoff),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_backoff_ms),
            Duration::from_millis(config.max_backoff_ms),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause after failed attempt number `attempt` (1-based): base doubled
    /// per attempt, capped at the maximum.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let mut backoff = self.base_backoff;
        for _ in 1..attempt {
            backoff = backoff.saturating_mul(2).min(self.max_backoff);
        }
        backoff.min(self.max_backoff)
    }

    /// Optimistic update with re-read and re-derive on conflict.
    ///
    /// Each attempt reads the record as `caller`, passes it to `derive`, and
    /// submits the derived change pinned to the version just read. `derive`
    /// returning `None` stops the loop without writing. Only `Conflict`
    /// triggers another attempt.
    pub async fn update<P, M, F>(
        &self,
        watchlist: &Watchlist<P>,
        id: &RecordId,
        caller: &OwnerId,
        mut derive: F,
    ) -> RetryReport<P>
    where
        P: Payload,
        M: Mutation<P>,
        F: FnMut(&VersionedRecord<P>) -> Option<M>,
    {
        let mut attempts = 0;
        let mut conflicts = 0;

        loop {
            let current = match watchlist.fetch(id, caller).await {
                Outcome::Applied(record) => record,
                other => {
                    return RetryReport {
                        result: RetryOutcome::Finished(other),
                        attempts,
                        conflicts,
                    };
                }
            };

            let Some(mutation) = derive(&current) else {
                tracing::debug!(id = %id, version = current.version, attempts, "retry: change declined");
                return RetryReport {
                    result: RetryOutcome::Declined { current },
                    attempts,
                    conflicts,
                };
            };

            attempts += 1;
            let outcome = watchlist
                .update(id, caller, Some(current.version), &mutation)
                .await;

            if !outcome.is_retryable() {
                return RetryReport {
                    result: RetryOutcome::Finished(outcome),
                    attempts,
                    conflicts,
                };
            }

            conflicts += 1;
            if attempts >= self.max_attempts {
                tracing::debug!(id = %id, attempts, "retry: attempts exhausted");
                return RetryReport {
                    result: RetryOutcome::Finished(outcome),
                    attempts,
                    conflicts,
                };
            }

            let pause = self.backoff(attempts);
            tracing::trace!(id = %id, attempts, pause_ms = pause.as_millis() as u64, "retry: conflict, backing off");
            tokio::time::sleep(pause).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(1, 5)]
    #[case(2, 10)]
    #[case(3, 20)]
    #[case(6, 160)]
    #[case(7, 200)]
    #[case(40, 200)]
    fn backoff_doubles_and_caps(#[case] attempt: u32, #[case] expected_ms: u64) {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(attempt), Duration::from_millis(expected_ms));
    }

    #[test]
    fn at_least_one_attempt() {
        let policy = RetryPolicy::new(0, Duration::ZERO, Duration::ZERO);
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn max_backoff_never_below_base() {
        let policy = RetryPolicy::new(3, Duration::from_millis(50), Duration::from_millis(10));
        assert_eq!(policy.backoff(1), Duration::from_millis(50));
        assert_eq!(policy.backoff(4), Duration::from_millis(50));
    }
}
