// vigil-core/src/domain/project/settings.rs

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::error::DomainError;
use crate::domain::quality::Status;

/// When the end-of-run baseline snapshot replaces the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselinePolicy {
    /// Overwrite after every run, whatever the outcome.
    #[default]
    Always,
    /// Keep the previous baseline when the table ends in FAIL or ERROR.
    SkipOnFailure,
    /// Never write (dry run).
    Never,
}

impl BaselinePolicy {
    /// `Some(reason)` when the snapshot of a table ending in `status` must not be written.
    pub fn skip_reason(self, status: Status) -> Option<String> {
        match self {
            BaselinePolicy::Always => None,
            BaselinePolicy::Never => Some("baseline writes disabled".to_string()),
            BaselinePolicy::SkipOnFailure if status >= Status::Fail => {
                Some(format!("table status is {status}, previous baseline kept"))
            }
            BaselinePolicy::SkipOnFailure => None,
        }
    }
}

/// Bounded exponential backoff for metric queries that fail with a query error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// No retry at all.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after `current`, capped at `max_backoff`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.mul_f64(self.multiplier).min(self.max_backoff)
    }

    pub fn first_delay(&self) -> Duration {
        self.initial_backoff.min(self.max_backoff)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    /// Per query attempt.
    pub query_timeout: Duration,
    /// Whole run; in-flight checks are cancelled when it elapses.
    pub run_timeout: Option<Duration>,
    /// Per datasource.
    pub max_concurrent_queries: usize,
    pub max_concurrent_tables: usize,
    pub retry: RetryPolicy,
    pub baseline_policy: BaselinePolicy,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(30),
            run_timeout: None,
            max_concurrent_queries: 4,
            max_concurrent_tables: 4,
            retry: RetryPolicy::default(),
            baseline_policy: BaselinePolicy::default(),
        }
    }
}

impl RunSettings {
    pub fn validate(&self) -> Result<(), DomainError> {
        let fail = |msg: &str| Err(DomainError::InvalidSettings(msg.to_string()));

        if self.query_timeout.is_zero() {
            return fail("query_timeout must be greater than zero");
        }
        if self.run_timeout.is_some_and(|t| t.is_zero()) {
            return fail("run_timeout must be greater than zero");
        }
        if self.max_concurrent_queries == 0 {
            return fail("max_concurrent_queries must be at least 1");
        }
        if self.max_concurrent_tables == 0 {
            return fail("max_concurrent_tables must be at least 1");
        }
        if self.retry.max_attempts == 0 {
            return fail("retry.max_attempts must be at least 1");
        }
        if !self.retry.multiplier.is_finite() || self.retry.multiplier < 1.0 {
            return fail("retry.multiplier must be a finite number >= 1.0");
        }
        Ok(())
    }
}
