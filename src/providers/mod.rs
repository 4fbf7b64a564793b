// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Biometric providers and the HTTP retry policy shared by external clients

pub mod oura;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::environment::RetryConfig;
use crate::errors::{TrainerError, TrainerResult};

/// Inclusive day range for provider queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// The `days` days ending at `end`
    pub fn ending_at(end: NaiveDate, days: i64) -> Self {
        Self {
            start: end - chrono::Duration::days(days.max(1) - 1),
            end,
        }
    }
}

/// Nightly sleep summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SleepRecord {
    #[serde(default)]
    pub day: Option<NaiveDate>,
    #[serde(default)]
    pub score: Option<f64>,
}

/// Daily activity summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    #[serde(default)]
    pub day: Option<NaiveDate>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub steps: Option<u64>,
    #[serde(default)]
    pub active_calories: Option<f64>,
}

/// Readiness contributor scores (0-100)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadinessContributors {
    #[serde(default)]
    pub hrv_balance: Option<f64>,
    #[serde(default)]
    pub recovery_index: Option<f64>,
    #[serde(default)]
    pub resting_heart_rate: Option<f64>,
    #[serde(default)]
    pub sleep_balance: Option<f64>,
}

/// Daily readiness summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadinessRecord {
    #[serde(default)]
    pub day: Option<NaiveDate>,
    #[serde(default)]
    pub score: Option<f64>,
    /// Deviation from baseline body temperature in °C
    #[serde(default)]
    pub temperature_deviation: Option<f64>,
    #[serde(default)]
    pub contributors: ReadinessContributors,
    /// Nightly average HRV in ms
    #[serde(default)]
    pub hrv: Option<f64>,
    #[serde(default)]
    pub hrv_baseline: Option<f64>,
    #[serde(default)]
    pub respiratory_rate: Option<f64>,
}

/// Source of nightly biometric summaries
#[async_trait]
pub trait BiometricProvider: Send + Sync {
    async fn get_sleep_data(
        &self,
        user_id: &str,
        range: DateRange,
    ) -> TrainerResult<Vec<SleepRecord>>;

    async fn get_activity_data(
        &self,
        user_id: &str,
        range: DateRange,
    ) -> TrainerResult<Vec<ActivityRecord>>;

    async fn get_readiness_data(
        &self,
        user_id: &str,
        range: DateRange,
    ) -> TrainerResult<Vec<ReadinessRecord>>;

    fn provider_name(&self) -> &'static str;
}

/// Bounded exponential backoff for external calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Worst-case time for every attempt to run out `per_attempt`, backoff included
    pub fn deadline(&self, per_attempt: Duration) -> Duration {
        let attempts = per_attempt.saturating_mul(self.max_retries.saturating_add(1));
        (0..self.max_retries).fold(attempts, |total, attempt| {
            total.saturating_add(self.delay_for(attempt))
        })
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

/// A failed attempt, flagged as worth retrying or not
#[derive(Debug)]
pub struct CallFailure {
    pub error: TrainerError,
    pub retryable: bool,
}

impl CallFailure {
    pub fn transient(error: TrainerError) -> Self {
        Self {
            error,
            retryable: true,
        }
    }

    pub fn permanent(error: TrainerError) -> Self {
        Self {
            error,
            retryable: false,
        }
    }

    /// Classify an HTTP status: server errors and 429 are transient
    pub fn from_status(status: reqwest::StatusCode, error: TrainerError) -> Self {
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Self::transient(error)
        } else {
            Self::permanent(error)
        }
    }

    /// Classify a transport error: timeouts and connect failures are transient
    pub fn from_reqwest(err: &reqwest::Error, error: TrainerError) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Self::transient(error)
        } else {
            Self::permanent(error)
        }
    }
}

/// Run `call` until it succeeds, fails permanently or retries run out
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    operation: &str,
    mut call: F,
) -> TrainerResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CallFailure>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(failure) if failure.retryable && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    max_attempts = policy.max_retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %failure.error,
                    "External call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(failure) => return Err(failure.error),
        }
    }
}
