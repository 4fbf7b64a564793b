// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Readiness scoring
//!
//! Combines up to three 0-100 components into one readiness score:
//! - the provider's own readiness score
//! - the most recent sleep score
//! - HRV balance (provider contributor, or nightly HRV against baseline)
//!
//! Component weights come from [`ReadinessConfig`] and are renormalised over
//! the components actually present, so a night without HRV still yields a
//! score on the same scale. A body temperature deviation beyond the tolerance
//! subtracts a capped penalty.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::config::fitness_config::ReadinessConfig;
use crate::errors::{TrainerError, TrainerResult};
use crate::models::ReadinessMetrics;
use crate::providers::{ActivityRecord, ReadinessRecord, SleepRecord};

/// Biometric input for one readiness calculation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiometricSnapshot {
    pub sleep: Vec<SleepRecord>,
    pub activity: Vec<ActivityRecord>,
    pub readiness: ReadinessRecord,
}

impl BiometricSnapshot {
    /// Validate and parse a raw `{sleep: [..], activity: [..], readiness: {..}}` payload
    ///
    /// # Errors
    ///
    /// `AgentGeneration` when a section is missing, has the wrong shape, or
    /// does not parse
    pub fn from_value(value: &Value) -> TrainerResult<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| TrainerError::generation("biometric data must be an object"))?;

        let sleep = object
            .get("sleep")
            .filter(|v| v.is_array())
            .ok_or_else(|| TrainerError::generation("biometric data needs a `sleep` array"))?;
        let activity = object
            .get("activity")
            .filter(|v| v.is_array())
            .ok_or_else(|| TrainerError::generation("biometric data needs an `activity` array"))?;
        let readiness = object
            .get("readiness")
            .filter(|v| v.is_object())
            .ok_or_else(|| TrainerError::generation("biometric data needs a `readiness` object"))?;

        Ok(Self {
            sleep: parse_section(sleep, "sleep")?,
            activity: parse_section(activity, "activity")?,
            readiness: parse_section(readiness, "readiness")?,
        })
    }

    /// Combine provider collections; the latest readiness record by day wins
    pub fn from_records(
        sleep: Vec<SleepRecord>,
        activity: Vec<ActivityRecord>,
        readiness: Vec<ReadinessRecord>,
    ) -> Self {
        // max_by_key returns the last maximum, so equal days keep the later record
        let readiness = readiness
            .into_iter()
            .max_by_key(|r| r.day)
            .unwrap_or_default();
        Self {
            sleep,
            activity,
            readiness,
        }
    }

    /// Most recent sleep score, by day then position
    pub fn latest_sleep_score(&self) -> Option<f64> {
        self.sleep
            .iter()
            .filter(|s| s.score.is_some())
            .max_by_key(|s| s.day)
            .and_then(|s| s.score)
    }

    /// The day this snapshot describes
    pub fn day(&self) -> Option<NaiveDate> {
        self.readiness
            .day
            .or_else(|| self.sleep.iter().filter_map(|s| s.day).max())
    }

    /// HRV balance score: the provider contributor, else HRV relative to baseline
    pub fn hrv_score(&self) -> Option<f64> {
        if let Some(balance) = self.readiness.contributors.hrv_balance {
            return Some(balance);
        }
        match (self.readiness.hrv, self.readiness.hrv_baseline) {
            (Some(hrv), Some(baseline)) if baseline > 0.0 => {
                Some((100.0 * hrv / baseline).clamp(0.0, 100.0))
            }
            _ => None,
        }
    }

    /// Persistable per-day metrics for `user_id`
    pub fn to_metrics(
        &self,
        user_id: &str,
        date: NaiveDate,
        assessment: &ReadinessAssessment,
    ) -> ReadinessMetrics {
        let mut metrics = ReadinessMetrics::new(user_id, date);
        metrics.hrv = self.readiness.hrv;
        metrics.sleep_score = self.latest_sleep_score();
        metrics.recovery_score = self.readiness.contributors.recovery_index;
        metrics.readiness_score = Some(assessment.score);
        metrics.temperature_deviation = self.readiness.temperature_deviation;
        metrics.respiratory_rate = self.readiness.respiratory_rate;
        metrics
    }
}

fn parse_section<T: serde::de::DeserializeOwned>(value: &Value, section: &str) -> TrainerResult<T> {
    serde_json::from_value(value.clone())
        .map_err(|e| TrainerError::generation(format!("invalid `{section}` data: {e}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessCategory {
    Low,
    Moderate,
    High,
}

impl ReadinessCategory {
    /// low below `low_threshold`, high above `high_threshold`, else moderate
    pub fn from_score(score: f64, config: &ReadinessConfig) -> Self {
        if score < config.low_threshold {
            Self::Low
        } else if score > config.high_threshold {
            Self::High
        } else {
            Self::Moderate
        }
    }
}

impl fmt::Display for ReadinessCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => f.write_str("low"),
            Self::Moderate => f.write_str("moderate"),
            Self::High => f.write_str("high"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataCompleteness {
    /// Provider score, sleep and HRV all present
    Full,
    /// Two of the three components
    Partial,
    /// A single component
    Minimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessComponents {
    pub provider_score: Option<f64>,
    pub sleep_score: Option<f64>,
    pub hrv_score: Option<f64>,
    /// Points subtracted for temperature deviation
    pub temperature_penalty: f64,
    pub components_available: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessAssessment {
    /// Overall readiness (0-100)
    pub score: f64,
    pub category: ReadinessCategory,
    pub components: ReadinessComponents,
    pub data_completeness: DataCompleteness,
}

fn checked_score(value: Option<f64>, name: &str) -> TrainerResult<Option<f64>> {
    match value {
        Some(v) if !v.is_finite() || !(0.0..=100.0).contains(&v) => Err(TrainerError::generation(
            format!("{name} must be within 0-100, got {v}"),
        )),
        other => Ok(other),
    }
}

/// Points lost for a temperature deviation beyond tolerance
fn temperature_penalty(deviation: Option<f64>, config: &ReadinessConfig) -> TrainerResult<f64> {
    let Some(deviation) = deviation else {
        return Ok(0.0);
    };
    if !deviation.is_finite() {
        return Err(TrainerError::generation("temperature deviation must be finite"));
    }
    let excess = deviation.abs() - config.temperature_tolerance;
    if excess <= 0.0 {
        return Ok(0.0);
    }
    Ok((excess * config.temperature_penalty_per_degree).min(config.max_temperature_penalty))
}

/// Score a biometric snapshot
///
/// # Errors
///
/// `AgentGeneration` when no component is available or an input is out of range
pub fn calculate_readiness(
    snapshot: &BiometricSnapshot,
    config: &ReadinessConfig,
) -> TrainerResult<ReadinessAssessment> {
    let provider_score = checked_score(snapshot.readiness.score, "readiness score")?;
    let sleep_score = checked_score(snapshot.latest_sleep_score(), "sleep score")?;
    let hrv_score = checked_score(snapshot.hrv_score(), "HRV balance")?;

    let weighted: Vec<(f64, f64)> = [
        (provider_score, config.provider_weight),
        (sleep_score, config.sleep_weight),
        (hrv_score, config.hrv_weight),
    ]
    .into_iter()
    .filter_map(|(score, weight)| score.map(|s| (s, weight)))
    .filter(|(_, weight)| *weight > 0.0)
    .collect();

    if weighted.is_empty() {
        return Err(TrainerError::generation(
            "no readiness, sleep or HRV score available",
        ));
    }

    let total_weight: f64 = weighted.iter().map(|(_, w)| w).sum();
    let base = weighted.iter().map(|(s, w)| s * w).sum::<f64>() / total_weight;
    let penalty = temperature_penalty(snapshot.readiness.temperature_deviation, config)?;
    let score = (base - penalty).clamp(0.0, 100.0);

    let available = weighted.len() as u8;
    let data_completeness = match available {
        3 => DataCompleteness::Full,
        2 => DataCompleteness::Partial,
        _ => DataCompleteness::Minimal,
    };

    Ok(ReadinessAssessment {
        score,
        category: ReadinessCategory::from_score(score, config),
        components: ReadinessComponents {
            provider_score,
            sleep_score,
            hrv_score,
            temperature_penalty: penalty,
            components_available: available,
        },
        data_completeness,
    })
}
