// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Readiness and strength trends over stored history

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::fitness_config::TrendConfig;
use crate::models::{ReadinessMetrics, WorkoutLog};
use crate::training::load::{best_e1rm, exercise_key};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    #[default]
    Stable,
    Declining,
}

/// How much history backs the trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrendConfidence {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl TrendConfidence {
    fn from_samples(samples: usize, window: usize) -> Self {
        if samples == 0 {
            Self::None
        } else if samples * 2 < window {
            Self::Low
        } else if samples < window {
            Self::Medium
        } else {
            Self::High
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TrendData {
    /// Readiness entries with a score
    pub samples: usize,
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub latest: Option<f64>,
    /// Mean of the most recent `window` entries
    pub rolling_average: Option<f64>,
    /// Least-squares slope over the window, in points per entry
    pub slope: Option<f64>,
    pub direction: TrendDirection,
    pub confidence: TrendConfidence,
    /// Best e1RM per exercise key
    pub best_e1rm: BTreeMap<String, f64>,
}

impl TrendData {
    pub fn e1rm_for(&self, exercise: &str) -> Option<f64> {
        self.best_e1rm.get(&exercise_key(exercise)).copied()
    }

    /// Declining with at least medium confidence
    pub fn is_confidently_declining(&self) -> bool {
        self.direction == TrendDirection::Declining && self.confidence >= TrendConfidence::Medium
    }
}

fn least_squares_slope(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;

    let (num, den) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, y)| {
            let dx = i as f64 - mean_x;
            (num + dx * (y - mean_y), den + dx * dx)
        });
    (den > 0.0).then(|| num / den)
}

/// Summarise readiness history and strength logs
///
/// History order does not matter; entries are sorted by date. An empty
/// history yields `confidence = none` and no statistics.
pub fn analyze_trends(
    readiness_history: &[ReadinessMetrics],
    workout_logs: &[WorkoutLog],
    config: &TrendConfig,
) -> TrendData {
    let mut history: Vec<&ReadinessMetrics> = readiness_history
        .iter()
        .filter(|m| m.readiness_score.is_some_and(f64::is_finite))
        .collect();
    history.sort_by_key(|m| m.date);
    let scores: Vec<f64> = history.iter().filter_map(|m| m.readiness_score).collect();

    let mut best: BTreeMap<String, f64> = BTreeMap::new();
    for exercise in workout_logs.iter().flat_map(|log| &log.exercises) {
        if let Some(e1rm) = best_e1rm(exercise) {
            let entry = best.entry(exercise_key(&exercise.name)).or_insert(e1rm);
            *entry = entry.max(e1rm);
        }
    }

    let mut trend = TrendData {
        samples: scores.len(),
        best_e1rm: best,
        ..TrendData::default()
    };
    if scores.is_empty() {
        return trend;
    }

    let window = config.window.max(1);
    let recent = &scores[scores.len().saturating_sub(window)..];

    trend.average = Some(scores.iter().sum::<f64>() / scores.len() as f64);
    trend.min = scores.iter().copied().reduce(f64::min);
    trend.max = scores.iter().copied().reduce(f64::max);
    trend.latest = scores.last().copied();
    trend.rolling_average = Some(recent.iter().sum::<f64>() / recent.len() as f64);
    trend.slope = least_squares_slope(recent);
    trend.direction = match trend.slope {
        Some(slope) if slope > config.stability_tolerance => TrendDirection::Improving,
        Some(slope) if slope < -config.stability_tolerance => TrendDirection::Declining,
        _ => TrendDirection::Stable,
    };
    trend.confidence = TrendConfidence::from_samples(recent.len(), window);
    trend
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExerciseLog, SetLog};
    use chrono::{Duration, NaiveDate};

    fn history(scores: &[f64]) -> Vec<ReadinessMetrics> {
        let start = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let mut m = ReadinessMetrics::new("u1", start + Duration::days(i as i64));
                m.readiness_score = Some(*s);
                m
            })
            .collect()
    }

    #[test]
    fn test_empty_history_has_no_confidence() {
        let trend = analyze_trends(&[], &[], &TrendConfig::default());
        assert_eq!(trend.confidence, TrendConfidence::None);
        assert_eq!(trend.average, None);
        assert_eq!(trend.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_declining_history() {
        let mut entries = history(&[90.0, 86.0, 82.0, 78.0, 74.0, 70.0, 66.0]);
        entries.reverse();
        let trend = analyze_trends(&entries, &[], &TrendConfig::default());

        assert_eq!(trend.samples, 7);
        assert!((trend.slope.unwrap() + 4.0).abs() < 1e-9);
        assert_eq!(trend.direction, TrendDirection::Declining);
        assert_eq!(trend.confidence, TrendConfidence::High);
        assert_eq!(trend.latest, Some(66.0));
        assert_eq!(trend.min, Some(66.0));
        assert_eq!(trend.max, Some(90.0));
        assert!(trend.is_confidently_declining());
    }

    #[test]
    fn test_short_history_is_low_confidence() {
        let trend = analyze_trends(&history(&[80.0, 70.0]), &[], &TrendConfig::default());
        assert_eq!(trend.direction, TrendDirection::Declining);
        assert_eq!(trend.confidence, TrendConfidence::Low);
        assert!(!trend.is_confidently_declining());

        let single = analyze_trends(&history(&[75.0]), &[], &TrendConfig::default());
        assert_eq!(single.slope, None);
        assert_eq!(single.rolling_average, Some(75.0));
    }

    #[test]
    fn test_rolling_average_uses_window() {
        let config = TrendConfig {
            window: 2,
            ..TrendConfig::default()
        };
        let trend = analyze_trends(&history(&[50.0, 80.0, 80.0, 80.0]), &[], &config);
        assert_eq!(trend.rolling_average, Some(80.0));
        assert_eq!(trend.average, Some(72.5));
        assert_eq!(trend.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_best_e1rm_per_exercise() {
        let day = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let log = |name: &str, weight: f64, reps: u32| {
            WorkoutLog::new(
                "u1",
                day,
                vec![ExerciseLog {
                    name: name.into(),
                    sets: vec![SetLog {
                        reps,
                        weight_kg: weight,
                        rpe: None,
                    }],
                }],
            )
        };
        let logs = vec![
            log("Back Squat", 100.0, 1),
            log("back squat", 110.0, 1),
            log("Deadlift", 150.0, 1),
        ];

        let trend = analyze_trends(&[], &logs, &TrendConfig::default());
        assert_eq!(trend.e1rm_for("BACK SQUAT"), Some(110.0));
        assert_eq!(trend.e1rm_for("Deadlift"), Some(150.0));
        let keys: Vec<&String> = trend.best_e1rm.keys().collect();
        assert_eq!(keys, vec!["back squat", "deadlift"]);
    }
}
