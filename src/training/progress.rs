// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Points, personal records and badges
//!
//! Progress is derived by replaying a user's workout logs in date order, so
//! there is no separate progress state to keep in sync.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use super::load::{best_e1rm, exercise_key};
use crate::constants::progress::{
    BADGE_CONSISTENCY_WEEK, BADGE_FIRST_PR, BADGE_FIRST_WORKOUT, BADGE_STRENGTH_MILESTONE,
    CONSISTENCY_DAYS, POINTS_PER_PR, POINTS_PER_WORKOUT, STRENGTH_MILESTONE_POINTS,
};
use crate::models::WorkoutLog;

/// Badge id and its description
pub fn badge_description(id: &str) -> &'static str {
    match id {
        BADGE_FIRST_WORKOUT => "Completed your first workout",
        BADGE_FIRST_PR => "Achieved your first personal record",
        BADGE_CONSISTENCY_WEEK => "Trained on three days within one week",
        BADGE_STRENGTH_MILESTONE => "Reached strength milestone 1",
        _ => "",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub total_workouts: u32,
    pub total_points: u32,
    pub total_prs: u32,
    /// Earned badge ids in award order
    pub badges: Vec<String>,
    pub last_workout_date: Option<NaiveDate>,
}

/// Outcome of logging one workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub log_id: String,
    pub points_earned: u32,
    /// Exercises whose e1RM beat every earlier log
    pub personal_records: Vec<String>,
    pub new_badges: Vec<String>,
    pub summary: ProgressSummary,
}

#[derive(Debug, Default)]
pub struct ProgressTracker {
    summary: ProgressSummary,
    best: HashMap<String, f64>,
    training_days: BTreeSet<NaiveDate>,
}

impl ProgressTracker {
    /// Replay `logs` (sorted by date, stable) into a tracker
    pub fn replay(logs: &[WorkoutLog]) -> Self {
        let mut sorted: Vec<&WorkoutLog> = logs.iter().collect();
        sorted.sort_by_key(|log| log.date);

        let mut tracker = Self::default();
        for log in sorted {
            tracker.apply(log);
        }
        tracker
    }

    pub fn summary(&self) -> &ProgressSummary {
        &self.summary
    }

    /// Record a workout and return what it earned
    ///
    /// A personal record needs an earlier log of the same exercise to beat.
    pub fn apply(&mut self, log: &WorkoutLog) -> ProgressUpdate {
        let mut personal_records = Vec::new();
        for exercise in &log.exercises {
            let Some(e1rm) = best_e1rm(exercise) else {
                continue;
            };
            let key = exercise_key(&exercise.name);
            match self.best.get(&key) {
                Some(previous) if e1rm > *previous => {
                    personal_records.push(exercise.name.clone());
                    self.best.insert(key, e1rm);
                }
                Some(_) => {}
                None => {
                    self.best.insert(key, e1rm);
                }
            }
        }

        let mut points_earned = POINTS_PER_WORKOUT;
        if !personal_records.is_empty() {
            points_earned += POINTS_PER_PR;
            self.summary.total_prs += 1;
        }
        self.summary.total_workouts += 1;
        self.summary.total_points += points_earned;
        self.summary.last_workout_date = self.summary.last_workout_date.max(Some(log.date));
        self.training_days.insert(log.date);

        let new_badges = self.award_badges(log.date);

        ProgressUpdate {
            log_id: log.id.clone(),
            points_earned,
            personal_records,
            new_badges,
            summary: self.summary.clone(),
        }
    }

    fn days_in_week_ending(&self, date: NaiveDate) -> usize {
        self.training_days
            .range(date - Duration::days(6)..=date)
            .count()
    }

    fn award_badges(&mut self, date: NaiveDate) -> Vec<String> {
        let earned = [
            (BADGE_FIRST_WORKOUT, self.summary.total_workouts >= 1),
            (BADGE_FIRST_PR, self.summary.total_prs >= 1),
            (BADGE_CONSISTENCY_WEEK, self.days_in_week_ending(date) >= CONSISTENCY_DAYS),
            (BADGE_STRENGTH_MILESTONE, self.summary.total_points >= STRENGTH_MILESTONE_POINTS),
        ];

        let mut new_badges = Vec::new();
        for (badge, condition) in earned {
            if condition && !self.summary.badges.iter().any(|b| b == badge) {
                self.summary.badges.push(badge.to_string());
                new_badges.push(badge.to_string());
            }
        }
        new_badges
    }
}

/// Progress earned by `log` on top of the user's earlier logs
pub fn track_progress(previous_logs: &[WorkoutLog], log: &WorkoutLog) -> ProgressUpdate {
    let mut tracker = ProgressTracker::replay(previous_logs);
    tracker.apply(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExerciseLog, SetLog};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
    }

    fn squat(date: NaiveDate, weight: f64) -> WorkoutLog {
        WorkoutLog::new(
            "u1",
            date,
            vec![ExerciseLog {
                name: "Back Squat".into(),
                sets: vec![SetLog {
                    reps: 5,
                    weight_kg: weight,
                    rpe: None,
                }],
            }],
        )
    }

    #[test]
    fn test_first_workout() {
        let update = track_progress(&[], &squat(day(1), 100.0));
        assert_eq!(update.points_earned, 10);
        assert!(update.personal_records.is_empty());
        assert_eq!(update.new_badges, vec!["first_workout"]);
    }

    #[test]
    fn test_personal_record_earns_bonus_once() {
        let history = vec![squat(day(1), 100.0)];
        let update = track_progress(&history, &squat(day(3), 105.0));
        assert_eq!(update.points_earned, 60);
        assert_eq!(update.personal_records, vec!["Back Squat"]);
        assert_eq!(update.new_badges, vec!["first_pr"]);

        let history = vec![squat(day(1), 100.0), squat(day(3), 105.0)];
        let update = track_progress(&history, &squat(day(20), 105.0));
        assert_eq!(update.points_earned, 10);
        assert!(update.new_badges.is_empty());
    }

    #[test]
    fn test_consistency_needs_three_days_in_a_week() {
        let history = vec![squat(day(1), 100.0), squat(day(1), 90.0), squat(day(4), 90.0)];
        let update = track_progress(&history, &squat(day(9), 90.0));
        assert!(!update.new_badges.contains(&"consistency_1_week".to_string()));

        let update = track_progress(&history, &squat(day(7), 90.0));
        assert!(update.new_badges.contains(&"consistency_1_week".to_string()));
    }

    #[test]
    fn test_replay_order_and_milestone() {
        // out-of-order input replays by date
        let mut logs: Vec<WorkoutLog> = (1..=28)
            .map(|d| squat(day(d), 100.0 + f64::from(d)))
            .collect();
        logs.reverse();
        let tracker = ProgressTracker::replay(&logs);
        let summary = tracker.summary();

        assert_eq!(summary.total_workouts, 28);
        assert_eq!(summary.total_prs, 27);
        assert_eq!(summary.total_points, 28 * 10 + 27 * 50);
        assert_eq!(summary.last_workout_date, Some(day(28)));
        assert_eq!(
            summary.badges,
            vec!["first_workout", "first_pr", "consistency_1_week", "strength_milestone_1"]
        );
    }

    #[test]
    fn test_badge_descriptions() {
        assert!(!badge_description(BADGE_FIRST_PR).is_empty());
        assert_eq!(badge_description("unknown"), "");
    }
}
