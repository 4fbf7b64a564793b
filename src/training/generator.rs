// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Four-week push/pull/legs plan generation

use chrono::NaiveDate;
use tracing::debug;

use super::load::intensity_for_reps;
use crate::constants::training::{DAYS_PER_WEEK, WEEKLY_PROGRESSION};
use crate::models::{
    DayFocus, FitnessLevel, PlanDay, PlanStatus, Prescription, UserProfile, WorkoutPlan,
};

/// Push, pull and legs movements for one fitness level; compounds first
struct LevelTemplate {
    push: &'static [&'static str],
    pull: &'static [&'static str],
    legs: &'static [&'static str],
}

const BEGINNER: LevelTemplate = LevelTemplate {
    push: &["Dumbbell Bench Press", "Seated Dumbbell Press", "Triceps Pushdown"],
    pull: &["Lat Pulldown", "Seated Cable Row", "Dumbbell Curl"],
    legs: &["Goblet Squat", "Romanian Deadlift", "Leg Press"],
};

const INTERMEDIATE: LevelTemplate = LevelTemplate {
    push: &["Barbell Bench Press", "Overhead Press", "Incline Dumbbell Press", "Triceps Pushdown"],
    pull: &["Barbell Row", "Pull-up", "Face Pull", "Barbell Curl"],
    legs: &["Back Squat", "Romanian Deadlift", "Walking Lunge", "Leg Curl"],
};

const ADVANCED: LevelTemplate = LevelTemplate {
    push: &[
        "Barbell Bench Press",
        "Overhead Press",
        "Weighted Dip",
        "Incline Dumbbell Press",
        "Lateral Raise",
    ],
    pull: &["Deadlift", "Weighted Pull-up", "Barbell Row", "Face Pull", "Hammer Curl"],
    legs: &[
        "Back Squat",
        "Front Squat",
        "Romanian Deadlift",
        "Bulgarian Split Squat",
        "Standing Calf Raise",
    ],
};

impl LevelTemplate {
    fn for_level(level: FitnessLevel) -> &'static Self {
        match level {
            FitnessLevel::Beginner => &BEGINNER,
            FitnessLevel::Intermediate => &INTERMEDIATE,
            FitnessLevel::Advanced => &ADVANCED,
        }
    }

    fn exercises(&self, focus: DayFocus) -> &'static [&'static str] {
        match focus {
            DayFocus::Push => self.push,
            DayFocus::Pull => self.pull,
            DayFocus::Legs => self.legs,
        }
    }
}

/// Round to three decimals so stored plans compare exactly
fn round_pct(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Stable plan id for a user, goal and start date
pub fn base_plan_id(user_id: &str, goal: &str, start_date: NaiveDate) -> String {
    let slug: String = goal
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let slug = if slug.is_empty() { "general".to_string() } else { slug };
    format!("{user_id}-{slug}-{start_date}")
}

/// Build the unadjusted 4-week plan for `profile`
///
/// Each week has a push, a pull and a legs day. Sets and reps follow the
/// weekly progression; intensity is the Epley %1RM for the rep target scaled
/// by the week's modifier. Loads stay unset until an e1RM is known.
pub fn generate_base_plan(profile: &UserProfile, goal: &str, start_date: NaiveDate) -> WorkoutPlan {
    let template = LevelTemplate::for_level(profile.fitness_level);
    let mut days = Vec::with_capacity(WEEKLY_PROGRESSION.len() * DAYS_PER_WEEK as usize);

    for (week_index, (sets, reps, modifier)) in WEEKLY_PROGRESSION.iter().enumerate() {
        let week = week_index as u32 + 1;
        for (day_index, focus) in DayFocus::ALL.iter().enumerate() {
            let prescriptions = template
                .exercises(*focus)
                .iter()
                .map(|exercise| Prescription {
                    exercise: (*exercise).to_string(),
                    sets: *sets,
                    reps: *reps,
                    intensity_pct: round_pct(intensity_for_reps(*reps) * modifier),
                    target_load: None,
                    substituted_from: None,
                })
                .collect();
            days.push(PlanDay {
                week,
                day: day_index as u32 + 1,
                focus: *focus,
                prescriptions,
            });
        }
    }

    let plan = WorkoutPlan {
        id: base_plan_id(&profile.user_id, goal, start_date),
        user_id: profile.user_id.clone(),
        goal: goal.trim().to_string(),
        fitness_level: profile.fitness_level,
        start_date,
        days,
        readiness_adjustment: None,
        load_multiplier: None,
        intensity: None,
        notes: Vec::new(),
        status: PlanStatus::Active,
        adjusted_from: None,
    };
    debug!(
        plan_id = %plan.id,
        level = %profile.fitness_level,
        days = plan.days.len(),
        "Generated base plan"
    );
    plan
}

/// Attach a research summary as a plan note without touching its structure
pub fn attach_research_note(plan: &mut WorkoutPlan, summary: &str) {
    let summary = summary.trim();
    if !summary.is_empty() {
        plan.notes.push(format!("Research: {summary}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(level: FitnessLevel) -> UserProfile {
        UserProfile::new("u1", "Sam", 30, 180.0, 80.0).with_level(level)
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    #[test]
    fn test_plan_shape() {
        let plan = generate_base_plan(&profile(FitnessLevel::Intermediate), "Hypertrophy", start());

        assert_eq!(plan.days.len(), 12);
        assert_eq!(plan.week(4).count(), 3);
        let w1d1 = plan.day("w1d1").unwrap();
        assert_eq!(w1d1.focus, DayFocus::Push);
        assert_eq!(w1d1.prescriptions[0].exercise, "Barbell Bench Press");
        assert_eq!(plan.day("w2d3").unwrap().focus, DayFocus::Legs);
        assert_eq!(plan.id, "u1-hypertrophy-2025-06-02");
    }

    #[test]
    fn test_weekly_progression() {
        let plan = generate_base_plan(&profile(FitnessLevel::Beginner), "strength", start());
        let first = |week: u32| plan.week(week).next().unwrap().prescriptions[0].clone();

        assert_eq!((first(1).sets, first(1).reps), (3, 10));
        assert_eq!((first(3).sets, first(3).reps), (4, 8));
        assert_eq!((first(4).sets, first(4).reps), (3, 12));
        // week 2 is the unmodified Epley percentage for 10 reps
        assert_eq!(first(2).intensity_pct, 0.75);
        assert!(first(1).intensity_pct < first(2).intensity_pct);
        assert!(first(4).intensity_pct < first(1).intensity_pct);
    }

    #[test]
    fn test_levels_use_their_templates() {
        let beginner = generate_base_plan(&profile(FitnessLevel::Beginner), "g", start());
        let advanced = generate_base_plan(&profile(FitnessLevel::Advanced), "g", start());
        assert_eq!(beginner.day("w1d3").unwrap().prescriptions[0].exercise, "Goblet Squat");
        assert_eq!(advanced.day("w1d2").unwrap().prescriptions[0].exercise, "Deadlift");
        assert_eq!(advanced.day("w1d3").unwrap().prescriptions.len(), 5);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = generate_base_plan(&profile(FitnessLevel::Advanced), "Get strong!", start());
        let b = generate_base_plan(&profile(FitnessLevel::Advanced), "Get strong!", start());
        assert_eq!(a, b);
        assert_eq!(a.id, "u1-get-strong-2025-06-02");
        assert_eq!(base_plan_id("u1", "  ", start()), "u1-general-2025-06-02");
    }

    #[test]
    fn test_research_note_keeps_structure() {
        let mut plan = generate_base_plan(&profile(FitnessLevel::Intermediate), "g", start());
        let days = plan.days.clone();
        attach_research_note(&mut plan, "Prioritise compound lifts.");
        attach_research_note(&mut plan, "   ");
        assert_eq!(plan.days, days);
        assert_eq!(plan.notes, vec!["Research: Prioritise compound lifts."]);
    }
}
