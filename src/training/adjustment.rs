// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Readiness-driven plan adjustment
//!
//! The adjustment is a pure function of the base plan, the readiness score,
//! the trend data and the configuration. The adjusted plan id is derived from
//! the base id and the score, so the same inputs always produce the same plan.

use crate::biometrics::{ReadinessCategory, TrendData};
use crate::config::fitness_config::FitnessConfig;
use crate::errors::{TrainerError, TrainerResult};
use crate::models::{IntensityLevel, PlanStatus, Prescription, WorkoutPlan};

use super::load::round_to_increment;

/// Id of the plan adjusted from `base_id` for `readiness_score`
pub fn adjusted_plan_id(base_id: &str, readiness_score: f64) -> String {
    format!("{base_id}-r{:04}", (readiness_score * 10.0).round() as i64)
}

/// Load multiplier for a readiness band, including the declining-trend cut
pub fn load_multiplier(
    category: ReadinessCategory,
    trend: &TrendData,
    config: &FitnessConfig,
) -> f64 {
    let adjustment = &config.adjustment;
    let band = match category {
        ReadinessCategory::Low => adjustment.low_load_multiplier,
        ReadinessCategory::Moderate => adjustment.moderate_load_multiplier,
        ReadinessCategory::High => adjustment.high_load_multiplier,
    };
    if trend.is_confidently_declining() {
        band * adjustment.declining_trend_multiplier
    } else {
        band
    }
}

fn round_pct(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn adjust_prescription(
    base: &Prescription,
    category: ReadinessCategory,
    is_first: bool,
    multiplier: f64,
    trend: &TrendData,
    config: &FitnessConfig,
) -> Prescription {
    let mut adjusted = base.clone();

    match category {
        ReadinessCategory::Low => {
            adjusted.sets = base.sets.saturating_sub(1).max(1);
            if let Some(substitute) = config.substitutions.substitute_for(&base.exercise) {
                adjusted.substituted_from = Some(base.exercise.clone());
                adjusted.exercise = substitute.to_string();
            }
        }
        ReadinessCategory::High if is_first => adjusted.sets = base.sets + 1,
        _ => {}
    }

    adjusted.intensity_pct = round_pct(base.intensity_pct * multiplier);
    adjusted.target_load = trend
        .e1rm_for(&adjusted.exercise)
        .map(|e1rm| round_to_increment(e1rm * base.intensity_pct * multiplier))
        .filter(|load| *load > 0.0);
    adjusted
}

/// Adjust `base_plan` for a readiness score and trend
///
/// - low (below the low threshold): lighter loads, one set fewer (at least
///   one), high-fatigue movements swapped for their configured substitutes
/// - moderate: loads unchanged
/// - high (above the high threshold): heavier loads and one extra set on the
///   first movement of each day
///
/// A confidently declining readiness trend cuts loads further.
///
/// # Errors
///
/// `AgentGeneration` when the score is not finite or outside 0-100
pub fn adjust_plan(
    base_plan: &WorkoutPlan,
    readiness_score: f64,
    trend: &TrendData,
    config: &FitnessConfig,
) -> TrainerResult<WorkoutPlan> {
    if !readiness_score.is_finite() || !(0.0..=100.0).contains(&readiness_score) {
        return Err(TrainerError::generation(format!(
            "readiness score must be within 0-100, got {readiness_score}"
        )));
    }

    let category = ReadinessCategory::from_score(readiness_score, &config.readiness);
    let multiplier = load_multiplier(category, trend, config);

    let mut plan = base_plan.clone();
    for day in &mut plan.days {
        day.prescriptions = day
            .prescriptions
            .iter()
            .enumerate()
            .map(|(i, p)| adjust_prescription(p, category, i == 0, multiplier, trend, config))
            .collect();
    }

    let (intensity, note) = match category {
        ReadinessCategory::Low => (IntensityLevel::Low, "Reduced intensity due to low readiness."),
        ReadinessCategory::Moderate => (
            IntensityLevel::Moderate,
            "Standard intensity based on readiness.",
        ),
        ReadinessCategory::High => (
            IntensityLevel::High,
            "Increased intensity due to high readiness.",
        ),
    };
    plan.notes.push(note.to_string());
    if trend.is_confidently_declining() {
        plan.notes.push("Readiness has been declining; loads reduced further.".to_string());
    }

    plan.id = adjusted_plan_id(&base_plan.id, readiness_score);
    plan.adjusted_from = Some(base_plan.id.clone());
    plan.readiness_adjustment = Some(readiness_score);
    plan.load_multiplier = Some(multiplier);
    plan.intensity = Some(intensity);
    plan.status = PlanStatus::Active;
    Ok(plan)
}

/// Whether a new readiness score warrants replacing the active plan
///
/// Plans without a recorded readiness are always replaced.
pub fn should_supersede(previous: &WorkoutPlan, new_score: f64, config: &FitnessConfig) -> bool {
    match previous.readiness_adjustment {
        Some(previous_score) => {
            (new_score - previous_score).abs() >= config.adjustment.material_change_threshold
        }
        None => true,
    }
}
