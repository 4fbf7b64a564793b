// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Strength load estimation (Epley)

use crate::constants::training::LOAD_INCREMENT_KG;
use crate::models::ExerciseLog;

/// Lookup key for matching exercise names across plans and logs
pub fn exercise_key(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Estimated one-rep max: `weight × (1 + reps / 30)`
///
/// A single rep is the weight itself. Non-positive or non-finite weights and
/// zero reps give no estimate.
pub fn estimate_e1rm(weight_kg: f64, reps: u32) -> Option<f64> {
    if !weight_kg.is_finite() || weight_kg <= 0.0 || reps == 0 {
        return None;
    }
    if reps == 1 {
        return Some(weight_kg);
    }
    Some(weight_kg * (1.0 + f64::from(reps) / 30.0))
}

/// Fraction of e1RM that can be lifted for `reps` reps (Epley inverse)
pub fn intensity_for_reps(reps: u32) -> f64 {
    if reps <= 1 {
        return 1.0;
    }
    1.0 / (1.0 + f64::from(reps) / 30.0)
}

/// Load for `reps` reps given an e1RM, rounded to the plate increment
pub fn load_for_reps(e1rm: f64, reps: u32) -> Option<f64> {
    if !e1rm.is_finite() || e1rm <= 0.0 || reps == 0 {
        return None;
    }
    Some(round_to_increment(e1rm * intensity_for_reps(reps)))
}

/// Round to the nearest 2.5 kg
pub fn round_to_increment(load_kg: f64) -> f64 {
    (load_kg / LOAD_INCREMENT_KG).round() * LOAD_INCREMENT_KG
}

/// Best e1RM across the sets of one exercise
pub fn best_e1rm(exercise: &ExerciseLog) -> Option<f64> {
    exercise
        .sets
        .iter()
        .filter_map(|set| estimate_e1rm(set.weight_kg, set.reps))
        .fold(None, |best: Option<f64>, e| Some(best.map_or(e, |b| b.max(e))))
}
