// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Data Models
//!
//! Core data structures shared by the trainer pipeline.
//!
//! ## Design Principles
//!
//! - **Validated at ingress**: payloads from providers and stores are parsed into
//!   these types once, so the core never handles untyped data
//! - **Serializable**: every model round-trips through JSON for the record stores
//! - **Append-only history**: readiness metrics and workout logs are never rewritten
//!
//! ## Core Models
//!
//! - [`UserProfile`]: the athlete and their preferences
//! - [`KnowledgeDocument`]: an embedded research document
//! - [`ReadinessMetrics`]: one nightly readiness snapshot per user and day
//! - [`WorkoutPlan`]: a 4-week progressive cycle of daily prescriptions
//! - [`WorkoutLog`]: completed sets, the input for future e1RM estimates

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Training experience used to pick plan templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FitnessLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl FitnessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitnessLevel::Beginner => "beginner",
            FitnessLevel::Intermediate => "intermediate",
            FitnessLevel::Advanced => "advanced",
        }
    }

    /// Parse a free-form level, falling back to intermediate
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl FromStr for FitnessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" | "novice" => Ok(FitnessLevel::Beginner),
            "intermediate" => Ok(FitnessLevel::Intermediate),
            "advanced" | "elite" => Ok(FitnessLevel::Advanced),
            other => Err(format!("unknown fitness level: {other}")),
        }
    }
}

impl fmt::Display for FitnessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Athlete profile created during onboarding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub name: String,
    pub age: u32,
    /// Height in centimeters
    pub height_cm: f64,
    /// Body weight in kilograms
    pub weight_kg: f64,
    #[serde(default)]
    pub fitness_level: FitnessLevel,
    #[serde(default)]
    pub goals: Option<String>,
    #[serde(default)]
    pub preferences: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        age: u32,
        height_cm: f64,
        weight_kg: f64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            age,
            height_cm,
            weight_kg,
            fitness_level: FitnessLevel::default(),
            goals: None,
            preferences: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_level(mut self, level: FitnessLevel) -> Self {
        self.fitness_level = level;
        self
    }

    pub fn with_goals(mut self, goals: impl Into<String>) -> Self {
        self.goals = Some(goals.into());
        self
    }
}

/// Explicit partial update for a [`UserProfile`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub fitness_level: Option<FitnessLevel>,
    pub goals: Option<String>,
    pub preferences: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.age.is_none()
            && self.height_cm.is_none()
            && self.weight_kg.is_none()
            && self.fitness_level.is_none()
            && self.goals.is_none()
            && self.preferences.is_none()
    }

    pub fn apply(self, profile: &mut UserProfile) {
        if let Some(name) = self.name {
            profile.name = name;
        }
        if let Some(age) = self.age {
            profile.age = age;
        }
        if let Some(height) = self.height_cm {
            profile.height_cm = height;
        }
        if let Some(weight) = self.weight_kg {
            profile.weight_kg = weight;
        }
        if let Some(level) = self.fitness_level {
            profile.fitness_level = level;
        }
        if let Some(goals) = self.goals {
            profile.goals = Some(goals);
        }
        if let Some(preferences) = self.preferences {
            profile.preferences = Some(preferences);
        }
    }
}

/// Research document stored with its embedding
///
/// The embedding always belongs to the content identified by `content_hash`;
/// any content change goes through the knowledge base repository, which
/// re-embeds before persisting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    pub date_added: NaiveDate,
    #[serde(default)]
    pub content_hash: String,
}

impl KnowledgeDocument {
    /// SHA-256 of the content, hex encoded
    pub fn hash_content(content: &str) -> String {
        let digest = Sha256::digest(content.as_bytes());
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Whether the stored embedding was computed from the current content
    pub fn embedding_is_current(&self) -> bool {
        !self.embedding.is_empty() && self.content_hash == Self::hash_content(&self.content)
    }
}

/// Nightly readiness snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessMetrics {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub hrv: Option<f64>,
    #[serde(default)]
    pub sleep_score: Option<f64>,
    #[serde(default)]
    pub recovery_score: Option<f64>,
    #[serde(default)]
    pub readiness_score: Option<f64>,
    /// Deviation from the personal baseline in °C
    #[serde(default)]
    pub temperature_deviation: Option<f64>,
    #[serde(default)]
    pub respiratory_rate: Option<f64>,
}

impl ReadinessMetrics {
    /// One snapshot per user per day shares this id
    pub fn metrics_id(user_id: &str, date: NaiveDate) -> String {
        format!("{user_id}_{date}")
    }

    pub fn new(user_id: &str, date: NaiveDate) -> Self {
        Self {
            id: Self::metrics_id(user_id, date),
            user_id: user_id.to_string(),
            date,
            hrv: None,
            sleep_score: None,
            recovery_score: None,
            readiness_score: None,
            temperature_deviation: None,
            respiratory_rate: None,
        }
    }
}

/// Push/pull/legs day focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayFocus {
    Push,
    Pull,
    Legs,
}

impl DayFocus {
    pub const ALL: [DayFocus; 3] = [DayFocus::Push, DayFocus::Pull, DayFocus::Legs];
}

impl fmt::Display for DayFocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayFocus::Push => f.write_str("push"),
            DayFocus::Pull => f.write_str("pull"),
            DayFocus::Legs => f.write_str("legs"),
        }
    }
}

/// Intensity label attached to an adjusted plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntensityLevel {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    #[default]
    Active,
    Superseded,
}

/// A single exercise prescription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub exercise: String,
    pub sets: u32,
    pub reps: u32,
    /// Fraction of e1RM (0.0-1.0)
    pub intensity_pct: f64,
    /// Load in kilograms, known once an e1RM exists for the exercise
    #[serde(default)]
    pub target_load: Option<f64>,
    /// Original movement when a lower-fatigue substitute was prescribed
    #[serde(default)]
    pub substituted_from: Option<String>,
}

/// One training day of a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDay {
    pub week: u32,
    pub day: u32,
    pub focus: DayFocus,
    pub prescriptions: Vec<Prescription>,
}

impl PlanDay {
    /// Reference used by workout logs, e.g. `w2d3`
    pub fn key(&self) -> String {
        format!("w{}d{}", self.week, self.day)
    }
}

/// A 4-week progressive training cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutPlan {
    pub id: String,
    pub user_id: String,
    pub goal: String,
    pub fitness_level: FitnessLevel,
    pub start_date: NaiveDate,
    pub days: Vec<PlanDay>,
    /// Readiness score the plan was adjusted for
    #[serde(default)]
    pub readiness_adjustment: Option<f64>,
    /// Load multiplier applied by the adjustment
    #[serde(default)]
    pub load_multiplier: Option<f64>,
    #[serde(default)]
    pub intensity: Option<IntensityLevel>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub status: PlanStatus,
    #[serde(default)]
    pub adjusted_from: Option<String>,
}

impl WorkoutPlan {
    pub const WEEKS: u32 = 4;

    pub fn end_date(&self) -> NaiveDate {
        self.start_date + Duration::days(i64::from(Self::WEEKS) * 7 - 1)
    }

    pub fn week(&self, week: u32) -> impl Iterator<Item = &PlanDay> {
        self.days.iter().filter(move |d| d.week == week)
    }

    pub fn day(&self, key: &str) -> Option<&PlanDay> {
        self.days.iter().find(|d| d.key() == key)
    }
}

/// One performed set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetLog {
    pub reps: u32,
    pub weight_kg: f64,
    #[serde(default)]
    pub rpe: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseLog {
    pub name: String,
    pub sets: Vec<SetLog>,
}

/// A completed workout, linked to the plan day it fulfils
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutLog {
    pub id: String,
    pub user_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub plan_id: Option<String>,
    #[serde(default)]
    pub plan_day: Option<String>,
    pub exercises: Vec<ExerciseLog>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl WorkoutLog {
    pub fn new(user_id: impl Into<String>, date: NaiveDate, exercises: Vec<ExerciseLog>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            date,
            plan_id: None,
            plan_day: None,
            exercises,
            duration_minutes: None,
            notes: None,
        }
    }

    pub fn for_plan_day(mut self, plan_id: impl Into<String>, plan_day: impl Into<String>) -> Self {
        self.plan_id = Some(plan_id.into());
        self.plan_day = Some(plan_day.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fitness_level_parsing() {
        assert_eq!("Beginner".parse::<FitnessLevel>().unwrap(), FitnessLevel::Beginner);
        assert_eq!(FitnessLevel::parse_lenient("elite"), FitnessLevel::Advanced);
        assert_eq!(FitnessLevel::parse_lenient("weekend warrior"), FitnessLevel::Intermediate);
    }

    #[test]
    fn test_profile_update_applies_only_set_fields() {
        let mut profile = UserProfile::new("u1", "Sam", 30, 180.0, 80.0);
        let update = ProfileUpdate {
            weight_kg: Some(78.5),
            goals: Some("strength".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
        update.apply(&mut profile);

        assert_eq!(profile.weight_kg, 78.5);
        assert_eq!(profile.goals.as_deref(), Some("strength"));
        assert_eq!(profile.name, "Sam");
        assert_eq!(profile.age, 30);
    }

    #[test]
    fn test_content_hash_tracks_content() {
        let mut doc = KnowledgeDocument {
            id: "d1".to_string(),
            title: "Sleep".to_string(),
            content: "Sleep matters".to_string(),
            embedding: vec![0.1, 0.2],
            category: None,
            source: None,
            date_added: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            content_hash: KnowledgeDocument::hash_content("Sleep matters"),
        };
        assert!(doc.embedding_is_current());
        assert_eq!(doc.content_hash.len(), 64);

        doc.content.push_str(" a lot");
        assert!(!doc.embedding_is_current());
    }

    #[test]
    fn test_metrics_id_is_per_user_and_day() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 5).unwrap();
        assert_eq!(ReadinessMetrics::metrics_id("alice", date), "alice_2025-05-05");
        assert_eq!(ReadinessMetrics::new("alice", date).id, "alice_2025-05-05");
    }

    #[test]
    fn test_plan_end_date_covers_four_weeks() {
        let plan = WorkoutPlan {
            id: "p".to_string(),
            user_id: "u".to_string(),
            goal: "hypertrophy".to_string(),
            fitness_level: FitnessLevel::Intermediate,
            start_date: NaiveDate::from_ymd_opt(2025, 5, 5).unwrap(),
            days: vec![],
            readiness_adjustment: None,
            load_multiplier: None,
            intensity: None,
            notes: vec![],
            status: PlanStatus::Active,
            adjusted_from: None,
        };
        assert_eq!(plan.end_date(), NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
    }
}
