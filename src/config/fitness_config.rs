// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Coaching parameters: readiness weighting, adjustment bands, trend analysis
//! and knowledge base defaults

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{knowledge, service};

/// Main fitness configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FitnessConfig {
    pub readiness: ReadinessConfig,
    pub adjustment: AdjustmentConfig,
    pub trends: TrendConfig,
    pub knowledge_base: KnowledgeBaseConfig,
    /// High-fatigue movement -> lower-fatigue substitute
    pub substitutions: SubstitutionConfig,
}

/// Readiness component weights and score bands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub provider_weight: f64,
    pub sleep_weight: f64,
    pub hrv_weight: f64,
    /// Temperature deviation (°C) tolerated without penalty
    pub temperature_tolerance: f64,
    pub temperature_penalty_per_degree: f64,
    pub max_temperature_penalty: f64,
    /// Scores below this are "low"
    pub low_threshold: f64,
    /// Scores above this are "high"
    pub high_threshold: f64,
}

/// Load multipliers per readiness band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentConfig {
    pub low_load_multiplier: f64,
    pub moderate_load_multiplier: f64,
    pub high_load_multiplier: f64,
    /// Extra multiplier applied on a confident declining readiness trend
    pub declining_trend_multiplier: f64,
    /// Readiness points that must change before a plan is superseded
    pub material_change_threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub window: usize,
    /// Slope magnitude (points per entry) still considered stable
    pub stability_tolerance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseConfig {
    pub top_k: usize,
    pub min_score: f32,
    pub chunk_words: usize,
    pub chunk_overlap: usize,
}

/// Case-insensitive movement substitution table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubstitutionConfig(pub BTreeMap<String, String>);

impl SubstitutionConfig {
    pub fn substitute_for(&self, exercise: &str) -> Option<&str> {
        let wanted = exercise.trim();
        self.0
            .iter()
            .find(|(from, _)| from.eq_ignore_ascii_case(wanted))
            .map(|(_, to)| to.as_str())
    }
}

impl FitnessConfig {
    /// Load from an explicit path, the config dir, the working dir, or defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(config_path) = path {
            return Self::load_from_file(config_path);
        }

        for candidate in Self::candidate_paths() {
            if candidate.exists() {
                return Self::load_from_file(&candidate);
            }
        }

        Ok(Self::default())
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(dir) = dirs::config_dir() {
            paths.push(
                dir.join(service::CONFIG_DIR_NAME)
                    .join(service::FITNESS_CONFIG_FILE_NAME),
            );
        }
        paths.push(PathBuf::from(service::FITNESS_CONFIG_FILE_NAME));
        paths
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read fitness config file: {}", path.display()))?;

        let config: FitnessConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse fitness config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let r = &self.readiness;
        let weights = [r.provider_weight, r.sleep_weight, r.hrv_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            bail!("readiness weights must be finite and non-negative");
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            bail!("at least one readiness weight must be positive");
        }
        if !(0.0..=100.0).contains(&r.low_threshold)
            || !(0.0..=100.0).contains(&r.high_threshold)
            || r.low_threshold >= r.high_threshold
        {
            bail!(
                "readiness bands must satisfy 0 <= low ({}) < high ({}) <= 100",
                r.low_threshold,
                r.high_threshold
            );
        }

        let a = &self.adjustment;
        let multipliers = [
            a.low_load_multiplier,
            a.moderate_load_multiplier,
            a.high_load_multiplier,
            a.declining_trend_multiplier,
        ];
        if multipliers.iter().any(|m| !m.is_finite() || *m <= 0.0) {
            bail!("load multipliers must be positive");
        }
        if !a.material_change_threshold.is_finite() || a.material_change_threshold < 0.0 {
            bail!("material_change_threshold must be non-negative");
        }

        if self.trends.window < 2 {
            bail!("trend window must cover at least two entries");
        }

        let kb = &self.knowledge_base;
        if kb.top_k == 0 {
            bail!("knowledge_base.top_k must be at least 1");
        }
        if !kb.min_score.is_finite() || !(-1.0..=1.0).contains(&kb.min_score) {
            bail!("knowledge_base.min_score must lie within [-1, 1]");
        }
        if kb.chunk_words == 0 {
            bail!("knowledge_base.chunk_words must be at least 1");
        }

        Ok(())
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            provider_weight: 0.5,
            sleep_weight: 0.3,
            hrv_weight: 0.2,
            temperature_tolerance: 0.5,
            temperature_penalty_per_degree: 10.0,
            max_temperature_penalty: 15.0,
            low_threshold: 60.0,
            high_threshold: 85.0,
        }
    }
}

impl Default for AdjustmentConfig {
    fn default() -> Self {
        Self {
            low_load_multiplier: 0.90,
            moderate_load_multiplier: 1.00,
            high_load_multiplier: 1.05,
            declining_trend_multiplier: 0.975,
            material_change_threshold: 5.0,
        }
    }
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            window: 7,
            stability_tolerance: 0.5,
        }
    }
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            top_k: knowledge::DEFAULT_TOP_K,
            min_score: knowledge::DEFAULT_MIN_SCORE,
            chunk_words: knowledge::DEFAULT_CHUNK_WORDS,
            chunk_overlap: knowledge::DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl Default for SubstitutionConfig {
    fn default() -> Self {
        let pairs = [
            ("Back Squat", "Goblet Squat"),
            ("Front Squat", "Goblet Squat"),
            ("Deadlift", "Romanian Deadlift"),
            ("Barbell Bench Press", "Dumbbell Bench Press"),
            ("Overhead Press", "Seated Dumbbell Press"),
            ("Barbell Row", "Chest-Supported Row"),
            ("Pull-up", "Lat Pulldown"),
            ("Weighted Pull-up", "Lat Pulldown"),
            ("Weighted Dip", "Triceps Pushdown"),
            ("Walking Lunge", "Leg Press"),
            ("Bulgarian Split Squat", "Leg Press"),
        ];
        Self(
            pairs
                .iter()
                .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_fitness_config() {
        let config = FitnessConfig::default();

        assert_eq!(config.readiness.provider_weight, 0.5);
        assert_eq!(config.readiness.low_threshold, 60.0);
        assert_eq!(config.readiness.high_threshold, 85.0);
        assert_eq!(config.adjustment.material_change_threshold, 5.0);
        assert_eq!(config.trends.window, 7);
        assert_eq!(config.knowledge_base.top_k, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_substitution_lookup_ignores_case() {
        let config = FitnessConfig::default();

        assert_eq!(config.substitutions.substitute_for("back squat"), Some("Goblet Squat"));
        assert_eq!(config.substitutions.substitute_for("Deadlift "), Some("Romanian Deadlift"));
        assert_eq!(config.substitutions.substitute_for("Face Pull"), None);
    }

    #[test]
    fn test_invalid_bands_rejected() {
        let mut config = FitnessConfig::default();
        config.readiness.low_threshold = 90.0;
        assert!(config.validate().is_err());

        let mut config = FitnessConfig::default();
        config.readiness.provider_weight = 0.0;
        config.readiness.sleep_weight = 0.0;
        config.readiness.hrv_weight = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_config_file_loading() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(
            temp_file,
            r#"
[readiness]
low_threshold = 55.0

[adjustment]
material_change_threshold = 3.0

[knowledge_base]
top_k = 8
min_score = 0.6

[substitutions]
"Back Squat" = "Box Squat"
        "#
        )?;

        let config = FitnessConfig::load_from_file(temp_file.path())?;

        assert_eq!(config.readiness.low_threshold, 55.0);
        assert_eq!(config.readiness.high_threshold, 85.0);
        assert_eq!(config.adjustment.material_change_threshold, 3.0);
        assert_eq!(config.knowledge_base.top_k, 8);
        assert_eq!(config.trends.window, 7);
        assert_eq!(config.substitutions.substitute_for("back squat"), Some("Box Squat"));
        assert_eq!(config.substitutions.substitute_for("Deadlift"), None);

        Ok(())
    }
}
