// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Constants Module
//!
//! Application constants and environment-based defaults.

/// Service identity
pub mod service {
    pub const SERVICE_NAME: &str = "personal-ai-trainer";

    pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Directory name under the platform config dir
    pub const CONFIG_DIR_NAME: &str = "personal-ai-trainer";

    pub const CONFIG_FILE_NAME: &str = "config.toml";

    pub const FITNESS_CONFIG_FILE_NAME: &str = "fitness_config.toml";
}

/// Environment-based configuration
pub mod env_config {
    use std::env;

    /// SQLite URL of the primary store
    pub fn database_url() -> Option<String> {
        env::var("DATABASE_URL").ok()
    }

    pub fn oura_api_token() -> Option<String> {
        env::var("OURA_API_TOKEN").ok()
    }

    pub fn oura_api_base() -> String {
        env::var("OURA_API_BASE").unwrap_or_else(|_| super::endpoints::OURA_API_BASE.to_string())
    }

    pub fn openai_api_key() -> Option<String> {
        env::var("OPENAI_API_KEY").ok()
    }

    pub fn openai_api_base() -> String {
        env::var("OPENAI_API_BASE")
            .unwrap_or_else(|_| super::endpoints::OPENAI_API_BASE.to_string())
    }

    /// Default user for CLI commands that omit `--user`
    pub fn default_user_id() -> Option<String> {
        env::var("TRAINER_USER_ID").ok()
    }
}

/// External API endpoints
pub mod endpoints {
    pub const OURA_API_BASE: &str = "https://api.ouraring.com/v2/usercollection/";

    pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1/";

    pub const OURA_DAILY_SLEEP: &str = "daily_sleep";
    pub const OURA_DAILY_ACTIVITY: &str = "daily_activity";
    pub const OURA_DAILY_READINESS: &str = "daily_readiness";

    pub const OPENAI_EMBEDDINGS: &str = "embeddings";
    pub const OPENAI_CHAT_COMPLETIONS: &str = "chat/completions";
}

/// Model names and dimensions
pub mod models {
    pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

    pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;

    pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
}

/// Timeouts and retry policy
pub mod limits {
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

    pub const DEFAULT_STORAGE_TIMEOUT_SECS: u64 = 5;

    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;

    /// Days of biometric history fetched per pipeline run
    pub const DEFAULT_BIOMETRIC_LOOKBACK_DAYS: i64 = 7;

    /// Days of readiness history used for trends
    pub const DEFAULT_HISTORY_DAYS: i64 = 28;
}

/// Storage collection names
pub mod collections {
    pub const DOCUMENTS: &str = "knowledge_documents";
    pub const PROFILES: &str = "user_profiles";
    pub const READINESS: &str = "readiness_metrics";
    pub const PLANS: &str = "workout_plans";
    pub const WORKOUT_LOGS: &str = "workout_logs";
}

/// Knowledge base defaults
pub mod knowledge {
    pub const DEFAULT_TOP_K: usize = 5;

    pub const DEFAULT_MIN_SCORE: f32 = 0.7;

    pub const DEFAULT_CHUNK_WORDS: usize = 500;

    pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

    pub const CATEGORY_EXERCISE_SCIENCE: &str = "exercise science";
    pub const CATEGORY_RECOVERY: &str = "recovery";
    pub const CATEGORY_NUTRITION: &str = "nutrition";
    pub const CATEGORY_OTHER: &str = "other";
}

/// Training progression constants
pub mod training {
    /// Plate increment used when rounding prescribed loads
    pub const LOAD_INCREMENT_KG: f64 = 2.5;

    pub const DAYS_PER_WEEK: u32 = 3;

    /// Weekly (sets, reps, intensity modifier)
    pub const WEEKLY_PROGRESSION: [(u32, u32, f64); 4] =
        [(3, 10, 0.95), (3, 10, 1.00), (4, 8, 1.02), (3, 12, 0.90)];
}

/// Gamification points and badge ids
pub mod progress {
    pub const POINTS_PER_WORKOUT: u32 = 10;

    pub const POINTS_PER_PR: u32 = 50;

    pub const CONSISTENCY_DAYS: usize = 3;

    pub const STRENGTH_MILESTONE_POINTS: u32 = 500;

    pub const BADGE_FIRST_WORKOUT: &str = "first_workout";
    pub const BADGE_FIRST_PR: &str = "first_pr";
    pub const BADGE_CONSISTENCY_WEEK: &str = "consistency_1_week";
    pub const BADGE_STRENGTH_MILESTONE: &str = "strength_milestone_1";
}
