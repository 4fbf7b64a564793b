// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Orchestrator
//!
//! Runs the readiness-driven planning pipeline:
//!
//! 1. fetch sleep, activity and readiness from the biometric provider
//! 2. score readiness and record one snapshot per day
//! 3. analyse readiness history and workout logs
//! 4. query the knowledge base and synthesise research
//! 5. generate the base plan and adjust it for readiness
//! 6. supersede the active plan only when readiness changed materially
//!
//! It also owns profile management and workout logging.

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::biometrics::{
    analyze_trends, calculate_readiness, BiometricSnapshot, ReadinessAssessment, TrendData,
};
use crate::config::fitness_config::FitnessConfig;
use crate::config::environment::RetryConfig;
use crate::config::{Config, ServiceConfig};
use crate::constants::limits;
use crate::errors::{ErrorKind, TrainerError, TrainerResult};
use crate::knowledge_base::{EmbeddingProvider, KnowledgeBaseRepository};
use crate::logging::AppLogger;
use crate::models::{
    PlanStatus, ProfileUpdate, ReadinessMetrics, UserProfile, WorkoutLog, WorkoutPlan,
};
use crate::openai::OpenAiClient;
use crate::providers::oura::OuraProvider;
use crate::providers::{BiometricProvider, DateRange, RetryPolicy};
use crate::research::{enrich_synthesis, LanguageModel, ResearchDocument, ResearchInsights};
use crate::storage::Stores;
use crate::training::progress::ProgressTracker;
use crate::training::{
    adjust_plan, attach_research_note, generate_base_plan, should_supersede, track_progress,
    ProgressSummary, ProgressUpdate,
};

/// Verified key points carried into a plan note when no narrative exists
const NOTE_KEY_POINTS: usize = 3;

/// External collaborators; any may be absent
#[derive(Clone, Default)]
pub struct Collaborators {
    pub provider: Option<Arc<dyn BiometricProvider>>,
    pub embedder: Option<Arc<dyn EmbeddingProvider>>,
    pub language_model: Option<Arc<dyn LanguageModel>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Deadline for one provider call, retries and backoff included
    pub provider_deadline: Duration,
    pub biometric_lookback_days: i64,
    pub history_days: i64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            provider_deadline: RetryPolicy::from(&RetryConfig::default())
                .deadline(Duration::from_secs(limits::DEFAULT_REQUEST_TIMEOUT_SECS)),
            biometric_lookback_days: limits::DEFAULT_BIOMETRIC_LOOKBACK_DAYS,
            history_days: limits::DEFAULT_HISTORY_DAYS,
        }
    }
}

impl From<&ServiceConfig> for PipelineSettings {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            provider_deadline: RetryPolicy::from(&config.retry).deadline(config.request_timeout()),
            biometric_lookback_days: config.biometric_lookback_days,
            history_days: config.history_days,
        }
    }
}

/// Result of one planning run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub plan: WorkoutPlan,
    pub assessment: ReadinessAssessment,
    pub trend: TrendData,
    pub insights: ResearchInsights,
    /// Id of the plan this run superseded
    pub superseded: Option<String>,
    /// The active plan was kept because readiness barely moved
    pub reused: bool,
}

pub struct TrainerOrchestrator {
    stores: Stores,
    knowledge: KnowledgeBaseRepository,
    collaborators: Collaborators,
    fitness: FitnessConfig,
    settings: PipelineSettings,
}

impl TrainerOrchestrator {
    pub fn new(
        stores: Stores,
        fitness: FitnessConfig,
        collaborators: Collaborators,
        settings: PipelineSettings,
    ) -> Self {
        let knowledge = KnowledgeBaseRepository::new(
            Arc::clone(&stores.documents),
            collaborators.embedder.clone(),
            fitness.knowledge_base.clone(),
        );
        Self {
            stores,
            knowledge,
            collaborators,
            fitness,
            settings,
        }
    }

    /// Wire stores, Oura and OpenAI from configuration
    ///
    /// Missing credentials leave the corresponding collaborator unset.
    pub fn from_config(config: &Config) -> TrainerResult<Self> {
        let service = &config.service;

        let provider: Option<Arc<dyn BiometricProvider>> = match OuraProvider::from_config(service)
        {
            Ok(provider) => Some(Arc::new(provider)),
            Err(e) if e.kind() == ErrorKind::Configuration => {
                debug!(error = %e, "Biometric provider not configured");
                None
            }
            Err(e) => return Err(e),
        };

        let openai = OpenAiClient::from_config(service)?.map(Arc::new);
        let collaborators = Collaborators {
            provider,
            embedder: openai.clone().map(|c| c as Arc<dyn EmbeddingProvider>),
            language_model: openai.map(|c| c as Arc<dyn LanguageModel>),
        };

        Ok(Self::new(
            Stores::from_config(service),
            config.fitness.clone(),
            collaborators,
            PipelineSettings::from(service),
        ))
    }

    pub fn knowledge(&self) -> &KnowledgeBaseRepository {
        &self.knowledge
    }

    pub fn fitness_config(&self) -> &FitnessConfig {
        &self.fitness
    }

    // ---- Profiles ----

    /// # Errors
    ///
    /// A `Persistence` error when the user id is already taken
    pub async fn create_profile(&self, profile: UserProfile) -> TrainerResult<UserProfile> {
        if profile.user_id.trim().is_empty() {
            return Err(TrainerError::configuration("user id must not be empty"));
        }
        self.stores.profiles.insert(&profile).await?;
        info!(user.id = %profile.user_id, level = %profile.fitness_level, "Profile created");
        Ok(profile)
    }

    pub async fn get_profile(&self, user_id: &str) -> TrainerResult<Option<UserProfile>> {
        self.stores.profiles.get(user_id).await
    }

    /// Apply `update`; `None` when the profile does not exist
    pub async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> TrainerResult<Option<UserProfile>> {
        let Some(mut profile) = self.stores.profiles.get(user_id).await? else {
            return Ok(None);
        };
        if update.is_empty() {
            return Ok(Some(profile));
        }
        update.apply(&mut profile);
        self.stores.profiles.update(&profile).await?;
        info!(user.id = %user_id, "Profile updated");
        Ok(Some(profile))
    }

    pub async fn list_profiles(&self) -> TrainerResult<Vec<UserProfile>> {
        self.stores.profiles.list().await
    }

    async fn require_profile(&self, user_id: &str) -> TrainerResult<UserProfile> {
        self.stores
            .profiles
            .get(user_id)
            .await?
            .ok_or_else(|| TrainerError::configuration(format!("no profile for user {user_id}")))
    }

    // ---- Biometrics ----

    fn provider(&self) -> TrainerResult<&Arc<dyn BiometricProvider>> {
        self.collaborators
            .provider
            .as_ref()
            .ok_or_else(|| TrainerError::configuration("no biometric provider configured"))
    }

    async fn with_timeout<T>(
        &self,
        what: &str,
        call: impl Future<Output = TrainerResult<T>>,
    ) -> TrainerResult<T> {
        match timeout(self.settings.provider_deadline, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) if e.kind() == ErrorKind::Provider => Err(e),
            Ok(Err(e)) => Err(TrainerError::provider(format!("{what}: {e}"))),
            Err(_) => Err(TrainerError::provider(format!(
                "{what} timed out after {:?}",
                self.settings.provider_deadline
            ))),
        }
    }

    /// Fetch the lookback window ending today
    pub async fn fetch_biometrics(&self, user_id: &str) -> TrainerResult<BiometricSnapshot> {
        let range = DateRange::ending_at(
            Utc::now().date_naive(),
            self.settings.biometric_lookback_days,
        );
        self.fetch_biometrics_for(user_id, range).await
    }

    /// Fetch sleep, activity and readiness concurrently, each under the provider deadline
    pub async fn fetch_biometrics_for(
        &self,
        user_id: &str,
        range: DateRange,
    ) -> TrainerResult<BiometricSnapshot> {
        let provider = self.provider()?;
        let started = Instant::now();

        let (sleep, activity, readiness) = tokio::join!(
            self.with_timeout("sleep", provider.get_sleep_data(user_id, range)),
            self.with_timeout("activity", provider.get_activity_data(user_id, range)),
            self.with_timeout("readiness", provider.get_readiness_data(user_id, range)),
        );
        let snapshot = BiometricSnapshot::from_records(sleep?, activity?, readiness?);

        AppLogger::log_pipeline_step(
            user_id,
            "fetch_biometrics",
            started.elapsed().as_millis() as u64,
        );
        Ok(snapshot)
    }

    /// Store the day's readiness unless one is already recorded
    ///
    /// Returns the stored snapshot for that day, new or existing.
    pub async fn record_readiness(
        &self,
        user_id: &str,
        date: NaiveDate,
        snapshot: &BiometricSnapshot,
        assessment: &ReadinessAssessment,
    ) -> TrainerResult<ReadinessMetrics> {
        let id = ReadinessMetrics::metrics_id(user_id, date);
        if let Some(existing) = self.stores.readiness.get(&id).await? {
            debug!(user.id = %user_id, %date, "Readiness already recorded for day");
            return Ok(existing);
        }

        let metrics = snapshot.to_metrics(user_id, date, assessment);
        match self.stores.readiness.insert(&metrics).await {
            Ok(()) => Ok(metrics),
            Err(TrainerError::AlreadyExists(_)) => {
                Ok(self.stores.readiness.get(&id).await?.unwrap_or(metrics))
            }
            Err(e) => Err(e),
        }
    }

    // ---- Research ----

    /// Knowledge base query, extraction, synthesis, verification and enrichment
    ///
    /// Knowledge base failures degrade to empty insights.
    pub async fn research_insights(&self, query: &str) -> ResearchInsights {
        let defaults = self.knowledge.defaults();
        let hits = match self
            .knowledge
            .query_by_text(query, defaults.top_k, defaults.min_score)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!(
                    query,
                    error = %e,
                    "Knowledge base query failed, continuing without research"
                );
                return ResearchInsights {
                    query: query.to_string(),
                    ..Default::default()
                };
            }
        };

        let documents: Vec<ResearchDocument> = hits
            .iter()
            .map(|hit| ResearchDocument::from_knowledge(&hit.document))
            .collect();
        let mut insights = ResearchInsights::from_documents(query, &documents);

        if let Some(model) = &self.collaborators.language_model {
            enrich_synthesis(model.as_ref(), query, &mut insights.synthesis).await;
        }
        debug!(query, documents = documents.len(), "Research insights ready");
        insights
    }

    // ---- Plans ----

    /// Most recently stored active plan of the user
    pub async fn active_plan(&self, user_id: &str) -> TrainerResult<Option<WorkoutPlan>> {
        Ok(self
            .stores
            .plans
            .list_for_owner(user_id)
            .await?
            .into_iter()
            .filter(|p| p.status == PlanStatus::Active)
            .last())
    }

    pub async fn list_plans(&self, user_id: &str) -> TrainerResult<Vec<WorkoutPlan>> {
        self.stores.plans.list_for_owner(user_id).await
    }

    /// Fetch today's biometrics and plan from them
    pub async fn generate_plan(&self, user_id: &str, goal: &str) -> TrainerResult<PlanOutcome> {
        let profile = self.require_profile(user_id).await?;
        let snapshot = self.fetch_biometrics(user_id).await?;
        let date = snapshot.day().unwrap_or_else(|| Utc::now().date_naive());
        self.plan_for_profile(&profile, goal, &snapshot, date).await
    }

    /// Plan from an already collected snapshot for `date`
    pub async fn plan_from_snapshot(
        &self,
        user_id: &str,
        goal: &str,
        snapshot: &BiometricSnapshot,
        date: NaiveDate,
    ) -> TrainerResult<PlanOutcome> {
        let profile = self.require_profile(user_id).await?;
        self.plan_for_profile(&profile, goal, snapshot, date).await
    }

    async fn plan_for_profile(
        &self,
        profile: &UserProfile,
        goal: &str,
        snapshot: &BiometricSnapshot,
        date: NaiveDate,
    ) -> TrainerResult<PlanOutcome> {
        let user_id = profile.user_id.as_str();
        let started = Instant::now();

        let assessment = calculate_readiness(snapshot, &self.fitness.readiness)?;
        self.record_readiness(user_id, date, snapshot, &assessment).await?;
        AppLogger::log_pipeline_step(user_id, "readiness", started.elapsed().as_millis() as u64);

        let since = date - ChronoDuration::days(self.settings.history_days.max(1) - 1);
        let history: Vec<ReadinessMetrics> = self
            .stores
            .readiness
            .list_for_owner(user_id)
            .await?
            .into_iter()
            .filter(|m| m.date >= since && m.date <= date)
            .collect();
        let logs = self.stores.logs.list_for_owner(user_id).await?;
        let trend = analyze_trends(&history, &logs, &self.fitness.trends);
        AppLogger::log_pipeline_step(user_id, "history", started.elapsed().as_millis() as u64);

        let query = format!("{goal} training for {} lifters", profile.fitness_level);
        let insights = self.research_insights(&query).await;
        AppLogger::log_pipeline_step(user_id, "research", started.elapsed().as_millis() as u64);

        let active = self.active_plan(user_id).await?;
        if let Some(active) = &active {
            let same_goal = active.goal.eq_ignore_ascii_case(goal.trim());
            let in_cycle = date <= active.end_date();
            if same_goal && in_cycle && !should_supersede(active, assessment.score, &self.fitness) {
                AppLogger::log_plan_decision(user_id, &active.id, assessment.score, None);
                return Ok(PlanOutcome {
                    plan: active.clone(),
                    assessment,
                    trend,
                    insights,
                    superseded: None,
                    reused: true,
                });
            }
        }

        let mut base = generate_base_plan(profile, goal, date);
        if let Some(note) = research_note(&insights) {
            attach_research_note(&mut base, &note);
        }
        let mut plan = adjust_plan(&base, assessment.score, &trend, &self.fitness)?;
        plan.id = self.unused_plan_id(&plan.id).await?;

        let mut superseded = None;
        if let Some(mut previous) = active {
            previous.status = PlanStatus::Superseded;
            if !self.stores.plans.update(&previous).await? {
                return Err(TrainerError::persistence(format!(
                    "active plan {} vanished before it could be superseded",
                    previous.id
                )));
            }
            superseded = Some(previous.id);
        }
        self.stores.plans.insert(&plan).await?;

        AppLogger::log_plan_decision(user_id, &plan.id, assessment.score, superseded.as_deref());
        AppLogger::log_pipeline_step(user_id, "plan", started.elapsed().as_millis() as u64);

        Ok(PlanOutcome {
            plan,
            assessment,
            trend,
            insights,
            superseded,
            reused: false,
        })
    }

    /// `id`, or the first free `{id}-v{n}` when a plan already holds it
    ///
    /// Stored plans are never overwritten, so a superseded plan keeps its record.
    async fn unused_plan_id(&self, id: &str) -> TrainerResult<String> {
        if self.stores.plans.get(id).await?.is_none() {
            return Ok(id.to_string());
        }
        let mut revision = 2;
        loop {
            let candidate = format!("{id}-v{revision}");
            if self.stores.plans.get(&candidate).await?.is_none() {
                return Ok(candidate);
            }
            revision += 1;
        }
    }

    // ---- Workouts ----

    /// Append a workout log and compute what it earned
    pub async fn log_workout(&self, log: WorkoutLog) -> TrainerResult<ProgressUpdate> {
        self.require_profile(&log.user_id).await?;
        if log.exercises.is_empty() {
            return Err(TrainerError::generation("a workout log needs at least one exercise"));
        }
        if let Some(plan_id) = &log.plan_id {
            if self.stores.plans.get(plan_id).await?.is_none() {
                warn!(
                    user.id = %log.user_id,
                    plan.id = %plan_id,
                    "Workout references an unknown plan"
                );
            }
        }

        let previous = self.stores.logs.list_for_owner(&log.user_id).await?;
        self.stores.logs.insert(&log).await?;
        let update = track_progress(&previous, &log);

        info!(
            user.id = %log.user_id,
            log.id = %log.id,
            points = update.points_earned,
            prs = update.personal_records.len(),
            badges = ?update.new_badges,
            "Workout logged"
        );
        Ok(update)
    }

    pub async fn progress_summary(&self, user_id: &str) -> TrainerResult<ProgressSummary> {
        let logs = self.stores.logs.list_for_owner(user_id).await?;
        Ok(ProgressTracker::replay(&logs).summary().clone())
    }
}

/// Narrative when available, else the first verified key points
fn research_note(insights: &ResearchInsights) -> Option<String> {
    if let Some(narrative) = &insights.synthesis.narrative {
        return Some(narrative.clone());
    }
    let points: Vec<&str> = insights
        .verified_key_points()
        .into_iter()
        .take(NOTE_KEY_POINTS)
        .collect();
    (!points.is_empty()).then(|| points.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ReadinessRecord, SleepRecord};
    use tempfile::TempDir;

    fn orchestrator(dir: &TempDir) -> TrainerOrchestrator {
        TrainerOrchestrator::new(
            Stores::local(dir.path()),
            FitnessConfig::default(),
            Collaborators::default(),
            PipelineSettings::default(),
        )
    }

    fn snapshot(score: f64) -> BiometricSnapshot {
        BiometricSnapshot {
            sleep: vec![SleepRecord::default()],
            activity: vec![],
            readiness: ReadinessRecord {
                score: Some(score),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_profile_lifecycle() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(&dir);

        orchestrator
            .create_profile(UserProfile::new("u1", "Sam", 30, 180.0, 80.0))
            .await
            .unwrap();
        assert!(orchestrator
            .create_profile(UserProfile::new("u1", "Dup", 30, 180.0, 80.0))
            .await
            .is_err());

        let update = ProfileUpdate {
            weight_kg: Some(82.5),
            ..Default::default()
        };
        let updated = orchestrator.update_profile("u1", update).await.unwrap().unwrap();
        assert_eq!(updated.weight_kg, 82.5);
        assert_eq!(orchestrator.get_profile("u1").await.unwrap(), Some(updated));
        assert!(orchestrator
            .update_profile("ghost", ProfileUpdate::default())
            .await
            .unwrap()
            .is_none());
        assert_eq!(orchestrator.list_profiles().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_profile_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let err = orchestrator(&dir)
            .plan_from_snapshot("ghost", "strength", &snapshot(80.0), date)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_no_provider_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let err = orchestrator(&dir).fetch_biometrics("u1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_research_without_embedder_is_empty() {
        let dir = TempDir::new().unwrap();
        let insights = orchestrator(&dir).research_insights("sleep").await;
        assert!(insights.is_empty());
        assert_eq!(insights.query, "sleep");
    }

    #[tokio::test]
    async fn test_readiness_recorded_once_per_day() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(&dir);
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let config = FitnessConfig::default();

        let first = snapshot(80.0);
        let assessment = calculate_readiness(&first, &config.readiness).unwrap();
        orchestrator.record_readiness("u1", date, &first, &assessment).await.unwrap();

        let second = snapshot(40.0);
        let assessment = calculate_readiness(&second, &config.readiness).unwrap();
        let stored = orchestrator.record_readiness("u1", date, &second, &assessment).await.unwrap();

        assert_eq!(stored.readiness_score, Some(80.0));
        assert_eq!(orchestrator.stores.readiness.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_readiness_rebound_gets_a_new_plan_revision() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(&dir);
        orchestrator
            .create_profile(UserProfile::new("u1", "Sam", 30, 180.0, 80.0))
            .await
            .unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();

        let mut ids = Vec::new();
        for score in [80.0, 60.0, 80.0] {
            let outcome = orchestrator
                .plan_from_snapshot("u1", "strength", &snapshot(score), date)
                .await
                .unwrap();
            assert!(!outcome.reused);
            ids.push(outcome.plan.id);
        }
        assert_eq!(ids[0], "u1-strength-2025-06-02-r0800");
        assert_eq!(ids[1], "u1-strength-2025-06-02-r0600");
        assert_eq!(ids[2], "u1-strength-2025-06-02-r0800-v2");

        let plans = orchestrator.list_plans("u1").await.unwrap();
        assert_eq!(plans.len(), 3);
        let superseded: Vec<&str> = plans
            .iter()
            .filter(|p| p.status == PlanStatus::Superseded)
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(superseded, vec![ids[0].as_str(), ids[1].as_str()]);
        let active = orchestrator.active_plan("u1").await.unwrap().unwrap();
        assert_eq!(active.id, ids[2]);
    }

    #[test]
    fn test_provider_deadline_leaves_room_for_retries() {
        let defaults = PipelineSettings::default();
        let per_attempt = Duration::from_secs(limits::DEFAULT_REQUEST_TIMEOUT_SECS);
        assert!(defaults.provider_deadline > per_attempt * (limits::DEFAULT_MAX_RETRIES + 1));

        let mut service = ServiceConfig::default();
        service.timeouts.request_timeout_secs = 10;
        service.retry = RetryConfig {
            max_retries: 2,
            base_delay_ms: 100,
        };
        let settings = PipelineSettings::from(&service);
        assert_eq!(settings.provider_deadline, Duration::from_millis(30_300));
    }

    #[test]
    fn test_research_note_prefers_narrative() {
        let mut insights = ResearchInsights::default();
        assert_eq!(research_note(&insights), None);
        insights.synthesis.narrative = Some("Sleep more.".into());
        assert_eq!(research_note(&insights).as_deref(), Some("Sleep more."));
    }
}
