// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Personal AI Trainer
//!
//! A fitness-coaching pipeline that turns nightly biometric readiness,
//! workout history and a research knowledge base into an adjusted
//! multi-week training plan.
//!
//! ## Features
//!
//! - **Readiness scoring**: Oura sleep, activity and readiness data combined into one 0-100 score
//! - **Trend analysis**: rolling readiness trends and per-exercise e1RM estimates
//! - **Plan adjustment**: 4-week push/pull/legs plans scaled by readiness band
//! - **Knowledge base**: embedded research documents with cosine similarity search
//! - **Resilient storage**: SQLite with automatic fallback to local JSON files
//!
//! ## Architecture
//!
//! - **Providers**: biometric provider trait and the Oura v2 client
//! - **Knowledge base**: embedding seam, similarity engine and document repository
//! - **Biometrics / Training**: pure readiness, trend, plan and progress logic
//! - **Research**: extraction, synthesis and verification of knowledge base hits
//! - **Orchestrator**: the end-to-end planning pipeline
//! - **Storage**: record stores over SQLite and local JSON
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use personal_ai_trainer::config::Config;
//! use personal_ai_trainer::orchestrator::TrainerOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let trainer = TrainerOrchestrator::from_config(&config)?;
//!
//!     let outcome = trainer.generate_plan("alice", "hypertrophy").await?;
//!     println!("Plan {} at readiness {:.0}", outcome.plan.id, outcome.assessment.score);
//!
//!     Ok(())
//! }
//! ```

/// Biometric provider trait and Oura client
pub mod providers;

/// Common data models
pub mod models;

/// Configuration management and persistence
pub mod config;

/// Application constants and configuration values
pub mod constants;

/// Error types shared by the core
pub mod errors;

/// SQLite persistence
pub mod database;

/// Record stores with local fallback
pub mod storage;

/// Research documents, embeddings and similarity search
pub mod knowledge_base;

/// Readiness scoring and trend analysis
pub mod biometrics;

/// Plan generation, adjustment, loads and progress
pub mod training;

/// Research extraction, synthesis and verification
pub mod research;

/// OpenAI embeddings and chat completions
pub mod openai;

/// End-to-end planning pipeline
pub mod orchestrator;

/// Production logging and structured output
pub mod logging;
