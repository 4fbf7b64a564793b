// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use personal_ai_trainer::biometrics::BiometricSnapshot;
use personal_ai_trainer::config::Config;
use personal_ai_trainer::knowledge_base::NewDocument;
use personal_ai_trainer::logging::LoggingConfig;
use personal_ai_trainer::models::{
    ExerciseLog, FitnessLevel, ProfileUpdate, SetLog, UserProfile, WorkoutLog, WorkoutPlan,
};
use personal_ai_trainer::orchestrator::{PlanOutcome, TrainerOrchestrator};
use personal_ai_trainer::training::progress::badge_description;

#[derive(Parser, Debug)]
#[command(name = "personal-ai-trainer")]
#[command(author, version, about = "Readiness-driven workout planning", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage athlete profiles
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Generate and inspect workout plans
    #[command(subcommand)]
    Plan(PlanCommand),
    /// Log a completed workout
    Log(LogArgs),
    /// Show points, records and badges
    Progress {
        #[arg(long)]
        user_id: String,
    },
    /// Query the knowledge base for research insights
    Research {
        query: String,
    },
    /// Manage knowledge base documents
    #[command(subcommand)]
    Kb(KbCommand),
    /// Show or write the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
struct ProfileFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    age: Option<u32>,
    /// Height in centimeters
    #[arg(long)]
    height: Option<f64>,
    /// Weight in kilograms
    #[arg(long)]
    weight: Option<f64>,
    /// beginner, intermediate or advanced
    #[arg(long)]
    level: Option<String>,
    #[arg(long)]
    goals: Option<String>,
    #[arg(long)]
    preferences: Option<String>,
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    Create {
        #[arg(long)]
        user_id: String,
        #[command(flatten)]
        fields: ProfileFields,
    },
    Show {
        #[arg(long)]
        user_id: String,
    },
    Update {
        #[arg(long)]
        user_id: String,
        #[command(flatten)]
        fields: ProfileFields,
    },
    List,
}

#[derive(Subcommand, Debug)]
enum PlanCommand {
    /// Run the planning pipeline
    Generate {
        #[arg(long)]
        user_id: String,
        #[arg(long, default_value = "general fitness")]
        goal: String,
        /// Biometric JSON ({sleep, activity, readiness}) instead of the provider
        #[arg(long)]
        biometrics: Option<PathBuf>,
        /// Plan date for --biometrics (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show the active plan
    Show {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        week: Option<u32>,
    },
    /// List all plans, superseded included
    History {
        #[arg(long)]
        user_id: String,
    },
}

#[derive(Args, Debug)]
struct LogArgs {
    #[arg(long)]
    user_id: String,
    /// Exercise as `Name:REPSxKG[@RPE],...`, e.g. `Back Squat:5x100,5x102.5@8`
    #[arg(long = "exercise", required = true)]
    exercises: Vec<String>,
    #[arg(long)]
    date: Option<NaiveDate>,
    #[arg(long)]
    plan_id: Option<String>,
    /// Plan day key, e.g. w1d2
    #[arg(long)]
    plan_day: Option<String>,
    #[arg(long)]
    duration: Option<u32>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Subcommand, Debug)]
enum KbCommand {
    /// Add one document
    Add {
        #[arg(long)]
        title: String,
        /// File with the document content
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        source: Option<String>,
    },
    /// Chunk, categorise and add a long text
    Ingest {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        source: Option<String>,
    },
    List,
    Delete {
        id: String,
    },
    /// Similarity search
    Search {
        query: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        min_score: Option<f32>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    Show,
    /// Write the effective configuration to the config file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    LoggingConfig::from_env().verbose(cli.verbose).init()?;

    let config = Config::load(cli.config.as_deref())?;
    info!(config = %config.service.summary(), "Configuration loaded");

    if let Command::Config(command) = &cli.command {
        return run_config(command, &config, cli.config.as_deref());
    }

    let trainer = TrainerOrchestrator::from_config(&config)?;
    let output = Output { json: cli.json };

    match cli.command {
        Command::Profile(command) => run_profile(&trainer, command, output).await,
        Command::Plan(command) => run_plan(&trainer, command, output).await,
        Command::Log(args) => run_log(&trainer, args, output).await,
        Command::Progress { user_id } => {
            let summary = trainer.progress_summary(&user_id).await?;
            output.emit(&summary, || {
                println!("Workouts: {}", summary.total_workouts);
                println!("Points:   {}", summary.total_points);
                println!("PRs:      {}", summary.total_prs);
                for badge in &summary.badges {
                    println!("Badge:    {badge} ({})", badge_description(badge));
                }
            })
        }
        Command::Research { query } => {
            let insights = trainer.research_insights(&query).await;
            output.emit(&insights, || {
                if insights.is_empty() {
                    println!("No matching research found.");
                    return;
                }
                println!("{}", insights.synthesis.summary);
                for point in &insights.synthesis.key_points {
                    println!("  - {point}");
                }
                if let Some(narrative) = &insights.synthesis.narrative {
                    println!("\n{narrative}");
                }
                for result in insights.verification.iter().filter(|r| !r.is_valid) {
                    println!("Unverified: {}", result.title);
                }
            })
        }
        Command::Kb(command) => run_kb(&trainer, command, output).await,
        Command::Config(_) => Ok(()),
    }
}

#[derive(Clone, Copy)]
struct Output {
    json: bool,
}

impl Output {
    fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce()) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human();
        }
        Ok(())
    }
}

fn run_config(command: &ConfigCommand, config: &Config, path: Option<&Path>) -> Result<()> {
    match command {
        ConfigCommand::Show => println!("{}", toml::to_string_pretty(config)?),
        ConfigCommand::Init => {
            config.save(path)?;
            let written = path.map(Path::to_path_buf).unwrap_or_else(Config::default_path);
            println!("Configuration written to {}", written.display());
        }
    }
    Ok(())
}

async fn run_profile(
    trainer: &TrainerOrchestrator,
    command: ProfileCommand,
    output: Output,
) -> Result<()> {
    match command {
        ProfileCommand::Create { user_id, fields } => {
            let (Some(name), Some(age), Some(height), Some(weight)) =
                (fields.name, fields.age, fields.height, fields.weight)
            else {
                bail!("--name, --age, --height and --weight are required to create a profile");
            };
            let level = fields
                .level
                .as_deref()
                .map(FitnessLevel::parse_lenient)
                .unwrap_or_default();
            let mut profile =
                UserProfile::new(user_id, name, age, height, weight).with_level(level);
            profile.goals = fields.goals;
            profile.preferences = fields.preferences;

            let profile = trainer.create_profile(profile).await?;
            output.emit(&profile, || println!("Created profile {}", profile.user_id))
        }
        ProfileCommand::Show { user_id } => {
            let profile = trainer
                .get_profile(&user_id)
                .await?
                .with_context(|| format!("no profile for {user_id}"))?;
            output.emit(&profile, || print_profile(&profile))
        }
        ProfileCommand::Update { user_id, fields } => {
            let level = fields
                .level
                .as_deref()
                .map(str::parse::<FitnessLevel>)
                .transpose()
                .map_err(anyhow::Error::msg)?;
            let update = ProfileUpdate {
                name: fields.name,
                age: fields.age,
                height_cm: fields.height,
                weight_kg: fields.weight,
                fitness_level: level,
                goals: fields.goals,
                preferences: fields.preferences,
            };
            let profile = trainer
                .update_profile(&user_id, update)
                .await?
                .with_context(|| format!("no profile for {user_id}"))?;
            output.emit(&profile, || print_profile(&profile))
        }
        ProfileCommand::List => {
            let profiles = trainer.list_profiles().await?;
            output.emit(&profiles, || {
                for profile in &profiles {
                    println!(
                        "{:<20} {:<24} {}",
                        profile.user_id, profile.name, profile.fitness_level
                    );
                }
            })
        }
    }
}

fn print_profile(profile: &UserProfile) {
    println!("{} ({})", profile.name, profile.user_id);
    println!("  age {}, {:.0} cm, {:.1} kg", profile.age, profile.height_cm, profile.weight_kg);
    println!("  level: {}", profile.fitness_level);
    if let Some(goals) = &profile.goals {
        println!("  goals: {goals}");
    }
}

async fn run_plan(
    trainer: &TrainerOrchestrator,
    command: PlanCommand,
    output: Output,
) -> Result<()> {
    match command {
        PlanCommand::Generate {
            user_id,
            goal,
            biometrics,
            date,
        } => {
            let outcome = match biometrics {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path)
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    let value: serde_json::Value = serde_json::from_str(&raw)
                        .with_context(|| format!("{} is not valid JSON", path.display()))?;
                    let snapshot = BiometricSnapshot::from_value(&value)?;
                    let date = date
                        .or_else(|| snapshot.day())
                        .unwrap_or_else(|| Utc::now().date_naive());
                    trainer.plan_from_snapshot(&user_id, &goal, &snapshot, date).await?
                }
                None => trainer.generate_plan(&user_id, &goal).await?,
            };
            output.emit(&outcome, || print_outcome(&outcome))
        }
        PlanCommand::Show { user_id, week } => {
            let plan = trainer
                .active_plan(&user_id)
                .await?
                .with_context(|| format!("no active plan for {user_id}"))?;
            output.emit(&plan, || print_plan(&plan, week))
        }
        PlanCommand::History { user_id } => {
            let plans = trainer.list_plans(&user_id).await?;
            output.emit(&plans, || {
                for plan in &plans {
                    let readiness = plan
                        .readiness_adjustment
                        .map(|r| format!("{r:.0}"))
                        .unwrap_or_else(|| "-".to_string());
                    println!("{:<48} {:?} readiness {readiness}", plan.id, plan.status);
                }
            })
        }
    }
}

fn print_outcome(outcome: &PlanOutcome) {
    println!(
        "Readiness {:.0} ({}), {:?} data",
        outcome.assessment.score, outcome.assessment.category, outcome.assessment.data_completeness
    );
    if outcome.reused {
        println!("Readiness changed little; keeping plan {}", outcome.plan.id);
        return;
    }
    if let Some(previous) = &outcome.superseded {
        println!("Superseded plan {previous}");
    }
    print_plan(&outcome.plan, Some(1));
}

fn print_plan(plan: &WorkoutPlan, week: Option<u32>) {
    println!("Plan {} ({} to {})", plan.id, plan.start_date, plan.end_date());
    for note in &plan.notes {
        println!("  note: {note}");
    }
    for day in plan.days.iter().filter(|d| week.map_or(true, |w| d.week == w)) {
        println!("\n{} - {}", day.key(), day.focus);
        for p in &day.prescriptions {
            let load = p
                .target_load
                .map(|l| format!("{l:.1} kg"))
                .unwrap_or_else(|| format!("{:.0}% e1RM", p.intensity_pct * 100.0));
            let swapped = p
                .substituted_from
                .as_ref()
                .map(|from| format!(" (instead of {from})"))
                .unwrap_or_default();
            println!("  {:<28} {}x{} @ {load}{swapped}", p.exercise, p.sets, p.reps);
        }
    }
}

/// Parse `Name:REPSxKG[@RPE],...`
fn parse_exercise(arg: &str) -> Result<ExerciseLog> {
    let (name, sets) = arg
        .rsplit_once(':')
        .with_context(|| format!("expected `Name:REPSxKG,...`, got `{arg}`"))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("exercise name is empty in `{arg}`");
    }

    let sets = sets
        .split(',')
        .map(|set| -> Result<SetLog> {
            let set = set.trim();
            let (volume, rpe) = match set.split_once('@') {
                Some((volume, rpe)) => (volume, Some(rpe.trim().parse::<f64>()?)),
                None => (set, None),
            };
            let (reps, weight) = volume
                .split_once(['x', 'X'])
                .with_context(|| format!("expected REPSxKG, got `{set}`"))?;
            Ok(SetLog {
                reps: reps.trim().parse()?,
                weight_kg: weight.trim().parse()?,
                rpe,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ExerciseLog {
        name: name.to_string(),
        sets,
    })
}

async fn run_log(trainer: &TrainerOrchestrator, args: LogArgs, output: Output) -> Result<()> {
    let exercises = args
        .exercises
        .iter()
        .map(|arg| parse_exercise(arg))
        .collect::<Result<Vec<_>>>()?;
    let date = args.date.unwrap_or_else(|| Utc::now().date_naive());

    let mut log = WorkoutLog::new(args.user_id, date, exercises);
    if let (Some(plan_id), Some(plan_day)) = (args.plan_id, args.plan_day) {
        log = log.for_plan_day(plan_id, plan_day);
    }
    log.duration_minutes = args.duration;
    log.notes = args.notes;

    let update = trainer.log_workout(log).await?;
    output.emit(&update, || {
        println!("Logged workout {} (+{} points)", update.log_id, update.points_earned);
        for exercise in &update.personal_records {
            println!("  New personal record: {exercise}");
        }
        for badge in &update.new_badges {
            println!("  Badge earned: {badge} ({})", badge_description(badge));
        }
        println!("Total points: {}", update.summary.total_points);
    })
}

async fn run_kb(trainer: &TrainerOrchestrator, command: KbCommand, output: Output) -> Result<()> {
    let kb = trainer.knowledge();
    match command {
        KbCommand::Add {
            title,
            file,
            category,
            source,
        } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let document = kb
                .add_document(NewDocument {
                    title,
                    content,
                    category,
                    source,
                    embedding: None,
                })
                .await?;
            output.emit(&document.id, || println!("Added document {}", document.id))
        }
        KbCommand::Ingest { file, source } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let documents = kb.ingest_text(&text, source).await?;
            let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
            output.emit(&ids, || println!("Ingested {} chunks", ids.len()))
        }
        KbCommand::List => {
            let documents = kb.list_documents().await?;
            let rows: Vec<(&str, &str, Option<&str>)> = documents
                .iter()
                .map(|d| (d.id.as_str(), d.title.as_str(), d.category.as_deref()))
                .collect();
            output.emit(&rows, || {
                for (id, title, category) in &rows {
                    println!("{id}  {title}  [{}]", category.unwrap_or("-"));
                }
            })
        }
        KbCommand::Delete { id } => {
            if !kb.delete_document(&id).await? {
                bail!("no document {id}");
            }
            output.emit(&id, || println!("Deleted {id}"))
        }
        KbCommand::Search {
            query,
            category,
            top_k,
            min_score,
        } => {
            let top_k = top_k.unwrap_or(kb.defaults().top_k);
            let hits = match category {
                Some(category) => kb.query_by_category(&query, &category, top_k).await?,
                None => {
                    let min_score = min_score.unwrap_or(kb.defaults().min_score);
                    kb.query_by_text(&query, top_k, min_score).await?
                }
            };
            let rows: Vec<(f32, &str, &str)> = hits
                .iter()
                .map(|h| (h.score, h.document.id.as_str(), h.document.title.as_str()))
                .collect();
            output.emit(&rows, || {
                for (score, id, title) in &rows {
                    println!("{score:.3}  {id}  {title}");
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exercise() {
        let exercise = parse_exercise("Back Squat:5x100, 3x110@8.5").unwrap();
        assert_eq!(exercise.name, "Back Squat");
        assert_eq!(exercise.sets.len(), 2);
        assert_eq!(exercise.sets[1].reps, 3);
        assert_eq!(exercise.sets[1].weight_kg, 110.0);
        assert_eq!(exercise.sets[1].rpe, Some(8.5));
    }

    #[test]
    fn test_parse_exercise_rejects_malformed() {
        assert!(parse_exercise("Back Squat").is_err());
        assert!(parse_exercise(":5x100").is_err());
        assert!(parse_exercise("Bench:5-100").is_err());
        assert!(parse_exercise("Bench:fivex100").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "personal-ai-trainer",
            "log",
            "--user-id",
            "u1",
            "--exercise",
            "Deadlift:5x140",
            "--date",
            "2025-06-02",
        ])
        .unwrap();
        match cli.command {
            Command::Log(args) => {
                assert_eq!(args.exercises, vec!["Deadlift:5x140"]);
                assert_eq!(args.date, NaiveDate::from_ymd_opt(2025, 6, 2));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
