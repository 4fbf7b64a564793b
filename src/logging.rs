// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Structured logging setup and pipeline logging helpers
//!
//! Log lines go to stderr so that command output on stdout stays machine readable.

use anyhow::{anyhow, Result};
use serde_json::json;
use std::env;
use std::io;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::constants::service::SERVICE_NAME;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    pub level: String,
    pub format: LogFormat,
    /// Include source file and line numbers
    pub include_location: bool,
    /// Emit span open/close events
    pub include_spans: bool,
    pub service_name: String,
    pub service_version: String,
    /// development, staging or production
    pub environment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl LogFormat {
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("json") => LogFormat::Json,
            Some("pretty") => LogFormat::Pretty,
            _ => LogFormat::Compact,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
            include_location: false,
            include_spans: false,
            service_name: SERVICE_NAME.to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Read `RUST_LOG`, `LOG_FORMAT`, `ENVIRONMENT` and `SERVICE_NAME`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let environment = env::var("ENVIRONMENT").unwrap_or(defaults.environment);
        let is_production = environment == "production";

        Self {
            level: env::var("RUST_LOG").unwrap_or(defaults.level),
            format: LogFormat::parse(env::var("LOG_FORMAT").ok().as_deref()),
            include_location: is_production || env::var("LOG_INCLUDE_LOCATION").is_ok(),
            include_spans: env::var("LOG_INCLUDE_SPANS").is_ok(),
            service_name: env::var("SERVICE_NAME").unwrap_or(defaults.service_name),
            service_version: defaults.service_version,
            environment,
        }
    }

    /// Raise the level for `--verbose` runs
    pub fn verbose(mut self, verbose: bool) -> Self {
        if verbose && env::var("RUST_LOG").is_err() {
            self.level = "debug".to_string();
        }
        self
    }

    fn span_events(&self) -> FmtSpan {
        if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    /// Install the global tracing subscriber
    pub fn init(&self) -> Result<()> {
        let env_filter = EnvFilter::try_new(&self.level).unwrap_or_else(|_| EnvFilter::new("warn"));
        let registry = tracing_subscriber::registry().with(env_filter);

        let installed = match self.format {
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_file(self.include_location)
                        .with_line_number(self.include_location)
                        .with_target(true)
                        .with_writer(io::stderr)
                        .with_span_events(self.span_events()),
                )
                .try_init(),
            LogFormat::Pretty => registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_file(self.include_location)
                        .with_line_number(self.include_location)
                        .with_writer(io::stderr)
                        .with_span_events(self.span_events()),
                )
                .try_init(),
            LogFormat::Compact => registry
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(io::stderr)
                        .with_span_events(self.span_events()),
                )
                .try_init(),
        };
        installed.map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))?;

        self.log_startup_info();
        Ok(())
    }

    fn log_startup_info(&self) {
        let summary = json!({
            "service": {
                "name": self.service_name,
                "version": self.service_version,
                "environment": self.environment
            },
            "logging": {
                "level": self.level,
                "format": format!("{:?}", self.format),
                "location": self.include_location,
                "spans": self.include_spans
            }
        });
        info!(
            service.name = %self.service_name,
            service.version = %self.service_version,
            environment = %self.environment,
            config = %summary,
            "logging initialised"
        );
    }
}

/// Structured log events for the trainer pipeline
pub struct AppLogger;

impl AppLogger {
    /// One pipeline step finished
    pub fn log_pipeline_step(user_id: &str, step: &str, duration_ms: u64) {
        info!(
            user.id = %user_id,
            pipeline.step = %step,
            pipeline.duration_ms = %duration_ms,
            "Pipeline step completed"
        );
    }

    /// Primary store failed and the local store took over
    pub fn log_storage_fallback(collection: &str, operation: &str, error: &str) {
        warn!(
            storage.collection = %collection,
            storage.operation = %operation,
            storage.error = %error,
            "Primary store unavailable, using local fallback"
        );
    }

    /// External API call (biometric provider, language model)
    pub fn log_provider_call(provider: &str, endpoint: &str, success: bool, duration_ms: u64) {
        info!(
            provider.name = %provider,
            provider.endpoint = %endpoint,
            provider.success = %success,
            provider.duration_ms = %duration_ms,
            "Provider call"
        );
    }

    pub fn log_plan_decision(
        user_id: &str,
        plan_id: &str,
        readiness: f64,
        superseded: Option<&str>,
    ) {
        info!(
            user.id = %user_id,
            plan.id = %plan_id,
            plan.readiness = %readiness,
            plan.superseded = superseded.unwrap_or("none"),
            "Plan decision"
        );
    }
}
