// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Advisory scientific-validity checks on extracted research

use serde::{Deserialize, Serialize};

use super::processing::ExtractedInfo;

/// Summaries shorter than this get a warning
const MIN_SUMMARY_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    /// Makes the item invalid
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationIssue {
    pub severity: IssueSeverity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub title: String,
    pub is_valid: bool,
    pub issues: Vec<VerificationIssue>,
}

impl VerificationResult {
    pub fn warnings(&self) -> impl Iterator<Item = &VerificationIssue> {
        self.issues.iter().filter(|i| i.severity == IssueSeverity::Warning)
    }
}

/// Percentages above 100 written as `<number>%`
fn implausible_percentages(text: &str) -> Vec<f64> {
    text.split(|c: char| c.is_whitespace() || c == '(' || c == ')' || c == ',')
        .filter_map(|token| token.trim_end_matches(['.', ';', ':']).strip_suffix('%'))
        .filter_map(|number| number.trim_start_matches('+').parse::<f64>().ok())
        .filter(|value| *value > 100.0)
        .collect()
}

fn verify_item(info: &ExtractedInfo) -> VerificationResult {
    let mut issues = Vec::new();
    let mut error = |message: String| {
        issues.push(VerificationIssue {
            severity: IssueSeverity::Error,
            message,
        })
    };

    if info.key_points.is_empty() {
        error("No key points found.".to_string());
    }
    if info.source.as_deref().map_or(true, |s| s.trim().is_empty()) {
        error("No source reference.".to_string());
    }
    for point in &info.key_points {
        for value in implausible_percentages(point) {
            error(format!("Implausible percentage {value}% in \"{point}\"."));
        }
    }

    if info.summary.trim().chars().count() < MIN_SUMMARY_CHARS {
        issues.push(VerificationIssue {
            severity: IssueSeverity::Warning,
            message: "Summary is very short.".to_string(),
        });
    }

    VerificationResult {
        title: info.title.clone(),
        is_valid: !issues.iter().any(|i| i.severity == IssueSeverity::Error),
        issues,
    }
}

/// One advisory verdict per extracted item
pub fn verify_information(extracted: &[ExtractedInfo]) -> Vec<VerificationResult> {
    extracted.iter().map(verify_item).collect()
}
