// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Research
//!
//! Turns knowledge base hits into training insights: key information is
//! extracted per document, synthesised across documents and checked with
//! advisory validity heuristics. A language model may add a short narrative;
//! the pipeline never depends on it.

pub mod processing;
pub mod verification;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::TrainerResult;

pub use processing::{
    extract_key_information, synthesize_information, ExtractedInfo, ResearchDocument,
    SynthesizedResearch,
};
pub use verification::{verify_information, IssueSeverity, VerificationIssue, VerificationResult};

/// Free-text completion
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> TrainerResult<String>;

    fn model_name(&self) -> &str;
}

/// Output of one research query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchInsights {
    pub query: String,
    pub extracted: Vec<ExtractedInfo>,
    pub synthesis: SynthesizedResearch,
    pub verification: Vec<VerificationResult>,
}

impl ResearchInsights {
    /// Extract, synthesise and verify `documents` for `query`
    pub fn from_documents(query: &str, documents: &[ResearchDocument]) -> Self {
        let extracted = extract_key_information(documents);
        let synthesis = synthesize_information(&extracted);
        let verification = verify_information(&extracted);
        Self {
            query: query.to_string(),
            extracted,
            synthesis,
            verification,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.extracted.is_empty()
    }

    /// Key points of items that passed verification
    pub fn verified_key_points(&self) -> Vec<&str> {
        self.extracted
            .iter()
            .zip(&self.verification)
            .filter(|(_, result)| result.is_valid)
            .flat_map(|(info, _)| info.key_points.iter().map(String::as_str))
            .collect()
    }
}

fn enrichment_prompt(query: &str, synthesis: &SynthesizedResearch) -> String {
    let mut prompt = format!(
        "Summarise the following research findings for an athlete asking: \"{query}\".\n\
         Answer in at most three sentences.\n\nFindings:\n"
    );
    for point in &synthesis.key_points {
        prompt.push_str("- ");
        prompt.push_str(point);
        prompt.push('\n');
    }
    if !synthesis.summary.is_empty() {
        prompt.push_str("\nContext: ");
        prompt.push_str(&synthesis.summary);
    }
    prompt
}

/// Ask `model` for a narrative; failures are logged and leave none
pub async fn enrich_synthesis(
    model: &dyn LanguageModel,
    query: &str,
    synthesis: &mut SynthesizedResearch,
) {
    if synthesis.is_empty() {
        return;
    }
    match model.complete(&enrichment_prompt(query, synthesis)).await {
        Ok(narrative) if !narrative.trim().is_empty() => {
            debug!(model = model.model_name(), "Research narrative generated");
            synthesis.narrative = Some(narrative.trim().to_string());
        }
        Ok(_) => debug!(model = model.model_name(), "Language model returned no narrative"),
        Err(e) => warn!(
            model = model.model_name(),
            error = %e,
            "Research enrichment failed, continuing without narrative"
        ),
    }
}
