// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Key information extraction and multi-document synthesis

use serde::{Deserialize, Serialize};

use crate::knowledge_base::processor::first_paragraph;
use crate::models::KnowledgeDocument;

/// Leading summary sentences used when a document has no bullet points
const FALLBACK_KEY_POINTS: usize = 3;

/// A research document as handed to extraction; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchDocument {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub key_points: Vec<String>,
    pub source: Option<String>,
}

impl ResearchDocument {
    /// Derive summary and key points from a stored knowledge document
    ///
    /// Key points are the bullet lines of the content; without bullets the
    /// leading sentences of the summary stand in.
    pub fn from_knowledge(document: &KnowledgeDocument) -> Self {
        let summary = first_paragraph(&document.content);
        let mut key_points: Vec<String> = document
            .content
            .lines()
            .filter_map(bullet_text)
            .map(str::to_string)
            .collect();
        if key_points.is_empty() {
            key_points = sentences(&summary)
                .into_iter()
                .take(FALLBACK_KEY_POINTS)
                .collect();
        }

        Self {
            title: Some(document.title.clone()),
            summary: (!summary.is_empty()).then_some(summary),
            key_points,
            source: document.source.clone(),
        }
    }
}

/// Text of a `-`, `*`, `•` or `1.` bullet line
fn bullet_text(line: &str) -> Option<&str> {
    let line = line.trim();
    let rest = if let Some(rest) = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("• "))
    {
        rest
    } else {
        let digits = line.find(|c: char| !c.is_ascii_digit())?;
        if digits == 0 {
            return None;
        }
        line[digits..].strip_prefix(". ")?
    };
    let rest = rest.trim();
    (!rest.is_empty()).then_some(rest)
}

fn sentences(text: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
        if word.ends_with(['.', '!', '?']) {
            result.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        result.push(current);
    }
    result
}

/// Normalised key information of one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedInfo {
    pub title: String,
    pub summary: String,
    pub key_points: Vec<String>,
    pub source: Option<String>,
}

/// One [`ExtractedInfo`] per input document, missing fields defaulted
pub fn extract_key_information(documents: &[ResearchDocument]) -> Vec<ExtractedInfo> {
    documents
        .iter()
        .map(|doc| ExtractedInfo {
            title: doc.title.clone().unwrap_or_default(),
            summary: doc.summary.clone().unwrap_or_default(),
            key_points: doc.key_points.clone(),
            source: doc.source.clone().filter(|s| !s.trim().is_empty()),
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedResearch {
    pub summary: String,
    pub key_points: Vec<String>,
    /// Distinct sources in first-seen order
    pub sources: Vec<String>,
    /// Language-model narrative, when enrichment succeeded
    #[serde(default)]
    pub narrative: Option<String>,
}

impl SynthesizedResearch {
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.key_points.is_empty()
    }
}

/// Concatenate summaries and aggregate key points, both in input order
pub fn synthesize_information(extracted: &[ExtractedInfo]) -> SynthesizedResearch {
    let summary = extracted
        .iter()
        .map(|info| info.summary.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let key_points = extracted
        .iter()
        .flat_map(|info| info.key_points.iter().cloned())
        .collect();

    let mut sources: Vec<String> = Vec::new();
    for source in extracted.iter().filter_map(|info| info.source.as_ref()) {
        if !sources.contains(source) {
            sources.push(source.clone());
        }
    }

    SynthesizedResearch {
        summary,
        key_points,
        sources,
        narrative: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn info(summary: &str, points: &[&str], source: Option<&str>) -> ExtractedInfo {
        ExtractedInfo {
            title: "t".into(),
            summary: summary.into(),
            key_points: points.iter().map(|p| p.to_string()).collect(),
            source: source.map(str::to_string),
        }
    }

    #[test]
    fn test_key_points_aggregate_in_order() {
        let synthesized = synthesize_information(&[
            info("First.", &["A"], Some("journal")),
            info("", &["B", "C"], Some("journal")),
            info("Third.", &[], Some("book")),
        ]);
        assert_eq!(synthesized.key_points, vec!["A", "B", "C"]);
        assert_eq!(synthesized.summary, "First. Third.");
        assert_eq!(synthesized.sources, vec!["journal", "book"]);
        assert!(synthesized.narrative.is_none());
    }

    #[test]
    fn test_extraction_defaults_missing_fields() {
        let docs: Vec<ResearchDocument> = serde_json::from_str(
            r#"[{"title": "Sleep"}, {"key_points": ["x"], "source": " "}]"#,
        )
        .unwrap();
        let extracted = extract_key_information(&docs);

        assert_eq!(extracted[0].title, "Sleep");
        assert_eq!(extracted[0].summary, "");
        assert!(extracted[0].key_points.is_empty());
        assert_eq!(extracted[1].title, "");
        assert_eq!(extracted[1].source, None);
    }

    #[test]
    fn test_from_knowledge_prefers_bullets() {
        let mut document = KnowledgeDocument {
            id: "d1".into(),
            title: "Protein".into(),
            content: "Protein supports hypertrophy.\n\n- 1.6 g/kg per day\n2. Spread across meals"
                .into(),
            embedding: vec![],
            category: None,
            source: Some("ISSN".into()),
            date_added: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            content_hash: String::new(),
        };

        let research = ResearchDocument::from_knowledge(&document);
        assert_eq!(research.summary.as_deref(), Some("Protein supports hypertrophy."));
        assert_eq!(research.key_points, vec!["1.6 g/kg per day", "Spread across meals"]);
        assert_eq!(research.source.as_deref(), Some("ISSN"));

        document.content = "Sleep helps. Naps help too! More is better? Extra.".into();
        let research = ResearchDocument::from_knowledge(&document);
        assert_eq!(research.key_points, vec!["Sleep helps.", "Naps help too!", "More is better?"]);
    }
}
