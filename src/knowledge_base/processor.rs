// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Document processing: chunking, key information and topic categorisation

use serde::Serialize;

use crate::constants::knowledge::{
    CATEGORY_EXERCISE_SCIENCE, CATEGORY_NUTRITION, CATEGORY_OTHER, CATEGORY_RECOVERY,
};

/// Categories checked in order; the first keyword hit wins
const CATEGORY_KEYWORDS: [(&str, &[&str]); 3] = [
    (
        CATEGORY_EXERCISE_SCIENCE,
        &["strength", "hypertrophy", "endurance", "training", "exercise", "muscle", "cardio"],
    ),
    (
        CATEGORY_RECOVERY,
        &["sleep", "recovery", "rest", "fatigue", "overtraining", "rehab"],
    ),
    (
        CATEGORY_NUTRITION,
        &[
            "nutrition",
            "diet",
            "protein",
            "carbohydrate",
            "fat",
            "supplement",
            "calorie",
            "hydration",
        ],
    ),
];

/// Split text into overlapping windows of at most `max_words` words
///
/// An overlap of `max_words` or more is clamped so every window advances.
pub fn chunk_document(text: &str, max_words: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() || max_words == 0 {
        return Vec::new();
    }

    let step = max_words - overlap.min(max_words - 1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + max_words).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += step;
    }
    chunks
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyInfo {
    pub title: String,
    pub summary: String,
}

/// Title is the first non-empty line, summary the first paragraph
pub fn extract_key_info(text: &str) -> KeyInfo {
    let title = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string();

    KeyInfo {
        title,
        summary: first_paragraph(text),
    }
}

/// First blank-line separated paragraph, trimmed
pub fn first_paragraph(text: &str) -> String {
    let mut paragraph = Vec::new();
    for line in text.trim().lines() {
        if line.trim().is_empty() {
            if paragraph.is_empty() {
                continue;
            }
            break;
        }
        paragraph.push(line.trim());
    }
    paragraph.join("\n")
}

/// Keyword-based topic category
pub fn categorize_document(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| lower.contains(kw)))
        .map(|(category, _)| *category)
        .unwrap_or(CATEGORY_OTHER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunking_with_overlap() {
        let text = "a b c d e f g";
        assert_eq!(chunk_document(text, 3, 1), vec!["a b c", "c d e", "e f g"]);
        assert_eq!(chunk_document(text, 10, 2), vec!["a b c d e f g"]);
        assert!(chunk_document("   ", 3, 1).is_empty());
    }

    #[test]
    fn test_chunking_clamps_excessive_overlap() {
        let chunks = chunk_document("a b c d", 2, 5);
        assert_eq!(chunks, vec!["a b", "b c", "c d"]);
    }

    #[test]
    fn test_extract_key_info() {
        let info = extract_key_info("\n  Protein timing  \nA short review.\n\nSecond paragraph.");
        assert_eq!(info.title, "Protein timing");
        assert_eq!(info.summary, "Protein timing\nA short review.");

        let empty = extract_key_info("");
        assert_eq!(empty.title, "");
        assert_eq!(empty.summary, "");
    }

    #[test]
    fn test_categorize_document() {
        assert_eq!(categorize_document("Muscle hypertrophy study"), "exercise science");
        assert_eq!(categorize_document("Sleep extension in athletes"), "recovery");
        assert_eq!(categorize_document("Protein intake"), "nutrition");
        assert_eq!(categorize_document("Weather on Mars"), "other");
        // exercise science is checked first
        assert_eq!(categorize_document("Training while sleep deprived"), "exercise science");
    }
}
