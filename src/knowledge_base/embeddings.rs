// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Embedding provider abstraction and the similarity engine
//!
//! Similarity search is a brute-force scan: every stored document is scored
//! against the query vector, filtered by a minimum score and ranked. Knowledge
//! bases here are small (hundreds of documents), so no index is kept.

use async_trait::async_trait;
use serde::Serialize;
use std::cmp::Ordering;

use crate::errors::{TrainerError, TrainerResult};
use crate::models::KnowledgeDocument;

/// Text to vector conversion
///
/// Implementations receive text already passed through [`normalize_text`].
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    ///
    /// # Errors
    ///
    /// Returns an `Embedding` error when the vector cannot be produced
    async fn embed(&self, text: &str) -> TrainerResult<Vec<f32>>;

    /// Embed several texts, preserving input order
    async fn embed_batch(&self, texts: &[&str]) -> TrainerResult<Vec<Vec<f32>>>;

    /// Dimension of the produced vectors
    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Lowercase, trim and collapse whitespace
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cosine similarity, `Query` error on mismatched dimensions
///
/// A zero-magnitude vector has similarity 0.0 with everything.
pub fn try_cosine_similarity(a: &[f32], b: &[f32]) -> TrainerResult<f32> {
    if a.len() != b.len() {
        return Err(TrainerError::query(format!(
            "dimension mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a * norm_b))
}

/// Cosine similarity; 0.0 for mismatched dimensions or zero vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    try_cosine_similarity(a, b).unwrap_or(0.0)
}

/// A document together with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDocument {
    pub document: KnowledgeDocument,
    pub score: f32,
}

/// Reject empty or non-finite query vectors and thresholds
pub fn validate_query(query: &[f32], min_score: f32) -> TrainerResult<()> {
    if query.is_empty() {
        return Err(TrainerError::query("query embedding is empty"));
    }
    if query.iter().any(|v| !v.is_finite()) {
        return Err(TrainerError::query("query embedding contains non-finite values"));
    }
    if !min_score.is_finite() {
        return Err(TrainerError::query("min_score must be finite"));
    }
    Ok(())
}

/// Score, filter and rank documents against a query vector
///
/// Documents without an embedding or with a different dimension are skipped.
/// Ties keep their input order.
pub fn rank_documents(
    query: &[f32],
    documents: Vec<KnowledgeDocument>,
    top_k: usize,
    min_score: f32,
) -> TrainerResult<Vec<ScoredDocument>> {
    validate_query(query, min_score)?;

    let mut scored: Vec<ScoredDocument> = documents
        .into_iter()
        .filter(|doc| doc.embedding.len() == query.len())
        .filter_map(|doc| {
            let score = cosine_similarity(query, &doc.embedding);
            (score.is_finite() && score >= min_score).then_some(ScoredDocument {
                document: doc,
                score,
            })
        })
        .collect();

    // stable sort keeps insertion order among equal scores
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(top_k);
    Ok(scored)
}
