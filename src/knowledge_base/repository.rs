// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Knowledge base repository
//!
//! Owns the invariant that a stored embedding always belongs to the stored
//! content: documents are embedded on insert and re-embedded whenever an
//! update changes their content.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::embeddings::{
    normalize_text, rank_documents, validate_query, EmbeddingProvider, ScoredDocument,
};
use super::processor;
use crate::config::fitness_config::KnowledgeBaseConfig;
use crate::errors::{TrainerError, TrainerResult};
use crate::models::KnowledgeDocument;
use crate::storage::RecordStore;

/// Input for [`KnowledgeBaseRepository::add_document`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub source: Option<String>,
    /// Precomputed embedding; computed from the content when absent
    pub embedding: Option<Vec<f32>>,
}

/// Partial corrective update of a stored document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub source: Option<String>,
}

pub struct KnowledgeBaseRepository {
    store: Arc<dyn RecordStore<KnowledgeDocument>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    defaults: KnowledgeBaseConfig,
}

impl KnowledgeBaseRepository {
    pub fn new(
        store: Arc<dyn RecordStore<KnowledgeDocument>>,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        defaults: KnowledgeBaseConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            defaults,
        }
    }

    pub fn defaults(&self) -> &KnowledgeBaseConfig {
        &self.defaults
    }

    fn embedder(&self) -> TrainerResult<&Arc<dyn EmbeddingProvider>> {
        self.embedder
            .as_ref()
            .ok_or_else(|| TrainerError::embedding("no embedding provider configured"))
    }

    async fn embed_content(&self, content: &str) -> TrainerResult<Vec<f32>> {
        let normalized = normalize_text(content);
        if normalized.is_empty() {
            return Err(TrainerError::embedding("cannot embed empty content"));
        }
        let embedding = self.embedder()?.embed(&normalized).await?;
        if embedding.is_empty() {
            return Err(TrainerError::embedding("provider returned an empty embedding"));
        }
        Ok(embedding)
    }

    /// Embed (when needed), stamp and persist a new document
    pub async fn add_document(&self, new: NewDocument) -> TrainerResult<KnowledgeDocument> {
        let embedding = match new.embedding {
            Some(embedding) if !embedding.is_empty() => embedding,
            Some(_) => return Err(TrainerError::embedding("supplied embedding is empty")),
            None => self.embed_content(&new.content).await?,
        };

        let document = KnowledgeDocument {
            id: Uuid::new_v4().to_string(),
            content_hash: KnowledgeDocument::hash_content(&new.content),
            title: new.title,
            content: new.content,
            embedding,
            category: new.category,
            source: new.source,
            date_added: Utc::now().date_naive(),
        };

        self.store.insert(&document).await?;
        info!(
            document.id = %document.id,
            document.title = %document.title,
            "Knowledge document added"
        );
        Ok(document)
    }

    pub async fn get_document(&self, id: &str) -> TrainerResult<Option<KnowledgeDocument>> {
        self.store.get(id).await
    }

    pub async fn list_documents(&self) -> TrainerResult<Vec<KnowledgeDocument>> {
        self.store.list().await
    }

    /// Apply a partial update; `None` when the document does not exist
    pub async fn update_document(
        &self,
        id: &str,
        update: DocumentUpdate,
    ) -> TrainerResult<Option<KnowledgeDocument>> {
        let Some(mut document) = self.store.get(id).await? else {
            return Ok(None);
        };

        if let Some(title) = update.title {
            document.title = title;
        }
        if let Some(category) = update.category {
            document.category = Some(category);
        }
        if let Some(source) = update.source {
            document.source = Some(source);
        }
        if let Some(content) = update.content {
            if content != document.content || !document.embedding_is_current() {
                document.embedding = self.embed_content(&content).await?;
                document.content_hash = KnowledgeDocument::hash_content(&content);
                debug!(document.id = %id, "Document re-embedded after content change");
            }
            document.content = content;
        }

        if !self.store.update(&document).await? {
            return Ok(None);
        }
        Ok(Some(document))
    }

    pub async fn delete_document(&self, id: &str) -> TrainerResult<bool> {
        let deleted = self.store.delete(id).await?;
        if deleted {
            info!(document.id = %id, "Knowledge document deleted");
        }
        Ok(deleted)
    }

    /// Documents scoring at least `min_score`, best first, at most `top_k`
    ///
    /// A failure to read the store is logged and yields no results.
    pub async fn query_similar_documents(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        min_score: f32,
    ) -> TrainerResult<Vec<ScoredDocument>> {
        validate_query(query_embedding, min_score)?;

        let documents = match self.store.list().await {
            Ok(documents) => documents,
            Err(e) => {
                warn!(error = %e, "Knowledge base unreadable, returning no matches");
                return Ok(Vec::new());
            }
        };

        let ranked = rank_documents(query_embedding, documents, top_k, min_score)?;
        debug!(matches = ranked.len(), top_k, min_score, "Similarity query");
        Ok(ranked)
    }

    /// Embed `text` and run a similarity query
    pub async fn query_by_text(
        &self,
        text: &str,
        top_k: usize,
        min_score: f32,
    ) -> TrainerResult<Vec<ScoredDocument>> {
        let normalized = normalize_text(text);
        if normalized.is_empty() {
            return Err(TrainerError::query("query text is empty"));
        }
        let embedding = self.embedder()?.embed(&normalized).await?;
        self.query_similar_documents(&embedding, top_k, min_score).await
    }

    /// Similarity query restricted to one category
    ///
    /// Fetches twice `top_k` candidates before filtering, so a category with few
    /// strong matches may return fewer than `top_k` documents.
    pub async fn query_by_category(
        &self,
        text: &str,
        category: &str,
        top_k: usize,
    ) -> TrainerResult<Vec<ScoredDocument>> {
        let candidates = self
            .query_by_text(text, top_k.saturating_mul(2), self.defaults.min_score)
            .await?;

        Ok(candidates
            .into_iter()
            .filter(|s| {
                s.document
                    .category
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(category))
            })
            .take(top_k)
            .collect())
    }

    /// Chunk, categorise and store a raw research text
    ///
    /// Returns the stored chunks in order.
    pub async fn ingest_text(
        &self,
        text: &str,
        source: Option<String>,
    ) -> TrainerResult<Vec<KnowledgeDocument>> {
        let info = processor::extract_key_info(text);
        let category = processor::categorize_document(text).to_string();
        let chunks =
            processor::chunk_document(text, self.defaults.chunk_words, self.defaults.chunk_overlap);
        if chunks.is_empty() {
            return Err(TrainerError::embedding("document has no content to ingest"));
        }

        let normalized: Vec<String> = chunks.iter().map(|c| normalize_text(c)).collect();
        let refs: Vec<&str> = normalized.iter().map(String::as_str).collect();
        let embeddings = self.embedder()?.embed_batch(&refs).await?;
        if embeddings.len() != chunks.len() {
            return Err(TrainerError::embedding(format!(
                "provider returned {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let total = chunks.len();
        let mut stored = Vec::with_capacity(total);
        for (index, (chunk, embedding)) in chunks.into_iter().zip(embeddings).enumerate() {
            let title = if total == 1 {
                info.title.clone()
            } else {
                format!("{} (part {}/{})", info.title, index + 1, total)
            };
            let document = self
                .add_document(NewDocument {
                    title,
                    content: chunk,
                    category: Some(category.clone()),
                    source: source.clone(),
                    embedding: Some(embedding),
                })
                .await?;
            stored.push(document);
        }
        Ok(stored)
    }
}
