// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Knowledge base integration tests
//!
//! Documents are stored through the resilient stores, so these exercise the
//! repository, the similarity engine and the local JSON fallback together.

mod common;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use common::{FlakyStore, KeywordEmbedder};
use personal_ai_trainer::config::fitness_config::KnowledgeBaseConfig;
use personal_ai_trainer::database::PersistenceHandle;
use personal_ai_trainer::errors::ErrorKind;
use personal_ai_trainer::knowledge_base::{DocumentUpdate, KnowledgeBaseRepository, NewDocument};
use personal_ai_trainer::models::KnowledgeDocument;
use personal_ai_trainer::storage::{LocalJsonStore, RecordStore, ResilientStore, Stores};

fn repository(stores: &Stores, config: KnowledgeBaseConfig) -> KnowledgeBaseRepository {
    KnowledgeBaseRepository::new(
        Arc::clone(&stores.documents),
        Some(Arc::new(KeywordEmbedder)),
        config,
    )
}

fn document(title: &str, content: &str, category: &str) -> NewDocument {
    NewDocument {
        title: title.to_string(),
        content: content.to_string(),
        category: Some(category.to_string()),
        source: Some("Journal of Strength and Conditioning Research".to_string()),
        embedding: None,
    }
}

async fn seed(repo: &KnowledgeBaseRepository) -> Result<Vec<KnowledgeDocument>> {
    let documents = vec![
        document(
            "Sleep extension",
            "Sleep extension improves sleep quality",
            "recovery",
        ),
        document(
            "Squat depth",
            "Deep squat training builds squat strength",
            "exercise_science",
        ),
        document(
            "Protein timing",
            "Protein intake after training",
            "nutrition",
        ),
    ];
    let mut stored = Vec::with_capacity(documents.len());
    for new in documents {
        stored.push(repo.add_document(new).await?);
    }
    Ok(stored)
}

#[tokio::test]
async fn test_documents_survive_database_outage() -> Result<()> {
    let data_dir = TempDir::new()?;
    let missing = data_dir.path().join("absent").join("kb.db");
    let handle = Arc::new(PersistenceHandle::new(format!("sqlite://{}", missing.display())));
    let stores = Stores::resilient(Some(handle), data_dir.path(), Duration::from_secs(5));
    let repo = repository(&stores, KnowledgeBaseConfig::default());

    let added = seed(&repo).await?;

    // A fresh repository over the same directory sees the same documents
    let reopened = repository(&Stores::local(data_dir.path()), KnowledgeBaseConfig::default());
    let documents = reopened.list_documents().await?;
    assert_eq!(documents, added);
    for (loaded, original) in documents.iter().zip(&added) {
        assert_eq!(loaded.id, original.id);
        assert_eq!(loaded.title, original.title);
        assert_eq!(loaded.content, original.content);
        assert_eq!(loaded.embedding, original.embedding);
        assert!(loaded.embedding_is_current());
    }

    let hits = reopened.query_by_text("sleep", 5, 0.5).await?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document.title, "Sleep extension");
    assert!(hits[0].score > 0.99);

    Ok(())
}

#[tokio::test]
async fn test_query_respects_top_k_and_min_score() -> Result<()> {
    let data_dir = TempDir::new()?;
    let repo = repository(&Stores::local(data_dir.path()), KnowledgeBaseConfig::default());
    seed(&repo).await?;

    // Every document shares the bias dimension, so a zero threshold returns all of them
    let all = repo.query_by_text("squat", 10, 0.0).await?;
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].document.title, "Squat depth");
    assert!(all.windows(2).all(|w| w[0].score >= w[1].score));

    let top = repo.query_by_text("squat", 1, 0.0).await?;
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].document.title, "Squat depth");

    assert!(repo.query_by_text("squat", 5, 1.01).await?.is_empty());
    assert!(repo.query_by_text("unrelated words", 5, 0.9).await?.is_empty());

    let err = repo.query_by_text("   ", 5, 0.5).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Query);

    Ok(())
}

#[tokio::test]
async fn test_category_query_filters_matches() -> Result<()> {
    let data_dir = TempDir::new()?;
    let repo = repository(&Stores::local(data_dir.path()), KnowledgeBaseConfig {
        min_score: 0.0,
        ..KnowledgeBaseConfig::default()
    });
    seed(&repo).await?;

    let hits = repo.query_by_category("protein squat", "NUTRITION", 5).await?;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document.title, "Protein timing");

    Ok(())
}

#[tokio::test]
async fn test_update_and_delete() -> Result<()> {
    let data_dir = TempDir::new()?;
    let repo = repository(&Stores::local(data_dir.path()), KnowledgeBaseConfig::default());
    seed(&repo).await?;

    let sleep = repo.query_by_text("sleep", 1, 0.5).await?.remove(0).document;
    let updated = repo
        .update_document(
            &sleep.id,
            DocumentUpdate {
                content: Some("A deload week reduces fatigue".to_string()),
                ..Default::default()
            },
        )
        .await?
        .unwrap();
    assert!(updated.embedding_is_current());
    assert!(repo.query_by_text("sleep", 5, 0.5).await?.is_empty());
    assert_eq!(repo.query_by_text("deload", 5, 0.5).await?[0].document.id, sleep.id);

    assert!(repo.delete_document(&sleep.id).await?);
    assert!(!repo.delete_document(&sleep.id).await?);
    assert!(repo.get_document(&sleep.id).await?.is_none());
    assert!(repo.query_by_text("deload", 5, 0.5).await?.is_empty());
    assert_eq!(repo.list_documents().await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_ingest_chunks_and_categorises() -> Result<()> {
    let data_dir = TempDir::new()?;
    let repo = repository(&Stores::local(data_dir.path()), KnowledgeBaseConfig {
        chunk_words: 6,
        chunk_overlap: 2,
        ..KnowledgeBaseConfig::default()
    });

    let text = "Sleep and recovery\n\
                Poor sleep blunts recovery after heavy squat sessions in trained lifters.";
    let stored = repo.ingest_text(text, Some("Sleep Medicine Reviews".to_string())).await?;

    assert!(stored.len() > 1);
    assert!(stored[0].title.starts_with("Sleep and recovery (part 1/"));
    assert!(stored.iter().all(|d| d.category.as_deref() == Some("recovery")));
    assert!(stored.iter().all(|d| d.source.as_deref() == Some("Sleep Medicine Reviews")));
    assert_eq!(repo.list_documents().await?.len(), stored.len());

    Ok(())
}

#[tokio::test]
async fn test_delete_during_outage_fails_loudly() -> Result<()> {
    let data_dir = TempDir::new()?;
    let primary = Arc::new(FlakyStore::<KnowledgeDocument>::new(Arc::new(
        LocalJsonStore::new(&data_dir.path().join("primary")),
    )));
    let store: Arc<dyn RecordStore<KnowledgeDocument>> = Arc::new(ResilientStore::new(
        Some(Arc::clone(&primary) as Arc<dyn RecordStore<KnowledgeDocument>>),
        Arc::new(LocalJsonStore::new(&data_dir.path().join("fallback"))),
        Duration::from_secs(5),
    ));
    let repo = KnowledgeBaseRepository::new(
        store,
        Some(Arc::new(KeywordEmbedder)),
        KnowledgeBaseConfig::default(),
    );

    let sleep = repo
        .add_document(document("Sleep", "Sleep extension improves sleep", "recovery"))
        .await?;

    primary.set_down(true);
    let err = repo.delete_document(&sleep.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);

    primary.set_down(false);
    assert_eq!(repo.query_by_text("sleep", 5, 0.5).await?.len(), 1);
    assert!(repo.delete_document(&sleep.id).await?);
    assert!(repo.query_by_text("sleep", 5, 0.5).await?.is_empty());

    Ok(())
}
