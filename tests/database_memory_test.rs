// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tests to ensure in-memory databases don't create physical files and that
//! stores degrade to local JSON when the database is unreachable

use anyhow::Result;
use personal_ai_trainer::database::{Database, PersistenceHandle};
use personal_ai_trainer::models::UserProfile;
use personal_ai_trainer::storage::{RecordStore, Stores};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_memory_database_no_physical_files() -> Result<()> {
    let database = Database::new("sqlite::memory:").await?;

    let current_dir = std::env::current_dir()?;
    for entry in fs::read_dir(&current_dir)? {
        let filename = entry?.file_name();
        let filename_str = filename.to_string_lossy();

        if filename_str.starts_with(":memory:") || filename_str.starts_with("sqlite::memory:") {
            panic!("Found physical file that should be in-memory: {filename_str}");
        }
    }

    database
        .insert_record("profiles", "mem-user", Some("mem-user"), r#"{"name":"Memory"}"#)
        .await?;
    let payload = database.get_record("profiles", "mem-user").await?.unwrap();
    assert!(payload.contains("Memory"));

    Ok(())
}

#[tokio::test]
async fn test_multiple_memory_databases_isolated() -> Result<()> {
    let database1 = Database::new("sqlite::memory:").await?;
    let database2 = Database::new("sqlite::memory:").await?;

    database1.insert_record("profiles", "user1", Some("user1"), "{}").await?;
    database2.insert_record("profiles", "user2", Some("user2"), "{}").await?;

    assert!(database1.get_record("profiles", "user1").await?.is_some());
    assert!(database1.get_record("profiles", "user2").await?.is_none());
    assert!(database2.get_record("profiles", "user2").await?.is_some());
    assert!(database2.get_record("profiles", "user1").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_resilient_stores_use_database_when_available() -> Result<()> {
    let data_dir = TempDir::new()?;
    let handle = Arc::new(PersistenceHandle::new("sqlite::memory:"));
    let stores = Stores::resilient(
        Some(Arc::clone(&handle)),
        data_dir.path(),
        Duration::from_secs(5),
    );

    let profile = UserProfile::new("db-user", "Dana", 35, 168.0, 64.0);
    stores.profiles.insert(&profile).await?;

    assert!(handle.is_connected());
    assert_eq!(stores.profiles.get("db-user").await?, Some(profile));
    assert!(
        !data_dir.path().join("user_profiles.json").exists(),
        "local fallback should stay untouched while the database is healthy"
    );

    Ok(())
}

#[tokio::test]
async fn test_unreachable_database_falls_back_to_local_json() -> Result<()> {
    let data_dir = TempDir::new()?;
    let missing = data_dir.path().join("no-such-dir").join("trainer.db");
    let handle = Arc::new(PersistenceHandle::new(format!("sqlite://{}", missing.display())));
    let stores = Stores::resilient(
        Some(Arc::clone(&handle)),
        data_dir.path(),
        Duration::from_secs(5),
    );

    let profile = UserProfile::new("local-user", "Lee", 29, 175.0, 72.0);
    stores.profiles.insert(&profile).await?;

    assert!(!handle.is_connected());
    assert_eq!(stores.profiles.get("local-user").await?, Some(profile.clone()));
    assert_eq!(stores.profiles.list_for_owner("local-user").await?, vec![profile]);
    assert!(data_dir.path().join("user_profiles.json").exists());

    Ok(())
}
