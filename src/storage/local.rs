// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Local JSON record store
//!
//! Each collection is a single JSON array at `<data dir>/<collection>.json`.
//! Writes go to a temporary file that is renamed over the snapshot, so a crash
//! never leaves a half-written collection behind.

use async_trait::async_trait;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use super::{Record, RecordStore};
use crate::errors::{TrainerError, TrainerResult};

pub struct LocalJsonStore<T> {
    path: PathBuf,
    write_lock: Mutex<()>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> LocalJsonStore<T> {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(format!("{}.json", T::COLLECTION)),
            write_lock: Mutex::new(()),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> TrainerResult<Vec<T>> {
        match fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                TrainerError::persistence(format!(
                    "corrupt local collection {}: {e}",
                    self.path.display()
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, records: &[T]) -> TrainerResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(records)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), records = records.len(), "Local collection saved");
        Ok(())
    }
}

#[async_trait]
impl<T: Record> RecordStore<T> for LocalJsonStore<T> {
    async fn insert(&self, record: &T) -> TrainerResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        if records.iter().any(|r| r.record_id() == record.record_id()) {
            return Err(TrainerError::already_exists(format!(
                "{} record {}",
                T::COLLECTION,
                record.record_id()
            )));
        }
        records.push(record.clone());
        self.save(&records).await
    }

    async fn get(&self, id: &str) -> TrainerResult<Option<T>> {
        Ok(self.load().await?.into_iter().find(|r| r.record_id() == id))
    }

    async fn update(&self, record: &T) -> TrainerResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        match records.iter_mut().find(|r| r.record_id() == record.record_id()) {
            Some(slot) => {
                *slot = record.clone();
                self.save(&records).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> TrainerResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        let before = records.len();
        records.retain(|r| r.record_id() != id);
        if records.len() == before {
            return Ok(false);
        }
        self.save(&records).await?;
        Ok(true)
    }

    async fn list(&self) -> TrainerResult<Vec<T>> {
        self.load().await
    }

    fn backend_name(&self) -> &'static str {
        "local_json"
    }
}
