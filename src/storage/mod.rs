// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Record Storage
//!
//! One storage abstraction for every persisted entity. A [`Record`] names its
//! collection and id; a [`RecordStore`] persists records of one type.
//!
//! - [`SqliteStore`]: primary store over the shared [`PersistenceHandle`]
//! - [`LocalJsonStore`]: one JSON file per collection under the data directory
//! - [`ResilientStore`]: primary under a timeout, degrading to the local store

pub mod local;
pub mod resilient;
pub mod sqlite;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::constants::collections;
use crate::database::PersistenceHandle;
use crate::errors::TrainerResult;
use crate::models::{KnowledgeDocument, ReadinessMetrics, UserProfile, WorkoutLog, WorkoutPlan};

pub use local::LocalJsonStore;
pub use resilient::ResilientStore;
pub use sqlite::SqliteStore;

/// A persistable entity
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection (table / file) name
    const COLLECTION: &'static str;

    fn record_id(&self) -> &str;

    /// Owning user, when the entity belongs to one
    fn owner_id(&self) -> Option<&str> {
        None
    }
}

/// CRUD over records of one type
#[async_trait]
pub trait RecordStore<T: Record>: Send + Sync {
    /// Insert a new record; an existing id is a persistence error
    async fn insert(&self, record: &T) -> TrainerResult<()>;

    async fn get(&self, id: &str) -> TrainerResult<Option<T>>;

    /// Replace an existing record; false when it does not exist
    async fn update(&self, record: &T) -> TrainerResult<bool>;

    async fn delete(&self, id: &str) -> TrainerResult<bool>;

    /// All records in insertion order
    async fn list(&self) -> TrainerResult<Vec<T>>;

    /// Records owned by one user, in insertion order
    async fn list_for_owner(&self, owner_id: &str) -> TrainerResult<Vec<T>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|r| r.owner_id() == Some(owner_id))
            .collect())
    }

    fn backend_name(&self) -> &'static str;
}

impl Record for KnowledgeDocument {
    const COLLECTION: &'static str = collections::DOCUMENTS;

    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Record for UserProfile {
    const COLLECTION: &'static str = collections::PROFILES;

    fn record_id(&self) -> &str {
        &self.user_id
    }

    fn owner_id(&self) -> Option<&str> {
        Some(&self.user_id)
    }
}

impl Record for ReadinessMetrics {
    const COLLECTION: &'static str = collections::READINESS;

    fn record_id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> Option<&str> {
        Some(&self.user_id)
    }
}

impl Record for WorkoutPlan {
    const COLLECTION: &'static str = collections::PLANS;

    fn record_id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> Option<&str> {
        Some(&self.user_id)
    }
}

impl Record for WorkoutLog {
    const COLLECTION: &'static str = collections::WORKOUT_LOGS;

    fn record_id(&self) -> &str {
        &self.id
    }

    fn owner_id(&self) -> Option<&str> {
        Some(&self.user_id)
    }
}

/// The stores used by the pipeline, one per entity
#[derive(Clone)]
pub struct Stores {
    pub documents: Arc<dyn RecordStore<KnowledgeDocument>>,
    pub profiles: Arc<dyn RecordStore<UserProfile>>,
    pub readiness: Arc<dyn RecordStore<ReadinessMetrics>>,
    pub plans: Arc<dyn RecordStore<WorkoutPlan>>,
    pub logs: Arc<dyn RecordStore<WorkoutLog>>,
}

impl Stores {
    /// Resilient stores from service configuration
    ///
    /// Without a database URL every entity lives in the local JSON store only.
    pub fn from_config(config: &ServiceConfig) -> Self {
        let handle = config
            .database_url
            .as_ref()
            .map(|url| Arc::new(PersistenceHandle::new(url.clone())));
        Self::resilient(handle, &config.data_dir, config.storage_timeout())
    }

    pub fn resilient(
        handle: Option<Arc<PersistenceHandle>>,
        data_dir: &Path,
        timeout: Duration,
    ) -> Self {
        Self {
            documents: Arc::new(resilient_store(handle.as_ref(), data_dir, timeout)),
            profiles: Arc::new(resilient_store(handle.as_ref(), data_dir, timeout)),
            readiness: Arc::new(resilient_store(handle.as_ref(), data_dir, timeout)),
            plans: Arc::new(resilient_store(handle.as_ref(), data_dir, timeout)),
            logs: Arc::new(resilient_store(handle.as_ref(), data_dir, timeout)),
        }
    }

    /// Local JSON stores only
    pub fn local(data_dir: &Path) -> Self {
        Self {
            documents: Arc::new(LocalJsonStore::new(data_dir)),
            profiles: Arc::new(LocalJsonStore::new(data_dir)),
            readiness: Arc::new(LocalJsonStore::new(data_dir)),
            plans: Arc::new(LocalJsonStore::new(data_dir)),
            logs: Arc::new(LocalJsonStore::new(data_dir)),
        }
    }
}

fn resilient_store<T: Record>(
    handle: Option<&Arc<PersistenceHandle>>,
    data_dir: &Path,
    timeout: Duration,
) -> ResilientStore<T> {
    let primary: Option<Arc<dyn RecordStore<T>>> =
        handle.map(|h| Arc::new(SqliteStore::<T>::new(Arc::clone(h))) as Arc<dyn RecordStore<T>>);
    ResilientStore::new(primary, Arc::new(LocalJsonStore::<T>::new(data_dir)), timeout)
}
