// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! SQLite-backed record store

use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

use super::{Record, RecordStore};
use crate::database::PersistenceHandle;
use crate::errors::TrainerResult;

pub struct SqliteStore<T> {
    handle: Arc<PersistenceHandle>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> SqliteStore<T> {
    pub fn new(handle: Arc<PersistenceHandle>) -> Self {
        Self {
            handle,
            _record: PhantomData,
        }
    }

    fn decode(payloads: Vec<String>) -> TrainerResult<Vec<T>> {
        payloads
            .iter()
            .map(|p| serde_json::from_str(p).map_err(Into::into))
            .collect()
    }
}

#[async_trait]
impl<T: Record> RecordStore<T> for SqliteStore<T> {
    async fn insert(&self, record: &T) -> TrainerResult<()> {
        let payload = serde_json::to_string(record)?;
        self.handle
            .database()
            .await?
            .insert_record(T::COLLECTION, record.record_id(), record.owner_id(), &payload)
            .await
    }

    async fn get(&self, id: &str) -> TrainerResult<Option<T>> {
        let payload = self.handle.database().await?.get_record(T::COLLECTION, id).await?;
        match payload {
            Some(p) => Ok(Some(serde_json::from_str(&p)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, record: &T) -> TrainerResult<bool> {
        let payload = serde_json::to_string(record)?;
        self.handle
            .database()
            .await?
            .update_record(T::COLLECTION, record.record_id(), record.owner_id(), &payload)
            .await
    }

    async fn delete(&self, id: &str) -> TrainerResult<bool> {
        self.handle.database().await?.delete_record(T::COLLECTION, id).await
    }

    async fn list(&self) -> TrainerResult<Vec<T>> {
        let payloads = self.handle.database().await?.list_records(T::COLLECTION, None).await?;
        Self::decode(payloads)
    }

    async fn list_for_owner(&self, owner_id: &str) -> TrainerResult<Vec<T>> {
        let payloads = self
            .handle
            .database()
            .await?
            .list_records(T::COLLECTION, Some(owner_id))
            .await?;
        Self::decode(payloads)
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserProfile;

    #[tokio::test]
    async fn test_profile_round_trip() {
        let handle = Arc::new(PersistenceHandle::new("sqlite::memory:"));
        let store: SqliteStore<UserProfile> = SqliteStore::new(handle);

        let profile = UserProfile::new("u1", "Sam", 30, 180.0, 80.0).with_goals("strength");
        store.insert(&profile).await.unwrap();

        let loaded = store.get("u1").await.unwrap().unwrap();
        assert_eq!(loaded, profile);
        assert_eq!(store.list_for_owner("u1").await.unwrap().len(), 1);
        assert!(store.list_for_owner("u2").await.unwrap().is_empty());
    }
}
