// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Primary store with local fallback
//!
//! Every primary call runs under a timeout. A timeout or a recoverable
//! persistence error (anything but a duplicate id) is logged and the operation
//! is served by the fallback store instead. Reads consult the fallback as well,
//! so records written while the primary was down stay visible once it recovers.
//!
//! Updates and deletes of records the fallback does not hold fail with a
//! `Persistence` error while the primary is down.

use async_trait::async_trait;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use super::{Record, RecordStore};
use crate::errors::{TrainerError, TrainerResult};
use crate::logging::AppLogger;

pub struct ResilientStore<T: Record> {
    primary: Option<Arc<dyn RecordStore<T>>>,
    fallback: Arc<dyn RecordStore<T>>,
    timeout: Duration,
}

impl<T: Record> ResilientStore<T> {
    pub fn new(
        primary: Option<Arc<dyn RecordStore<T>>>,
        fallback: Arc<dyn RecordStore<T>>,
        timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            timeout,
        }
    }

    /// Run a primary call; `Ok(None)` means "served by fallback"
    async fn attempt<R, F>(&self, operation: &str, call: F) -> TrainerResult<Option<R>>
    where
        F: Future<Output = TrainerResult<R>> + Send,
        R: Send,
    {
        match timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(Some(value)),
            Ok(Err(e)) if e.is_recoverable() => {
                AppLogger::log_storage_fallback(T::COLLECTION, operation, &e.to_string());
                Ok(None)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                AppLogger::log_storage_fallback(
                    T::COLLECTION,
                    operation,
                    &format!("timed out after {:?}", self.timeout),
                );
                Ok(None)
            }
        }
    }

    /// The record is not in the fallback, so only the unreachable primary can hold it
    fn held_by_primary(id: &str, operation: &str) -> TrainerError {
        TrainerError::persistence(format!(
            "cannot {operation} {} record {id}: primary store unavailable",
            T::COLLECTION
        ))
    }

    fn merge(primary: Vec<T>, fallback: Vec<T>) -> Vec<T> {
        let seen: HashSet<String> = primary.iter().map(|r| r.record_id().to_string()).collect();
        let mut merged = primary;
        merged.extend(fallback.into_iter().filter(|r| !seen.contains(r.record_id())));
        merged
    }
}

#[async_trait]
impl<T: Record> RecordStore<T> for ResilientStore<T> {
    async fn insert(&self, record: &T) -> TrainerResult<()> {
        if let Some(primary) = &self.primary {
            if self.attempt("insert", primary.insert(record)).await?.is_some() {
                return Ok(());
            }
        }
        self.fallback.insert(record).await
    }

    async fn get(&self, id: &str) -> TrainerResult<Option<T>> {
        if let Some(primary) = &self.primary {
            if let Some(Some(found)) = self.attempt("get", primary.get(id)).await? {
                return Ok(Some(found));
            }
        }
        self.fallback.get(id).await
    }

    async fn update(&self, record: &T) -> TrainerResult<bool> {
        let Some(primary) = &self.primary else {
            return self.fallback.update(record).await;
        };
        match self.attempt("update", primary.update(record)).await? {
            Some(true) => Ok(true),
            Some(false) => self.fallback.update(record).await,
            None => {
                if self.fallback.update(record).await? {
                    Ok(true)
                } else {
                    Err(Self::held_by_primary(record.record_id(), "update"))
                }
            }
        }
    }

    async fn delete(&self, id: &str) -> TrainerResult<bool> {
        let remote = match &self.primary {
            Some(primary) => self.attempt("delete", primary.delete(id)).await?,
            None => Some(false),
        };
        let local = self.fallback.delete(id).await?;
        match remote {
            Some(deleted) => Ok(deleted || local),
            None if local => Ok(true),
            None => Err(Self::held_by_primary(id, "delete")),
        }
    }

    async fn list(&self) -> TrainerResult<Vec<T>> {
        let local = self.fallback.list().await?;
        match &self.primary {
            Some(primary) => match self.attempt("list", primary.list()).await? {
                Some(remote) => Ok(Self::merge(remote, local)),
                None => Ok(local),
            },
            None => Ok(local),
        }
    }

    async fn list_for_owner(&self, owner_id: &str) -> TrainerResult<Vec<T>> {
        let local = self.fallback.list_for_owner(owner_id).await?;
        match &self.primary {
            Some(primary) => match self
                .attempt("list_for_owner", primary.list_for_owner(owner_id))
                .await?
            {
                Some(remote) => Ok(Self::merge(remote, local)),
                None => Ok(local),
            },
            None => Ok(local),
        }
    }

    fn backend_name(&self) -> &'static str {
        match self.primary {
            Some(_) => "resilient",
            None => self.fallback.backend_name(),
        }
    }
}
