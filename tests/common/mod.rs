// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Shared test doubles for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use personal_ai_trainer::errors::{TrainerError, TrainerResult};
use personal_ai_trainer::knowledge_base::EmbeddingProvider;
use personal_ai_trainer::providers::{
    ActivityRecord, BiometricProvider, DateRange, ReadinessRecord, SleepRecord,
};
use personal_ai_trainer::storage::{Record, RecordStore};

/// Marker words counted by [`KeywordEmbedder`]
pub const KEYWORDS: [&str; 4] = ["sleep", "squat", "protein", "deload"];

/// Embeds by counting a few marker words, plus a constant bias dimension
pub struct KeywordEmbedder;

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> TrainerResult<Vec<f32>> {
        let mut vector: Vec<f32> = KEYWORDS
            .iter()
            .map(|w| text.matches(w).count() as f32)
            .collect();
        vector.push(0.1);
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[&str]) -> TrainerResult<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        KEYWORDS.len() + 1
    }

    fn model_name(&self) -> &str {
        "keyword-test"
    }
}

/// Biometric provider returning one fixed day with a settable readiness score
pub struct ScriptedProvider {
    day: NaiveDate,
    readiness: Mutex<Option<f64>>,
    sleep: Option<f64>,
    fail: bool,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(day: NaiveDate, readiness: f64) -> Self {
        Self {
            day,
            readiness: Mutex::new(Some(readiness)),
            sleep: None,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_sleep(mut self, score: f64) -> Self {
        self.sleep = Some(score);
        self
    }

    pub fn failing(day: NaiveDate) -> Self {
        Self {
            fail: true,
            ..Self::new(day, 0.0)
        }
    }

    pub fn set_readiness(&self, score: f64) {
        *self.readiness.lock().unwrap() = Some(score);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> TrainerResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(TrainerError::provider("scripted outage"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BiometricProvider for ScriptedProvider {
    async fn get_sleep_data(
        &self,
        _user_id: &str,
        _range: DateRange,
    ) -> TrainerResult<Vec<SleepRecord>> {
        self.check()?;
        Ok(self
            .sleep
            .map(|score| SleepRecord {
                day: Some(self.day),
                score: Some(score),
            })
            .into_iter()
            .collect())
    }

    async fn get_activity_data(
        &self,
        _user_id: &str,
        _range: DateRange,
    ) -> TrainerResult<Vec<ActivityRecord>> {
        self.check()?;
        Ok(vec![ActivityRecord {
            day: Some(self.day),
            steps: Some(8_000),
            ..Default::default()
        }])
    }

    async fn get_readiness_data(
        &self,
        _user_id: &str,
        _range: DateRange,
    ) -> TrainerResult<Vec<ReadinessRecord>> {
        self.check()?;
        Ok(vec![ReadinessRecord {
            day: Some(self.day),
            score: *self.readiness.lock().unwrap(),
            ..Default::default()
        }])
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// Record store that can be switched offline, failing with recoverable errors
pub struct FlakyStore<T: Record> {
    inner: Arc<dyn RecordStore<T>>,
    down: AtomicBool,
}

impl<T: Record> FlakyStore<T> {
    pub fn new(inner: Arc<dyn RecordStore<T>>) -> Self {
        Self {
            inner,
            down: AtomicBool::new(false),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> TrainerResult<()> {
        if self.down.load(Ordering::SeqCst) {
            Err(TrainerError::persistence("database is unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl<T: Record> RecordStore<T> for FlakyStore<T> {
    async fn insert(&self, record: &T) -> TrainerResult<()> {
        self.check()?;
        self.inner.insert(record).await
    }

    async fn get(&self, id: &str) -> TrainerResult<Option<T>> {
        self.check()?;
        self.inner.get(id).await
    }

    async fn update(&self, record: &T) -> TrainerResult<bool> {
        self.check()?;
        self.inner.update(record).await
    }

    async fn delete(&self, id: &str) -> TrainerResult<bool> {
        self.check()?;
        self.inner.delete(id).await
    }

    async fn list(&self) -> TrainerResult<Vec<T>> {
        self.check()?;
        self.inner.list().await
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
