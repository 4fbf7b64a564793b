// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Oura Ring v2 usercollection client

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

use super::{
    with_retry, ActivityRecord, BiometricProvider, CallFailure, DateRange, ReadinessRecord,
    RetryPolicy, SleepRecord,
};
use crate::config::environment::ServiceConfig;
use crate::constants::endpoints::{OURA_DAILY_ACTIVITY, OURA_DAILY_READINESS, OURA_DAILY_SLEEP};
use crate::errors::{TrainerError, TrainerResult};
use crate::logging::AppLogger;

/// Oura caps pagination; guard against a server that never stops paging
const MAX_PAGES: usize = 20;

#[derive(Debug, Deserialize)]
struct OuraPage<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    next_token: Option<String>,
}

pub struct OuraProvider {
    client: Client,
    api_base: Url,
    access_token: String,
    retry: RetryPolicy,
}

impl OuraProvider {
    pub fn new(
        api_base: &str,
        access_token: impl Into<String>,
        request_timeout: Duration,
        retry: RetryPolicy,
    ) -> TrainerResult<Self> {
        // Url::join drops the last path segment unless the base ends in '/'
        let base = if api_base.ends_with('/') {
            api_base.to_string()
        } else {
            format!("{api_base}/")
        };
        let api_base = Url::parse(&base)
            .map_err(|e| {
                TrainerError::configuration(format!("invalid Oura API base {base}: {e}"))
            })?;
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TrainerError::configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base,
            access_token: access_token.into(),
            retry,
        })
    }

    /// Build from service configuration; `Configuration` error without a token
    pub fn from_config(config: &ServiceConfig) -> TrainerResult<Self> {
        let token = config
            .oura
            .api_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| TrainerError::configuration("OURA_API_TOKEN is not set"))?;
        Self::new(
            &config.oura.api_base,
            token,
            config.request_timeout(),
            RetryPolicy::from(&config.retry),
        )
    }

    fn endpoint_url(
        &self,
        endpoint: &str,
        range: DateRange,
        next_token: Option<&str>,
    ) -> TrainerResult<Url> {
        let mut url = self
            .api_base
            .join(endpoint)
            .map_err(|e| TrainerError::provider(format!("invalid endpoint {endpoint}: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("start_date", &range.start.to_string())
                .append_pair("end_date", &range.end.to_string());
            if let Some(token) = next_token {
                query.append_pair("next_token", token);
            }
        }
        Ok(url)
    }

    async fn fetch_page<T: DeserializeOwned>(&self, url: Url) -> Result<OuraPage<T>, CallFailure> {
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| {
                CallFailure::from_reqwest(
                    &e,
                    TrainerError::provider(format!("request to {url} failed: {e}")),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CallFailure::from_status(
                status,
                TrainerError::provider(format!("Oura returned {status}: {body}")),
            ));
        }

        response.json::<OuraPage<T>>().await.map_err(|e| {
            CallFailure::permanent(TrainerError::provider(format!("malformed Oura response: {e}")))
        })
    }

    /// Fetch every page of a collection within `range`
    async fn fetch_collection<T: DeserializeOwned>(
        &self,
        user_id: &str,
        endpoint: &str,
        range: DateRange,
    ) -> TrainerResult<Vec<T>> {
        let started = Instant::now();
        let mut records = Vec::new();
        let mut next_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let url = self.endpoint_url(endpoint, range, next_token.as_deref())?;
            debug!(user_id, endpoint, "Fetching Oura page");

            let result =
                with_retry(self.retry, endpoint, || self.fetch_page::<T>(url.clone())).await;
            let page = match result {
                Ok(page) => page,
                Err(e) => {
                    AppLogger::log_provider_call(
                        self.provider_name(),
                        endpoint,
                        false,
                        started.elapsed().as_millis() as u64,
                    );
                    return Err(e);
                }
            };

            records.extend(page.data);
            next_token = page.next_token.filter(|t| !t.is_empty());
            if next_token.is_none() {
                break;
            }
        }
        if next_token.is_some() {
            warn!(
                user_id,
                endpoint,
                max_pages = MAX_PAGES,
                "Oura pagination limit reached, remaining pages skipped"
            );
        }

        AppLogger::log_provider_call(
            self.provider_name(),
            endpoint,
            true,
            started.elapsed().as_millis() as u64,
        );
        info!(user_id, endpoint, count = records.len(), "Fetched Oura records");
        Ok(records)
    }
}

#[async_trait]
impl BiometricProvider for OuraProvider {
    async fn get_sleep_data(
        &self,
        user_id: &str,
        range: DateRange,
    ) -> TrainerResult<Vec<SleepRecord>> {
        self.fetch_collection(user_id, OURA_DAILY_SLEEP, range).await
    }

    async fn get_activity_data(
        &self,
        user_id: &str,
        range: DateRange,
    ) -> TrainerResult<Vec<ActivityRecord>> {
        self.fetch_collection(user_id, OURA_DAILY_ACTIVITY, range).await
    }

    async fn get_readiness_data(
        &self,
        user_id: &str,
        range: DateRange,
    ) -> TrainerResult<Vec<ReadinessRecord>> {
        self.fetch_collection(user_id, OURA_DAILY_READINESS, range).await
    }

    fn provider_name(&self) -> &'static str {
        "oura"
    }
}
