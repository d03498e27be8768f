//! HTTP client for the business data API.
//!
//! Every public method degrades instead of failing: transport errors, non-200
//! statuses, and undecodable bodies are recorded once at error level and turned
//! into `None` or an empty `Vec`. Retries are off by default; when enabled,
//! transport errors, timeouts, 429 and 5xx responses are retried with linear
//! backoff and only the final failure is reported as an error.

use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use insightbot_core::observe::{DynRecorder, LogLevel};
use insightbot_core::repository::data::BusinessDataSource;
use insightbot_types::business::{
    Customer, CustomerOrder, DateRange, ProductPerformance, RegionalSales, RepPerformance,
    SalesFilter, SalesRecord, TopCustomer,
};
use insightbot_types::config::DataApiConfig;
use insightbot_types::error::DataError;

/// Longest response body excerpt kept in a status error.
const MAX_ERROR_BODY: usize = 200;

/// The customer endpoint has been seen returning both a bare object and a
/// one-row array.
#[derive(Deserialize)]
#[serde(untagged)]
enum CustomerBody {
    One(Customer),
    Rows(Vec<Customer>),
}

pub struct DataApiClient {
    client: reqwest::Client,
    base_url: Option<Url>,
    timeout: Duration,
    max_retries: u32,
    retry_backoff: Duration,
    recorder: DynRecorder,
}

impl DataApiClient {
    /// Build a client for `base_url`.
    ///
    /// An empty base URL is accepted: the client is then "not configured" and
    /// every call records an error and returns an empty result.
    pub fn new(
        base_url: &str,
        config: &DataApiConfig,
        recorder: DynRecorder,
    ) -> Result<Self, DataError> {
        let base_url = match base_url.trim() {
            "" => None,
            raw => Some(Url::parse(raw).map_err(|e| DataError::InvalidUrl(format!("{raw}: {e}")))?),
        };
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url,
            timeout,
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            recorder,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    fn endpoint(
        &self,
        segments: &[&str],
        query: &[(&'static str, String)],
    ) -> Result<Url, DataError> {
        let mut url = self.base_url.clone().ok_or(DataError::NotConfigured)?;
        let base = url.as_str().to_owned();
        url.path_segments_mut()
            .map_err(|_| DataError::InvalidUrl(format!("{base} cannot be a base")))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// GET and decode with the configured retry policy.
    async fn fetch<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        segments: &[&str],
        query: &[(&'static str, String)],
    ) -> Result<T, DataError> {
        let url = self.endpoint(segments, query)?;
        let mut attempt = 0;
        loop {
            match self.fetch_once(url.clone()).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    attempt += 1;
                    self.recorder.record(
                        LogLevel::Debug,
                        "data API request failed, retrying",
                        &[
                            ("operation", operation.to_string()),
                            ("attempt", attempt.to_string()),
                            ("error", e.to_string()),
                        ],
                    );
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once<T: DeserializeOwned>(&self, url: Url) -> Result<T, DataError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(DataError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_slice(&bytes).map_err(|e| DataError::Decode(e.to_string()))
    }

    fn transport_error(&self, e: reqwest::Error) -> DataError {
        if e.is_timeout() {
            DataError::Timeout(self.timeout.as_secs())
        } else {
            DataError::Transport(e.to_string())
        }
    }

    fn report(&self, operation: &'static str, error: &DataError) {
        self.recorder.record(
            LogLevel::Error,
            "data API request failed",
            &[("operation", operation.to_string()), ("error", error.to_string())],
        );
    }

    async fn list<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        segments: &[&str],
        query: &[(&'static str, String)],
    ) -> Vec<T> {
        match self.fetch::<Vec<T>>(operation, segments, query).await {
            Ok(rows) => {
                tracing::debug!(operation, rows = rows.len(), "data API request succeeded");
                rows
            }
            Err(e) => {
                self.report(operation, &e);
                Vec::new()
            }
        }
    }
}

fn is_retryable(error: &DataError) -> bool {
    match error {
        DataError::Transport(_) | DataError::Timeout(_) => true,
        DataError::Status { status, .. } => *status == 429 || *status >= 500,
        DataError::NotConfigured | DataError::InvalidUrl(_) | DataError::Decode(_) => false,
    }
}

impl BusinessDataSource for DataApiClient {
    async fn customer(&self, customer_id: &str) -> Option<Customer> {
        let operation = "get_customer";
        match self
            .fetch::<CustomerBody>(operation, &["customers", customer_id], &[])
            .await
        {
            Ok(CustomerBody::One(customer)) => Some(customer),
            Ok(CustomerBody::Rows(rows)) => rows.into_iter().next(),
            Err(e) => {
                self.report(operation, &e);
                None
            }
        }
    }

    async fn customer_orders(&self, customer_id: &str, limit: u32) -> Vec<CustomerOrder> {
        self.list(
            "get_customer_orders",
            &["customers", customer_id, "orders"],
            &[("limit", limit.to_string())],
        )
        .await
    }

    async fn top_customers(&self, limit: u32, range: &DateRange) -> Vec<TopCustomer> {
        let mut query = vec![("limit", limit.to_string())];
        query.extend(range.query_pairs());
        self.list("get_top_customers", &["customers", "top"], &query)
            .await
    }

    async fn sales(&self, filter: &SalesFilter) -> Vec<SalesRecord> {
        self.list("get_sales_data", &["sales"], &filter.query_pairs())
            .await
    }

    async fn product_performance(
        &self,
        product_code: Option<&str>,
        range: &DateRange,
    ) -> Vec<ProductPerformance> {
        let mut query = Vec::new();
        if let Some(code) = product_code.filter(|c| !c.is_empty()) {
            query.push(("product_code", code.to_string()));
        }
        query.extend(range.query_pairs());
        self.list("get_product_performance", &["products", "performance"], &query)
            .await
    }

    async fn regional_sales(&self, range: &DateRange) -> Vec<RegionalSales> {
        self.list("get_regional_sales", &["sales", "regional"], &range.query_pairs())
            .await
    }

    async fn rep_performance(&self, range: &DateRange) -> Vec<RepPerformance> {
        self.list("get_sales_rep_performance", &["sales", "reps"], &range.query_pairs())
            .await
    }
}
