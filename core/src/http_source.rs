//! HTTP metric source: `GET {api_base}/{metric}?startDate=..&endDate=..&channels=..&segment=..`.

use crate::{
    error::FetchError,
    metric::{MetricData, MetricName},
    query_key::QueryKey,
    source::MetricSource,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub struct HttpMetricSource {
    client:     Client,
    api_base:   String,
    timeout_ms: u64,
}

impl HttpMetricSource {
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            api_base:   api_base.trim_end_matches('/').to_string(),
            timeout_ms: timeout.as_millis() as u64,
        })
    }

    pub fn endpoint(&self, metric: MetricName) -> String {
        format!("{}/{}", self.api_base, metric.as_str())
    }
}

#[async_trait]
impl MetricSource for HttpMetricSource {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, metric: MetricName, key: &QueryKey) -> Result<MetricData, FetchError> {
        let response = self
            .client
            .get(self.endpoint(metric))
            .query(&key.query_pairs())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout { after_ms: self.timeout_ms }
                } else {
                    FetchError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { code: status.as_u16(), body });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;
        MetricData::decode(metric, body)
    }
}
