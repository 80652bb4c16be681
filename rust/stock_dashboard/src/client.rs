// src/client.rs

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

use crate::config::BackendConfig;
use crate::error::FetchError;
use crate::models::StockAnalysis;

pub const ANALYSIS_PATH: &str = "/stock-analysis";

/// Source of analysis reports for a symbol.
///
/// Implementations classify every failure into a [`FetchError`] and never panic on bad
/// input; the controller spawns each call on the tokio runtime.
pub trait AnalysisBackend: Send + Sync + 'static {
    fn fetch_analysis(
        &self,
        symbol: &str,
    ) -> impl Future<Output = Result<StockAnalysis, FetchError>> + Send;
}

#[derive(Serialize)]
struct AnalysisRequest<'a> {
    symbol: &'a str,
}

/// Analysis service reached over HTTP at `POST {base_url}/stock-analysis`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    endpoint: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        HttpBackend {
            client: Client::new(),
            endpoint: endpoint_for(base_url),
        }
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(HttpBackend {
            client,
            endpoint: endpoint_for(&config.base_url),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn endpoint_for(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), ANALYSIS_PATH)
}

impl AnalysisBackend for HttpBackend {
    async fn fetch_analysis(&self, symbol: &str) -> Result<StockAnalysis, FetchError> {
        log::debug!("POST {} symbol={symbol}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(&AnalysisRequest { symbol })
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(StockAnalysis::from_json(&body)?)
    }
}
