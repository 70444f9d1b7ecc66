//! API client for communicating with the churn prediction service

use anyhow::{Context, Result};
use churn_lib::{PredictionResult, ReadinessResponse};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Failures talking to the prediction service
#[derive(Error, Debug)]
pub enum ClientError {
    /// No HTTP exchange happened; the service may be down
    #[error("cannot reach the prediction API at {url}: {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse API response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("invalid request path: {0}")]
    Path(#[from] url::ParseError),
}

impl ClientError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ClientError::Unreachable { .. })
    }
}

/// API client for the prediction service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        // Keep any path prefix when joining endpoint paths
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.base_url.join(path)?;
        let response = self.send(self.client.get(url.clone()), &url).await?;
        Self::decode(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = self.base_url.join(path)?;
        let response = self.send(self.client.post(url.clone()).json(body), &url).await?;
        Self::decode(response).await
    }

    /// Classify one record remotely
    pub async fn predict(
        &self,
        record: &serde_json::Value,
        top_n: Option<usize>,
        explain: bool,
    ) -> Result<PredictionResult, ClientError> {
        let mut path = format!("predict?explain={}", explain);
        if let Some(n) = top_n {
            path.push_str(&format!("&top_n={}", n));
        }
        self.post(&path, record).await
    }

    /// Readiness, reported even when the service answers 503
    pub async fn readiness(&self) -> Result<ReadinessResponse, ClientError> {
        let url = self.base_url.join("readyz")?;
        let response = self.send(self.client.get(url.clone()), &url).await?;
        response.json().await.map_err(ClientError::Decode)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &Url,
    ) -> Result<Response, ClientError> {
        request
            .send()
            .await
            .map_err(|source| ClientError::Unreachable {
                url: url.to_string(),
                source,
            })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(ClientError::Api { status, message });
        }

        response.json().await.map_err(ClientError::Decode)
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub kind: String,
    pub version: String,
    pub classes: Vec<String>,
    pub n_features: usize,
    pub has_importances: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub columns: Vec<String>,
    pub categorical_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
}
