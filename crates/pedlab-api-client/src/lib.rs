//! Client for the remote article, material and message stores.
//!
//! [`ApiClient`] speaks the JSON protocol of the remote functions; the typed
//! store operations live in [`api`]. [`HttpRawFileStore`] keeps raw uploads
//! through the remote upload function.

pub mod api;
pub mod upload;

use anyhow::{Context, Result};
use pedlab_core::config::RemoteConfig;
use pedlab_core::Config;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use upload::HttpRawFileStore;

/// Authentication strategy for the remote functions.
#[derive(Clone, Debug)]
pub enum Auth {
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// `X-API-Key: {key}`
    XApiKey(String),
}

/// Paths of the remote functions, relative to the base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub articles: String,
    pub materials: String,
    pub messages: String,
    pub upload: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            articles: "/articles".to_string(),
            materials: "/materials".to_string(),
            messages: "/messages".to_string(),
            upload: "/upload-to-s3".to_string(),
        }
    }
}

impl From<&RemoteConfig> for Endpoints {
    fn from(remote: &RemoteConfig) -> Self {
        Self {
            articles: remote.articles_path.clone(),
            materials: remote.materials_path.clone(),
            messages: remote.messages_path.clone(),
            upload: remote.upload_path.clone(),
        }
    }
}

/// HTTP client for the remote stores.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Option<Auth>,
    endpoints: Endpoints,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, auth: Option<Auth>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            endpoints: Endpoints::default(),
        })
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Client for `PEDLAB_API_URL`, authenticating with `PEDLAB_API_KEY`
    /// (X-API-Key) when it is set.
    pub fn from_config(config: &Config) -> Result<Self> {
        let remote = config.remote();
        let auth = remote.api_key.clone().map(Auth::XApiKey);
        Ok(Self::new(remote.api_url.clone(), auth)?.with_endpoints(Endpoints::from(remote)))
    }

    pub fn from_env() -> Result<Self> {
        let config = Config::from_env().context("Failed to load configuration")?;
        Self::from_config(&config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some(Auth::Bearer(token)) => request.bearer_auth(token),
            Some(Auth::XApiKey(key)) => request.header("X-API-Key", key.as_str()),
            None => request,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self
            .authorize(request)
            .send()
            .await
            .context("Remote store unreachable")?;
        let response = error_for_status(response).await?;
        response
            .json()
            .await
            .context("Remote store returned malformed JSON")
    }

    /// GET `path`; an empty `query` adds no `?`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let request = self.client.get(self.build_url(path));
        let request = match query {
            [] => request,
            query => request.query(query),
        };
        self.execute(request).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.client.post(self.build_url(path)).json(body);
        self.execute(request).await
    }

    /// DELETE `path`; the stores identify records by query (`?id=N`).
    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let request = self.client.delete(self.build_url(path)).query(query);
        self.execute(request).await
    }
}

/// Error body of the remote functions
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Fail on non-2xx, preferring the store's own `{"error": ...}` message.
async fn error_for_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => parsed.error,
        Err(_) if body.trim().is_empty() => "no response body".to_string(),
        Err(_) => body,
    };
    anyhow::bail!("API request failed with status {}: {}", status, message)
}

pub use pedlab_core::models::{
    Article, CreateArticleRequest, CreateMaterialRequest, CreateMessageRequest, DeleteResponse,
    Material, Message,
};
