//! HTTP implementation of [`RemoteClient`] over the scouting REST API.
//!
//! Only the status code decides success: any 2xx is accepted, everything else
//! is a failure. Creation responses carry the new record's id as `{"id": n}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::{RemoteClient, RemoteError, RemoteId};
use crate::error::ScoutError;
use crate::features::sync::ConnectivityProbe;
use crate::scouting::{MatchEntry, PitEntry};

const PIT_ENTRIES: &str = "/api/pit-entries";
const MATCH_ENTRIES: &str = "/api/match-entries";
const HEALTH: &str = "/api/health";

/// Settings for [`HttpRemoteClient`].
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: RemoteId,
}

/// Scouting API client.
#[derive(Clone)]
pub struct HttpRemoteClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRemoteClient {
    /// Build a client. Timeouts are enforced by the client for every call.
    ///
    /// # Errors
    ///
    /// Returns `ScoutError::Config` if the base URL is empty or the client
    /// cannot be built.
    pub fn new(config: &HttpClientConfig) -> Result<Self, ScoutError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ScoutError::Config("api.base_url is not set".to_string()));
        }

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ScoutError::Config(format!("Failed to build HTTP client: {e}")))?;

        tracing::debug!(%base_url, "http client ready");

        Ok(Self {
            client,
            base_url,
            token: config.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: Serialize + Sync + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, RemoteError> {
        let response = self
            .request(method, path)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        Err(RemoteError::from_status(status.as_u16(), &text))
    }

    async fn create<T: Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<RemoteId, RemoteError> {
        let response = self.send(Method::POST, path, body).await?;
        let created: CreatedResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        Ok(created.id)
    }

    async fn update(&self, path: &str, changes: &Value) -> Result<(), RemoteError> {
        self.send(Method::PATCH, path, changes).await.map(|_| ())
    }
}

fn transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Transport(e.to_string())
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn create_pit_entry(&self, entry: &PitEntry) -> Result<RemoteId, RemoteError> {
        self.create(PIT_ENTRIES, entry).await
    }

    async fn create_match_entry(&self, entry: &MatchEntry) -> Result<RemoteId, RemoteError> {
        self.create(MATCH_ENTRIES, entry).await
    }

    async fn update_pit_entry(&self, id: RemoteId, changes: &Value) -> Result<(), RemoteError> {
        self.update(&format!("{PIT_ENTRIES}/{id}"), changes).await
    }

    async fn update_match_entry(
        &self,
        id: RemoteId,
        changes: &Value,
    ) -> Result<(), RemoteError> {
        self.update(&format!("{MATCH_ENTRIES}/{id}"), changes).await
    }
}

#[async_trait]
impl ConnectivityProbe for HttpRemoteClient {
    async fn is_reachable(&self) -> bool {
        match self.request(Method::GET, HEALTH).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::trace!(error = %e, "health probe failed");
                false
            }
        }
    }
}
