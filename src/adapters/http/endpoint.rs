use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header, Client as ReqwestClient};
use tracing::{debug, instrument, warn};

use super::{build_client, join_url};
use crate::domain::errors::NetworkError;
use crate::domain::models::{AccessToken, EndpointConfig};
use crate::domain::ports::{RemoteEndpoint, RemoteResponse};
use crate::infrastructure::logging::SecretScrubber;

/// `RemoteEndpoint` over the backend's REST interface.
///
/// Every request carries `Authorization: Bearer <token>` and, when
/// configured, the project's `apikey` header.
pub struct HttpRemoteEndpoint {
    http_client: ReqwestClient,
    base_url: String,
    api_key: Option<String>,
    scrubber: SecretScrubber,
}

impl HttpRemoteEndpoint {
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        Ok(Self {
            http_client: build_client(config.timeout_secs)?,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            scrubber: SecretScrubber::new(),
        })
    }
}

#[async_trait]
impl RemoteEndpoint for HttpRemoteEndpoint {
    #[instrument(skip(self, token))]
    async fn authenticated_fetch(
        &self,
        path: &str,
        token: &AccessToken,
    ) -> Result<RemoteResponse, NetworkError> {
        let mut request = self
            .http_client
            .get(join_url(&self.base_url, path))
            .bearer_auth(token.expose())
            .header(header::ACCEPT, "application/json");
        if let Some(api_key) = &self.api_key {
            request = request.header("apikey", api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            debug!(%status, bytes = body.len(), "Remote fetch completed");
        } else {
            warn!(%status, body = %self.scrubber.scrub(&body), "Remote endpoint returned an error status");
        }

        Ok(RemoteResponse::new(status, body))
    }
}
