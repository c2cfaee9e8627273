//! HTTP client-credential grant against the source's token endpoint.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use logrelay_core::AuthError;
use serde::Deserialize;

use crate::credentials::{Credential, TokenEndpoint, TokenExchanger};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Exchanges client credentials for a bearer token via `POST {token_url}`.
pub struct ClientCredentialsExchanger {
    client: reqwest::Client,
}

impl ClientCredentialsExchanger {
    /// Builds an exchanger whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Reuses an existing client (shares its connection pool).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenExchanger for ClientCredentialsExchanger {
    async fn exchange(&self, endpoint: &TokenEndpoint) -> Result<Credential, AuthError> {
        let body = serde_json::json!({
            "grant_type": "client_credentials",
            "client_id": endpoint.client_id,
            "client_secret": endpoint.client_secret,
            "audience": endpoint.audience,
        });

        let response = self
            .client
            .post(&endpoint.token_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AuthError::Request {
                endpoint: endpoint.token_url.clone(),
                source: Arc::new(e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AuthError::Rejected {
                endpoint: endpoint.token_url.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| AuthError::Malformed {
            endpoint: endpoint.token_url.clone(),
            message: e.to_string(),
        })?;

        if token.access_token.is_empty() {
            return Err(AuthError::Malformed {
                endpoint: endpoint.token_url.clone(),
                message: "empty access_token".to_string(),
            });
        }

        tracing::info!(endpoint = %endpoint.token_url, "Obtained source access token");
        Ok(Credential::new(token.access_token))
    }
}
