//! Identity service client

use async_trait::async_trait;
use ferry_core::domain::identity::IdentitySummary;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::{handle_response, trim_base_url};

/// Owner lookup used to decorate pipeline views
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    /// Resolves a user id to its display identity
    async fn get_user_by_id(&self, user_id: i64) -> Result<IdentitySummary>;
}

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    success: bool,
    #[serde(default)]
    payload: Option<UserPayload>,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    user: IdentitySummary,
}

/// HTTP client for the identity service
#[derive(Debug, Clone)]
pub struct IdentityClient {
    base_url: String,
    client: Client,
}

impl IdentityClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: trim_base_url(base_url),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl IdentityLookup for IdentityClient {
    async fn get_user_by_id(&self, user_id: i64) -> Result<IdentitySummary> {
        let url = format!(
            "{}/auth-service/api/v1/accounts/internal/user-from-id",
            self.base_url
        );
        debug!("GET {} user_id={}", url, user_id);

        let response = self
            .client
            .get(&url)
            .query(&[("user_id", user_id)])
            .send()
            .await?;

        let envelope: UserEnvelope = handle_response(response).await?;

        match envelope.payload {
            Some(payload) if envelope.success => Ok(payload.user),
            _ => Err(ClientError::NotFound(if envelope.description.is_empty() {
                format!("user {}", user_id)
            } else {
                envelope.description
            })),
        }
    }
}
