//! JSON-over-HTTP network handler built on `reqwest`.

use crate::error::{Error, Result};
use crate::{Element, NetworkHandler};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use std::fmt;
use tracing::debug;

/// Credentials attached to every request as an `Authorization` header.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Authorization {
    #[default]
    None,
    Basic {
        username: String,
        password: String,
    },
    Bearer(String),
    /// Sent verbatim as the header value.
    Custom(String),
}

impl Authorization {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Authorization::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Authorization::Bearer(token.into())
    }

    /// The header value, or `None` when no header should be sent.
    pub fn header_value(&self) -> Option<String> {
        match self {
            Authorization::None => None,
            Authorization::Basic { username, password } => {
                Some(format!("Basic {}", STANDARD.encode(format!("{username}:{password}"))))
            }
            Authorization::Bearer(token) => Some(format!("Bearer {token}")),
            Authorization::Custom(token) => Some(token.clone()),
        }
    }
}

// Credentials stay out of logs.
impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Authorization::None => f.write_str("None"),
            Authorization::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
            Authorization::Bearer(_) => f.write_str("Bearer(..)"),
            Authorization::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Sends elements as JSON bodies and decodes JSON replies.
#[derive(Debug, Clone, Default)]
pub struct HttpNetworkHandler {
    client: Client,
    authorization: Authorization,
}

impl HttpNetworkHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_authorization(mut self, authorization: Authorization) -> Self {
        self.authorization = authorization;
        self
    }

    /// Use a preconfigured client (timeouts, proxies, TLS roots).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn authorization(&self) -> &Authorization {
        &self.authorization
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.authorization.header_value() {
            Some(value) => request.header(AUTHORIZATION, value),
            None => request,
        }
    }

    fn with_body<E: Element>(request: RequestBuilder, element: &E) -> Result<RequestBuilder> {
        let body = serde_json::to_vec(element).map_err(|e| Error::Encode(e.to_string()))?;
        Ok(request.header(CONTENT_TYPE, "application/json").body(body))
    }

    async fn send(&self, request: RequestBuilder, address: &str) -> Result<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        debug!(address, status = status.as_u16(), "response received");
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                address: address.to_string(),
            });
        }
        Ok(response)
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl<E: Element> NetworkHandler<E> for HttpNetworkHandler {
    async fn get(&self, address: &str) -> Result<Vec<E>> {
        let response = self.send(self.client.get(address), address).await?;
        Self::decode(response).await
    }

    async fn post(&self, element: &E, address: &str) -> Result<E> {
        let request = Self::with_body(self.client.post(address), element)?;
        let response = self.send(request, address).await?;
        Self::decode(response).await
    }

    async fn put(&self, element: &E, address: &str) -> Result<E> {
        let request = Self::with_body(self.client.put(address), element)?;
        let response = self.send(request, address).await?;
        Self::decode(response).await
    }

    async fn delete(&self, address: &str) -> Result<()> {
        self.send(self.client.delete(address), address).await?;
        Ok(())
    }
}
