use http::Method;
use reqwest::{Response, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::credentials::join_url;
use crate::error::TokenError;
use crate::sources::provider::TokenProvider;

/// Sends backend requests with `Authorization: Bearer <token>`.
///
/// A 401 answer triggers one token refresh and one resend; the second answer is returned
/// whatever its status.
#[derive(Debug, Clone)]
pub struct AuthorizedClient {
    provider: TokenProvider,
}

impl AuthorizedClient {
    pub fn new(provider: TokenProvider) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &TokenProvider {
        &self.provider
    }

    pub async fn get(&self, path: &str) -> Result<Response, TokenError> {
        self.send(Method::GET, path, None).await
    }

    /// `path` is appended to the API base URL.
    pub async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Response, TokenError> {
        let url = join_url(&self.provider.base_url()?, path);

        let token = self.provider.get_valid_token().await?;
        let response = self.send_once(&method, &url, body, &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!(url = %url, "backend rejected api token, refreshing once");
        let token = self.provider.refresh().await?;
        let response = self.send_once(&method, &url, body, &token).await?;
        debug!(url = %url, status = %response.status(), "retried with refreshed token");
        Ok(response)
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
        token: &str,
    ) -> Result<Response, TokenError> {
        let mut request = self
            .provider
            .client()
            .request(method.clone(), url)
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }
}
