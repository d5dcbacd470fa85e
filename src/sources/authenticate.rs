use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::credentials::ApiCredentials;
use crate::config::env::VarSource;
use crate::error::TokenError;
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub remember_me: bool,
}

#[derive(Debug, Deserialize)]
pub struct AuthenticateResponse {
    pub id_token: Option<String>,
}

/// POST the configured credentials to `{base}/api/authenticate` and return the `id_token` untouched.
///
/// Credentials are resolved on every call; nothing is sent when one is missing.
/// No retries happen here.
pub async fn acquire_fresh_token(client: &Client, vars: &dyn VarSource) -> Result<String, TokenError> {
    let metrics = get_metrics().await;
    let result = match ApiCredentials::resolve(vars) {
        Ok(credentials) => {
            let url = credentials.authenticate_url();
            let body = AuthenticateRequest {
                username: &credentials.username,
                password: &credentials.password,
                remember_me: true,
            };

            let start = get_instant();
            metrics.auth_requests.inc();
            debug!(url = %url, "requesting api token");

            let result = send_authenticate(client, &url, &body).await;
            metrics.auth_duration.observe(start.elapsed().as_secs_f64());
            result
        }
        Err(err) => Err(err),
    };

    result.inspect_err(|err| {
        error!(reason = err.reason(), error = %err, "api token acquisition failed");
        metrics.auth_failures.with_label_values(&[err.reason()]).inc();
    })
}

async fn send_authenticate(
    client: &Client,
    url: &str,
    body: &AuthenticateRequest<'_>,
) -> Result<String, TokenError> {
    // .json() sets Content-Type: application/json
    let response = client.post(url).json(body).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(TokenError::from_status(status));
    }

    let text = response.text().await?;
    let parsed: AuthenticateResponse = serde_json::from_str(&text)
        .map_err(|e| TokenError::Protocol(format!("authenticate response is not valid JSON: {}", e)))?;

    parsed
        .id_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| TokenError::Protocol("No id_token returned from backend".into()))
}
