use std::fmt;

use url::Url;

use crate::config::env::{EnvChain, VarSource, API_BASE_URL, API_JWT_PASS, API_JWT_USER};
use crate::error::TokenError;

pub const AUTHENTICATE_PATH: &str = "/api/authenticate";

/// Username, password and backend location, read fresh for every authentication attempt.
#[derive(Clone)]
pub struct ApiCredentials {
    pub username: String,
    pub password: String,
    pub base_url: Url,
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl ApiCredentials {
    /// Resolve all three settings, reporting every missing one at once.
    pub fn resolve(vars: &dyn VarSource) -> Result<Self, TokenError> {
        let username = API_JWT_USER.resolve(vars);
        let password = API_JWT_PASS.resolve(vars);
        let base_url = API_BASE_URL.resolve(vars);

        let missing: Vec<String> = [
            (&API_JWT_USER, username.is_none()),
            (&API_JWT_PASS, password.is_none()),
            (&API_BASE_URL, base_url.is_none()),
        ]
        .iter()
        .filter(|(_, absent)| *absent)
        .map(|(chain, _)| chain.describe())
        .collect();

        match (username, password, base_url) {
            (Some(username), Some(password), Some(base_url)) => Ok(Self {
                username,
                password,
                base_url: parse_base_url(&base_url)?,
            }),
            _ => Err(TokenError::Configuration(format!(
                "API JWT credentials or API base URL missing: {}",
                missing.join(", ")
            ))),
        }
    }

    pub fn authenticate_url(&self) -> String {
        join_url(&self.base_url, AUTHENTICATE_PATH)
    }
}

/// Resolve only the backend location.
pub fn resolve_base_url(vars: &dyn VarSource) -> Result<Url, TokenError> {
    let chain: &EnvChain = &API_BASE_URL;
    let raw = chain
        .resolve(vars)
        .ok_or_else(|| TokenError::Configuration(format!("{} missing", chain.describe())))?;
    parse_base_url(&raw)
}

fn parse_base_url(raw: &str) -> Result<Url, TokenError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| TokenError::Configuration(format!("invalid API base URL '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        _ => Err(TokenError::Configuration(format!(
            "API base URL '{}' must be an absolute http(s) URL",
            raw
        ))),
    }
}

/// `{base without trailing slash}{path}`, keeping any path prefix the base carries.
pub fn join_url(base: &Url, path: &str) -> String {
    let base = base.as_str().trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}
