use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::token::Token;
use crate::cache::token_slot::TokenSlot;
use crate::config::credentials::resolve_base_url;
use crate::config::env::{ProcessEnv, VarSource};
use crate::config::settings::SettingsConfig;
use crate::error::TokenError;
use crate::helpers::time::{Clock, SystemClock};
use crate::observability::metrics::get_metrics;
use crate::parser::jwt::decode_expiration;
use crate::sources::authenticate::acquire_fresh_token;
use crate::utils::constants::{DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_SAFETY_MARGIN_SECS};

/// Hands out a bearer token for the backend API, authenticating only when the cached one
/// is missing or inside the safety margin.
///
/// Cloning is cheap; clones share the cache and the refresh guard.
#[derive(Clone)]
pub struct TokenProvider {
    client: Client,
    vars: Arc<dyn VarSource>,
    clock: Arc<dyn Clock>,
    safety_margin_seconds: u64,
    slot: TokenSlot,
    // serializes refreshes so a cold cache costs one authentication call
    refresh_guard: Arc<Mutex<()>>,
}

impl std::fmt::Debug for TokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenProvider")
            .field("safety_margin_seconds", &self.safety_margin_seconds)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl TokenProvider {
    pub fn builder() -> TokenProviderBuilder {
        TokenProviderBuilder::default()
    }

    /// Provider reading the process environment, configured from settings.
    pub fn from_settings(settings: &SettingsConfig) -> Result<Self, TokenError> {
        Self::builder().settings(settings).build()
    }

    /// A token with more than the safety margin of validity left.
    ///
    /// Serves the cache when fresh, otherwise authenticates, decodes `exp` and replaces the
    /// slot. On failure the slot keeps whatever it held.
    pub async fn get_valid_token(&self) -> Result<String, TokenError> {
        if let Some(token) = self.fresh_cached().await {
            get_metrics().await.cache_hits.inc();
            return Ok(token.value);
        }

        let _guard = self.refresh_guard.lock().await;
        // another caller may have refreshed while we waited
        if let Some(token) = self.fresh_cached().await {
            get_metrics().await.cache_hits.inc();
            return Ok(token.value);
        }

        self.refresh_locked().await
    }

    /// Authenticate regardless of the cache state and store the result.
    pub async fn refresh(&self) -> Result<String, TokenError> {
        let _guard = self.refresh_guard.lock().await;
        self.refresh_locked().await
    }

    /// Raw `id_token` from the authentication endpoint, bypassing the cache.
    pub async fn acquire_fresh_token(&self) -> Result<String, TokenError> {
        acquire_fresh_token(&self.client, self.vars.as_ref()).await
    }

    pub async fn cached(&self) -> Option<Token> {
        self.slot.get().await
    }

    pub async fn invalidate(&self) {
        self.slot.clear().await;
        debug!("cached api token invalidated");
    }

    pub fn base_url(&self) -> Result<Url, TokenError> {
        resolve_base_url(self.vars.as_ref())
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn now(&self) -> u64 {
        self.clock.now_unix_seconds()
    }

    pub fn safety_margin_seconds(&self) -> u64 {
        self.safety_margin_seconds
    }

    async fn fresh_cached(&self) -> Option<Token> {
        self.slot.fresh(self.now(), self.safety_margin_seconds).await
    }

    async fn refresh_locked(&self) -> Result<String, TokenError> {
        let value = self.acquire_fresh_token().await?;
        let exp = match decode_expiration(&value) {
            Ok(exp) => exp,
            Err(err) => {
                get_metrics().await.auth_failures.with_label_values(&[err.reason()]).inc();
                warn!(error = %err, "api token rejected, cache left unchanged");
                return Err(err);
            }
        };

        let token = Token::new(value, exp);
        get_metrics().await.token_expiry_unix.set(token.exp_i64());
        info!(expires_at = exp, seconds_remaining = token.seconds_remaining(self.now()), "api token refreshed");
        self.slot.replace(token.clone()).await;
        Ok(token.value)
    }
}

#[derive(Default)]
pub struct TokenProviderBuilder {
    client: Option<Client>,
    vars: Option<Arc<dyn VarSource>>,
    clock: Option<Arc<dyn Clock>>,
    safety_margin_seconds: Option<u64>,
    request_timeout: Option<Duration>,
}

impl TokenProviderBuilder {
    /// Use a prebuilt client; `request_timeout` is ignored then.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn vars(mut self, vars: impl VarSource + 'static) -> Self {
        self.vars = Some(Arc::new(vars));
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn safety_margin_seconds(mut self, seconds: u64) -> Self {
        self.safety_margin_seconds = Some(seconds);
        self
    }

    /// Margin and request timeout from the settings file.
    pub fn settings(self, settings: &SettingsConfig) -> Self {
        self.safety_margin_seconds(settings.safety_margin_seconds)
            .request_timeout(Duration::from_millis(settings.request_timeout_ms))
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<TokenProvider, TokenError> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .timeout(
                    self.request_timeout
                        .unwrap_or(Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS)),
                )
                .build()
                .map_err(TokenError::Transport)?,
        };

        Ok(TokenProvider {
            client,
            vars: self.vars.unwrap_or_else(|| Arc::new(ProcessEnv) as Arc<dyn VarSource>),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>),
            safety_margin_seconds: self.safety_margin_seconds.unwrap_or(DEFAULT_SAFETY_MARGIN_SECS),
            slot: TokenSlot::new(),
            refresh_guard: Arc::new(Mutex::new(())),
        })
    }
}
