use std::sync::Arc;

use tokio::sync::RwLock;

use crate::cache::token::Token;

/// Single-slot token cache. Clones share the slot.
///
/// Invariant: a stored token's `exp_unix_ts` was decoded from that token's own `exp` claim.
#[derive(Debug, Clone, Default)]
pub struct TokenSlot {
    inner: Arc<RwLock<Option<Token>>>,
}

impl TokenSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<Token> {
        self.inner.read().await.clone()
    }

    /// Cached token if it is still outside the safety margin.
    pub async fn fresh(&self, now: u64, safety_margin_seconds: u64) -> Option<Token> {
        self.inner
            .read()
            .await
            .as_ref()
            .filter(|token| token.is_fresh(now, safety_margin_seconds))
            .cloned()
    }

    /// Replace the whole slot.
    pub async fn replace(&self, token: Token) {
        *self.inner.write().await = Some(token);
    }

    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }
}
