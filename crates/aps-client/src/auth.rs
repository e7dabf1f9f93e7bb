use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Tokens are refreshed this long before APS would expire them.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Bucket and data access used by the gateway itself.
    Internal,
    /// Read-only viewables access handed to browsers.
    Viewer,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Internal => "bucket:create bucket:read data:read data:write data:create",
            Scope::Viewer => "viewables:read",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

struct CachedToken {
    access_token: String,
    token_type: String,
    expires_at: Instant,
}

impl CachedToken {
    fn remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .checked_duration_since(now)
            .filter(|left| *left > EXPIRY_MARGIN)
    }
}

#[derive(Default)]
pub(crate) struct TokenCache {
    entries: RwLock<HashMap<Scope, CachedToken>>,
}

impl TokenCache {
    pub(crate) async fn get(&self, scope: Scope) -> Option<AccessToken> {
        let entries = self.entries.read().await;
        let cached = entries.get(&scope)?;
        let left = cached.remaining(Instant::now())?;
        Some(AccessToken {
            access_token: cached.access_token.clone(),
            token_type: cached.token_type.clone(),
            expires_in: left.as_secs(),
        })
    }

    pub(crate) async fn store(&self, scope: Scope, token: &AccessToken) {
        let expires_at = Instant::now() + Duration::from_secs(token.expires_in);
        self.entries.write().await.insert(
            scope,
            CachedToken {
                access_token: token.access_token.clone(),
                token_type: token.token_type.clone(),
                expires_at,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_in: u64) -> AccessToken {
        AccessToken {
            access_token: "abc".into(),
            token_type: "Bearer".into(),
            expires_in,
        }
    }

    #[tokio::test]
    async fn cached_token_reports_remaining_lifetime() {
        let cache = TokenCache::default();
        cache.store(Scope::Viewer, &token(3599)).await;
        let hit = cache.get(Scope::Viewer).await.expect("cached");
        assert_eq!(hit.access_token, "abc");
        assert!(hit.expires_in <= 3599 && hit.expires_in > 3500);
        assert!(cache.get(Scope::Internal).await.is_none());
    }

    #[tokio::test]
    async fn tokens_near_expiry_are_not_served() {
        let cache = TokenCache::default();
        cache.store(Scope::Internal, &token(30)).await;
        assert!(cache.get(Scope::Internal).await.is_none());
    }
}
