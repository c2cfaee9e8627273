//! Short-lived access credential cache.
//!
//! [`CredentialCache`] keeps at most one credential per token endpoint and
//! reuses it for a fixed TTL (one hour by default), independent of the
//! token's own expiry claim. Concurrent misses for the same endpoint share a
//! single in-flight exchange: the first caller starts it, later callers await
//! the same future, and all of them receive its result. Failed exchanges are
//! not cached; the next call starts a fresh exchange.
//!
//! Build one cache per process and hand it to every reader by `Arc`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use logrelay_core::AuthError;
use tokio::time::Instant;

/// Conservative cache lifetime for exchanged tokens.
pub const DEFAULT_CREDENTIAL_TTL: Duration = Duration::from_secs(3600);

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// A bearer token and the moment it was obtained.
#[derive(Clone)]
pub struct Credential {
    token: String,
    obtained_at: Instant,
}

impl Credential {
    /// Wraps a freshly exchanged token, stamped with the current time.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            obtained_at: Instant::now(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn obtained_at(&self) -> Instant {
        self.obtained_at
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.obtained_at.elapsed() < ttl
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TokenEndpoint
// ---------------------------------------------------------------------------

/// Client-credential grant parameters for one token endpoint.
///
/// The cache is keyed by [`token_url`](Self::token_url).
#[derive(Clone, PartialEq, Eq)]
pub struct TokenEndpoint {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub audience: String,
}

impl TokenEndpoint {
    /// Endpoint for a tenant domain: `https://{domain}/oauth/token`, with the
    /// management API (`https://{domain}/api/v2/`) as default audience.
    pub fn for_domain(
        domain: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        audience: Option<String>,
    ) -> Self {
        Self {
            token_url: format!("https://{domain}/oauth/token"),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            audience: audience.unwrap_or_else(|| format!("https://{domain}/api/v2/")),
        }
    }

    pub fn key(&self) -> &str {
        &self.token_url
    }
}

impl std::fmt::Debug for TokenEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenEndpoint")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("audience", &self.audience)
            .finish()
    }
}

/// Performs the actual credential exchange. Implemented over HTTP by
/// [`ClientCredentialsExchanger`](crate::ClientCredentialsExchanger).
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(&self, endpoint: &TokenEndpoint) -> Result<Credential, AuthError>;
}

// ---------------------------------------------------------------------------
// CredentialCache
// ---------------------------------------------------------------------------

type InFlight = Shared<BoxFuture<'static, Result<Credential, AuthError>>>;

enum Slot {
    Ready(Credential),
    Pending(InFlight),
}

pub struct CredentialCache {
    exchanger: Arc<dyn TokenExchanger>,
    ttl: Duration,
    slots: Mutex<HashMap<String, Slot>>,
}

impl CredentialCache {
    pub fn new(exchanger: Arc<dyn TokenExchanger>, ttl: Duration) -> Self {
        Self {
            exchanger,
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns a fresh credential for `endpoint`, exchanging one on a miss
    /// or after the TTL elapsed.
    pub async fn get(&self, endpoint: &TokenEndpoint) -> Result<Credential, AuthError> {
        let in_flight = {
            let mut slots = self.lock();
            match slots.get(endpoint.key()) {
                Some(Slot::Ready(credential)) if credential.is_fresh(self.ttl) => {
                    return Ok(credential.clone());
                }
                Some(Slot::Pending(pending)) => {
                    tracing::debug!(endpoint = endpoint.key(), "Joining in-flight token exchange");
                    pending.clone()
                }
                _ => {
                    tracing::debug!(endpoint = endpoint.key(), "Exchanging client credentials");
                    let exchanger = Arc::clone(&self.exchanger);
                    let owned = endpoint.clone();
                    let pending = async move { exchanger.exchange(&owned).await }
                        .boxed()
                        .shared();
                    slots.insert(endpoint.key().to_string(), Slot::Pending(pending.clone()));
                    pending
                }
            }
        };

        let result = in_flight.clone().await;
        self.settle(endpoint.key(), &in_flight, &result);
        result
    }

    /// Drops a cached credential, e.g. after the source rejected it.
    pub fn invalidate(&self, endpoint: &TokenEndpoint) {
        let mut slots = self.lock();
        if matches!(slots.get(endpoint.key()), Some(Slot::Ready(_))) {
            slots.remove(endpoint.key());
        }
    }

    /// Number of endpoints with a cached or in-flight credential.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replaces the pending slot with the exchange result. A slot that was
    /// replaced in the meantime belongs to a newer exchange and is left alone.
    fn settle(&self, key: &str, in_flight: &InFlight, result: &Result<Credential, AuthError>) {
        let mut slots = self.lock();
        let still_pending =
            matches!(slots.get(key), Some(Slot::Pending(pending)) if pending.ptr_eq(in_flight));
        if !still_pending {
            return;
        }

        match result {
            Ok(credential) => {
                slots.insert(key.to_string(), Slot::Ready(credential.clone()));
            }
            Err(e) => {
                tracing::warn!(endpoint = key, error = %e, "Token exchange failed");
                slots.remove(key);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
