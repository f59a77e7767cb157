// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! The lab service can be pointed at the auth service's
//! `/.well-known/jwks.json` instead of carrying a copy of the public key.
//!
//! - Keys are cached with a configurable TTL
//! - An unknown `kid` forces a refetch, so a rotated key is picked up
//!   without waiting for the TTL. Refetches are spaced by a minimum
//!   interval, so a stream of tokens with made-up `kid`s costs at most one
//!   request per interval
//! - Fetch failures are reported to the verifier, which treats the token as
//!   unverifiable

use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet};
use jsonwebtoken::DecodingKey;
use tokio::sync::RwLock;

/// Default JWKS cache TTL (5 minutes).
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Minimum time between two fetches triggered by an unknown `kid`.
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// HTTP timeout for JWKS requests.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// JWKS lookup failures.
#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    #[error("failed to fetch JWKS: {0}")]
    Fetch(String),

    #[error("no matching key found in JWKS")]
    NoMatchingKey,

    #[error("unsupported key in JWKS: {0}")]
    UnsupportedKey(String),
}

/// JWKS cache entry.
struct CacheEntry {
    jwks: JwkSet,
    fetched_at: Instant,
}

/// JWKS manager with caching.
#[derive(Clone)]
pub struct JwksManager {
    /// JWKS URL
    jwks_url: String,
    /// Cache TTL
    cache_ttl: Duration,
    /// Spacing of unknown-kid refetches
    min_refresh_interval: Duration,
    /// Cached JWKS
    cache: Arc<RwLock<Option<CacheEntry>>>,
    /// HTTP client
    client: reqwest::Client,
}

impl JwksManager {
    /// Create a new JWKS manager.
    pub fn new(jwks_url: impl Into<String>) -> Result<Self, JwksError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| JwksError::Fetch(e.to_string()))?;

        Ok(Self {
            jwks_url: jwks_url.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            min_refresh_interval: MIN_REFRESH_INTERVAL,
            cache: Arc::new(RwLock::new(None)),
            client,
        })
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Override the minimum spacing of unknown-kid refetches.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Get the JWKS URL.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Fetch JWKS (with caching).
    async fn get_jwks(&self) -> Result<JwkSet, JwksError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = &*cache {
                if entry.fetched_at.elapsed() < self.cache_ttl {
                    return Ok(entry.jwks.clone());
                }
            }
        }

        self.refresh().await
    }

    /// Fetch JWKS from the endpoint.
    async fn fetch_jwks(&self) -> Result<JwkSet, JwksError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| JwksError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JwksError::Fetch(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| JwksError::Fetch(e.to_string()))
    }

    /// Get a decoding key for the given key ID.
    pub async fn get_decoding_key(&self, kid: &str) -> Result<DecodingKey, JwksError> {
        let jwks = self.get_jwks().await?;
        if let Some(jwk) = find_key(&jwks, kid) {
            return jwk_to_decoding_key(jwk);
        }

        // Possibly rotated since the last fetch.
        if !self.refresh_allowed().await {
            tracing::debug!(kid = %kid, "unknown kid, JWKS recently fetched");
            return Err(JwksError::NoMatchingKey);
        }
        let jwks = self.refresh().await?;
        let jwk = find_key(&jwks, kid).ok_or(JwksError::NoMatchingKey)?;
        jwk_to_decoding_key(jwk)
    }

    /// Get any usable decoding key (for tokens without kid).
    pub async fn get_any_decoding_key(&self) -> Result<DecodingKey, JwksError> {
        let jwks = self.get_jwks().await?;

        jwks.keys
            .iter()
            .find_map(|jwk| jwk_to_decoding_key(jwk).ok())
            .ok_or(JwksError::NoMatchingKey)
    }

    /// Force refresh the JWKS cache.
    pub async fn refresh(&self) -> Result<JwkSet, JwksError> {
        let jwks = self.fetch_jwks().await?;
        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            jwks: jwks.clone(),
            fetched_at: Instant::now(),
        });
        tracing::debug!(url = %self.jwks_url, keys = jwks.keys.len(), "JWKS refreshed");
        Ok(jwks)
    }

    async fn refresh_allowed(&self) -> bool {
        match &*self.cache.read().await {
            Some(entry) => entry.fetched_at.elapsed() >= self.min_refresh_interval,
            None => true,
        }
    }

    /// Check if JWKS is currently cached and valid.
    pub async fn is_cached(&self) -> bool {
        let cache = self.cache.read().await;
        if let Some(entry) = &*cache {
            entry.fetched_at.elapsed() < self.cache_ttl
        } else {
            false
        }
    }
}

fn find_key<'a>(jwks: &'a JwkSet, kid: &str) -> Option<&'a Jwk> {
    jwks.keys
        .iter()
        .find(|k| k.common.key_id.as_deref() == Some(kid))
}

/// Convert an RSA JWK to a DecodingKey. Tokens are RS256 only.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<DecodingKey, JwksError> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
            .map_err(|e| JwksError::UnsupportedKey(format!("invalid RSA key: {e}"))),
        _ => Err(JwksError::UnsupportedKey("not an RSA key".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::keys::PublicKeyMaterial;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PUBLIC: &str = include_str!("../../tests/fixtures/signing_public.pem");

    /// Serve `set` on a local port and count the requests it receives.
    async fn serve_jwks(set: JwkSet) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = axum::Router::new().route(
            "/.well-known/jwks.json",
            axum::routing::get(move || {
                let counter = counter.clone();
                let set = set.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    axum::Json(set)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/.well-known/jwks.json"), hits)
    }

    fn published_set() -> (PublicKeyMaterial, JwkSet) {
        let public = PublicKeyMaterial::from_pem(PUBLIC).unwrap();
        let set = JwkSet {
            keys: vec![public.jwk().clone()],
        };
        (public, set)
    }

    #[test]
    fn jwks_manager_creation() {
        let manager = JwksManager::new("http://ms-auth:8081/.well-known/jwks.json").unwrap();
        assert_eq!(manager.jwks_url(), "http://ms-auth:8081/.well-known/jwks.json");
        assert_eq!(manager.min_refresh_interval, MIN_REFRESH_INTERVAL);
    }

    #[test]
    fn custom_cache_ttl() {
        let manager = JwksManager::new("http://localhost/.well-known/jwks.json")
            .unwrap()
            .with_cache_ttl(Duration::from_secs(60));
        assert_eq!(manager.cache_ttl, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn cache_initially_empty() {
        let manager = JwksManager::new("http://localhost/.well-known/jwks.json").unwrap();
        assert!(!manager.is_cached().await);
    }

    #[test]
    fn published_jwk_converts_to_decoding_key() {
        let (public, jwks) = published_set();

        let jwk = find_key(&jwks, public.kid()).expect("kid present");
        assert!(jwk_to_decoding_key(jwk).is_ok());
        assert!(find_key(&jwks, "unknown").is_none());
    }

    #[tokio::test]
    async fn known_kid_is_served_from_cache() {
        let (public, set) = published_set();
        let (url, hits) = serve_jwks(set).await;
        let manager = JwksManager::new(url).unwrap();

        for _ in 0..5 {
            assert!(manager.get_decoding_key(public.kid()).await.is_ok());
        }
        assert!(manager.is_cached().await);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_kids_do_not_refetch_within_interval() {
        let (_, set) = published_set();
        let (url, hits) = serve_jwks(set).await;
        let manager = JwksManager::new(url).unwrap();

        for i in 0..50 {
            let result = manager.get_decoding_key(&format!("bogus-{i}")).await;
            assert!(matches!(result, Err(JwksError::NoMatchingKey)));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_kid_refetches_once_interval_elapsed() {
        let (public, set) = published_set();
        let (url, hits) = serve_jwks(set).await;
        let manager = JwksManager::new(url)
            .unwrap()
            .with_min_refresh_interval(Duration::ZERO);

        assert!(manager.get_decoding_key(public.kid()).await.is_ok());
        assert!(manager.get_decoding_key("rotated").await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
