// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Both services are configured from the environment at startup. Anything
//! missing or malformed aborts the process before it binds a socket.
//!
//! ## Environment Variables
//!
//! | Variable | Service | Description | Default |
//! |----------|---------|-------------|---------|
//! | `HOST` | both | Server bind address | `0.0.0.0` |
//! | `PORT` | both | Server bind port | `8081` auth, `8082` lab |
//! | `DATA_DIR` | both | Directory holding the redb file | `./data` |
//! | `JWT_PRIVATE_KEY` | auth | PKCS#8 PEM signing key | Required |
//! | `JWT_PUBLIC_KEY` | both | SPKI PEM verification key | Required for auth |
//! | `AUTH_JWKS_URL` | lab | JWKS endpoint of ms-auth | Optional |
//! | `JWT_ISSUER` | both | Issued / expected `iss` claim | Required for auth |
//! | `JWT_EXPIRATION_MINUTES` | auth | Token lifetime | `60` |
//! | `JWT_ALLOWED_SKEW_SECONDS` | lab | Clock skew tolerated on `exp` | `0` |
//! | `CORS_ALLOWED_ORIGINS` | both | Comma-separated origins | `http://localhost:3000` |
//! | `SEED_ADMIN_USERNAME` | auth | Bootstrap admin (with `_PASSWORD`, `_EMAIL`) | Unset |
//! | `LOG_FORMAT` | both | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | both | Log level filter | `info,tower_http=debug` |
//!
//! PEM values may be given on one line with literal `\n` separators.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::{JwksManager, KeyError, KeyMaterial, KeySource, PublicKeyMaterial, TokenVerifier};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const JWT_PRIVATE_KEY_ENV: &str = "JWT_PRIVATE_KEY";
pub const JWT_PUBLIC_KEY_ENV: &str = "JWT_PUBLIC_KEY";
pub const AUTH_JWKS_URL_ENV: &str = "AUTH_JWKS_URL";
pub const JWT_ISSUER_ENV: &str = "JWT_ISSUER";
pub const JWT_EXPIRATION_MINUTES_ENV: &str = "JWT_EXPIRATION_MINUTES";
pub const JWT_ALLOWED_SKEW_SECONDS_ENV: &str = "JWT_ALLOWED_SKEW_SECONDS";
pub const CORS_ALLOWED_ORIGINS_ENV: &str = "CORS_ALLOWED_ORIGINS";
pub const SEED_ADMIN_USERNAME_ENV: &str = "SEED_ADMIN_USERNAME";
pub const SEED_ADMIN_PASSWORD_ENV: &str = "SEED_ADMIN_PASSWORD";
pub const SEED_ADMIN_EMAIL_ENV: &str = "SEED_ADMIN_EMAIL";

pub const DEFAULT_AUTH_PORT: u16 = 8081;
pub const DEFAULT_LAB_PORT: u16 = 8082;
pub const DEFAULT_EXPIRATION_MINUTES: u32 = 60;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// How long fetched JWKS documents are reused.
const JWKS_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("one of JWT_PUBLIC_KEY or AUTH_JWKS_URL must be set")]
    NoVerificationKey,

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Settings shared by both services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub cors_allowed_origins: Vec<String>,
}

impl ServerConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>, default_port: u16) -> Result<Self, ConfigError> {
        let origins = lookup(CORS_ALLOWED_ORIGINS_ENV).unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string());
        let cors_allowed_origins: Vec<String> = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
        for origin in &cors_allowed_origins {
            url::Url::parse(origin).map_err(|e| ConfigError::Invalid {
                var: CORS_ALLOWED_ORIGINS_ENV,
                reason: format!("{origin}: {e}"),
            })?;
        }

        Ok(Self {
            host: lookup(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(lookup, PORT_ENV, default_port)?,
            data_dir: PathBuf::from(lookup(DATA_DIR_ENV).unwrap_or_else(|| "./data".to_string())),
            cors_allowed_origins,
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: HOST_ENV,
                reason: e.to_string(),
            })
    }
}

/// Bootstrap administrator created on an empty user table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedAdmin {
    pub username: String,
    pub password: String,
    pub email: String,
}

/// `ms-auth` configuration.
#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    pub server: ServerConfig,
    pub public_key_pem: String,
    pub private_key_pem: String,
    pub issuer: String,
    pub expiration_minutes: u32,
    pub seed_admin: Option<SeedAdmin>,
}

impl AuthServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server = ServerConfig::from_lookup(&lookup, DEFAULT_AUTH_PORT)?;

        let expiration_minutes = parse_or(&lookup, JWT_EXPIRATION_MINUTES_ENV, DEFAULT_EXPIRATION_MINUTES)?;
        if expiration_minutes < 1 {
            return Err(ConfigError::Invalid {
                var: JWT_EXPIRATION_MINUTES_ENV,
                reason: "must be at least 1".to_string(),
            });
        }

        let seed_admin = match non_empty(&lookup, SEED_ADMIN_USERNAME_ENV) {
            Some(username) => Some(SeedAdmin {
                password: non_empty(&lookup, SEED_ADMIN_PASSWORD_ENV)
                    .ok_or(ConfigError::Missing(SEED_ADMIN_PASSWORD_ENV))?,
                email: non_empty(&lookup, SEED_ADMIN_EMAIL_ENV)
                    .unwrap_or_else(|| format!("{username}@localhost.local")),
                username,
            }),
            None => None,
        };

        Ok(Self {
            server,
            public_key_pem: non_empty(&lookup, JWT_PUBLIC_KEY_ENV)
                .ok_or(ConfigError::Missing(JWT_PUBLIC_KEY_ENV))?,
            private_key_pem: non_empty(&lookup, JWT_PRIVATE_KEY_ENV)
                .ok_or(ConfigError::Missing(JWT_PRIVATE_KEY_ENV))?,
            issuer: non_empty(&lookup, JWT_ISSUER_ENV).ok_or(ConfigError::Missing(JWT_ISSUER_ENV))?,
            expiration_minutes,
            seed_admin,
        })
    }

    /// Parse and cross-check the signing keypair.
    pub fn key_material(&self) -> Result<KeyMaterial, ConfigError> {
        Ok(KeyMaterial::from_pem(&self.public_key_pem, &self.private_key_pem)?)
    }
}

/// `ms-lab` configuration.
#[derive(Debug, Clone)]
pub struct LabServiceConfig {
    pub server: ServerConfig,
    pub public_key_pem: Option<String>,
    pub jwks_url: Option<String>,
    pub issuer: Option<String>,
    pub allowed_skew_seconds: u64,
}

impl LabServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server = ServerConfig::from_lookup(&lookup, DEFAULT_LAB_PORT)?;

        let public_key_pem = non_empty(&lookup, JWT_PUBLIC_KEY_ENV);
        let jwks_url = non_empty(&lookup, AUTH_JWKS_URL_ENV);
        if let Some(jwks_url) = &jwks_url {
            url::Url::parse(jwks_url).map_err(|e| ConfigError::Invalid {
                var: AUTH_JWKS_URL_ENV,
                reason: e.to_string(),
            })?;
        }
        if public_key_pem.is_none() && jwks_url.is_none() {
            return Err(ConfigError::NoVerificationKey);
        }

        Ok(Self {
            server,
            public_key_pem,
            jwks_url,
            issuer: non_empty(&lookup, JWT_ISSUER_ENV),
            allowed_skew_seconds: parse_or(&lookup, JWT_ALLOWED_SKEW_SECONDS_ENV, 0)?,
        })
    }

    /// Build the token verifier. A local PEM takes precedence over JWKS.
    pub fn verifier(&self) -> Result<TokenVerifier, ConfigError> {
        let source = match (&self.public_key_pem, &self.jwks_url) {
            (Some(pem), _) => KeySource::Static(PublicKeyMaterial::from_pem(pem)?),
            (None, Some(url)) => {
                let jwks = JwksManager::new(url.clone()).map_err(|e| ConfigError::Invalid {
                    var: AUTH_JWKS_URL_ENV,
                    reason: e.to_string(),
                })?;
                KeySource::Jwks(jwks.with_cache_ttl(JWKS_CACHE_TTL))
            }
            (None, None) => return Err(ConfigError::NoVerificationKey),
        };

        let mut verifier = TokenVerifier::new(source).with_leeway(self.allowed_skew_seconds);
        if let Some(issuer) = &self.issuer {
            verifier = verifier.with_issuer(issuer.clone());
        }
        Ok(verifier)
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(lookup, key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
