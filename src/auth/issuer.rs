// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access token issuance (RS256).

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, Header};
use uuid::Uuid;

use super::claims::TokenClaims;
use super::keys::KeyMaterial;
use super::roles::Role;

/// Identity and authorization facts a token is issued for.
#[derive(Debug, Clone)]
pub struct TokenSubject<'a> {
    pub username: &'a str,
    pub external_id: Uuid,
    pub roles: &'a [Role],
    pub lab_code: Option<&'a str>,
}

/// A signed token and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// Role names as embedded in the token
    pub roles: Vec<String>,
    /// Lab code as embedded in the token
    pub lab_code: Option<String>,
}

/// Signs access tokens with the service's private key.
#[derive(Clone)]
pub struct TokenIssuer {
    keys: Arc<KeyMaterial>,
    issuer: String,
    ttl: Duration,
}

impl TokenIssuer {
    /// Create an issuer. TTL is clamped to at least one minute.
    pub fn new(keys: Arc<KeyMaterial>, issuer: impl Into<String>, ttl_minutes: u32) -> Self {
        Self {
            keys,
            issuer: issuer.into(),
            ttl: Duration::minutes(i64::from(ttl_minutes.max(1))),
        }
    }

    /// Value of the `iss` claim.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Issue a token valid from now until now + TTL.
    pub fn issue(&self, subject: &TokenSubject<'_>) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        self.issue_at(subject, Utc::now())
    }

    fn issue_at(
        &self,
        subject: &TokenSubject<'_>,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        let expires_at = now + self.ttl;

        let mut roles: Vec<String> = subject.roles.iter().map(|r| r.as_str().to_string()).collect();
        roles.sort();
        roles.dedup();

        let lab_code = if roles.iter().any(|r| r == Role::LabTech.as_str()) {
            subject.lab_code.map(str::to_string)
        } else {
            None
        };

        let claims = TokenClaims {
            sub: subject.username.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            user_id: subject.external_id.to_string(),
            roles: roles.clone(),
            lab_code: lab_code.clone(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.keys.public().kid().to_string());

        let token = encode(&header, &claims, self.keys.encoding_key())?;

        Ok(IssuedToken {
            token,
            expires_at,
            roles,
            lab_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, decode_header, Validation};

    const PUBLIC: &str = include_str!("../../tests/fixtures/signing_public.pem");
    const PRIVATE: &str = include_str!("../../tests/fixtures/signing_private.pem");

    fn issuer() -> TokenIssuer {
        let keys = KeyMaterial::from_pem(PUBLIC, PRIVATE).unwrap();
        TokenIssuer::new(Arc::new(keys), "ms-auth", 60)
    }

    fn decode_claims(issuer: &TokenIssuer, token: &str) -> TokenClaims {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&["ms-auth"]);
        decode::<TokenClaims>(token, issuer.keys.public().decoding_key(), &validation)
            .unwrap()
            .claims
    }

    fn subject<'a>(roles: &'a [Role], lab_code: Option<&'a str>) -> TokenSubject<'a> {
        TokenSubject {
            username: "tech1",
            external_id: Uuid::nil(),
            roles,
            lab_code,
        }
    }

    #[test]
    fn roles_are_sorted() {
        let issuer = issuer();
        let issued = issuer
            .issue(&subject(&[Role::LabTech, Role::Admin], Some("LAB01")))
            .unwrap();
        let claims = decode_claims(&issuer, &issued.token);
        assert_eq!(claims.roles, vec!["ADMIN", "LAB_TECH"]);
        assert_eq!(issued.roles, claims.roles);
    }

    #[test]
    fn lab_code_only_for_lab_tech() {
        let issuer = issuer();

        let admin = issuer.issue(&subject(&[Role::Admin], Some("LAB01"))).unwrap();
        assert!(decode_claims(&issuer, &admin.token).lab_code.is_none());
        assert!(admin.lab_code.is_none());

        let tech = issuer.issue(&subject(&[Role::LabTech], Some("LAB01"))).unwrap();
        assert_eq!(decode_claims(&issuer, &tech.token).lab_code.as_deref(), Some("LAB01"));
    }

    #[test]
    fn expiry_is_now_plus_ttl() {
        let issuer = issuer();
        let now = Utc::now();
        let issued = issuer.issue_at(&subject(&[Role::Admin], None), now).unwrap();
        assert_eq!(issued.expires_at, now + Duration::minutes(60));

        let claims = decode_claims(&issuer, &issued.token);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.sub, "tech1");
        assert_eq!(claims.user_id, Uuid::nil().to_string());
    }

    #[test]
    fn header_carries_kid_and_type() {
        let issuer = issuer();
        let issued = issuer.issue(&subject(&[Role::Admin], None)).unwrap();
        let header = decode_header(&issued.token).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.typ.as_deref(), Some("JWT"));
        assert_eq!(header.kid.as_deref(), Some(issuer.keys.public().kid()));
    }

    #[test]
    fn iss_claim_matches_configured_issuer() {
        let issuer = issuer();
        let issued = issuer.issue(&subject(&[Role::Admin], None)).unwrap();
        assert_eq!(decode_claims(&issuer, &issued.token).iss, issuer.issuer());
        assert_eq!(issuer.issuer(), "ms-auth");
    }

    #[test]
    fn ttl_is_at_least_one_minute() {
        let keys = KeyMaterial::from_pem(PUBLIC, PRIVATE).unwrap();
        let issuer = TokenIssuer::new(Arc::new(keys), "ms-auth", 0);
        assert_eq!(issuer.ttl, Duration::minutes(1));
    }
}
