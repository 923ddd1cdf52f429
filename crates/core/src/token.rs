// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token Service (C5): issues and validates ACCESS/REFRESH capabilities and
//! rotates them on refresh (spec §4.5). Grounded on the teacher's credential
//! broker (`credential.rs`) for the issue/validate/rotate shape, reimplemented
//! on signed JWTs instead of an upstream OAuth exchange.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::Cache;
use crate::error::EngineError;
use crate::model::{Id, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    sub: Id,
    role: Role,
    kind: TokenKind,
    jti: String,
    iat: u64,
    exp: u64,
}

/// A validated capability, handed to the authorisation kernel as a
/// [`crate::authz::Principal`] plus bookkeeping needed to rotate/revoke.
#[derive(Debug, Clone)]
pub struct Claim {
    pub user_id: Id,
    pub role: Role,
    pub kind: TokenKind,
    pub jti: String,
    pub expires_at_secs: u64,
}

/// A freshly issued ACCESS+REFRESH pair returned from login and from
/// refresh-rotation.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    cache: Arc<dyn Cache>,
}

impl TokenService {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration, cache: Arc<dyn Cache>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
            cache,
        }
    }

    /// Issue a fresh ACCESS+REFRESH pair for `user_id`/`role`, indexing the
    /// REFRESH capability's `jti` in the cache so a later rotation can
    /// detect reuse of an already-rotated token.
    pub async fn issue(&self, user_id: Id, role: Role) -> Result<TokenPair, EngineError> {
        let access = self.sign(user_id, role, TokenKind::Access, self.access_ttl)?;
        let (refresh, refresh_jti) = self.sign_with_jti(user_id, role, TokenKind::Refresh, self.refresh_ttl)?;
        self.cache
            .set_refresh_jti(user_id, &refresh_jti, self.refresh_ttl)
            .await?;
        Ok(TokenPair { access, refresh })
    }

    /// Validate a capability of either kind: checks signature, expiry, and
    /// the revocation blacklist.
    pub async fn validate(&self, token: &str) -> Result<Claim, EngineError> {
        let claims = self.decode(token)?;
        if self.cache.is_revoked(&claims.jti).await? {
            return Err(EngineError::business(
                crate::error::ErrorCode::Unauthenticated,
                "TOKEN_REVOKED",
                "capability has been revoked",
            ));
        }
        Ok(Claim {
            user_id: claims.sub,
            role: claims.role,
            kind: claims.kind,
            jti: claims.jti,
            expires_at_secs: claims.exp,
        })
    }

    /// Rotate a REFRESH capability: validates it is in fact a REFRESH token,
    /// is the currently-indexed one for its subject (single active refresh
    /// token per user), revokes it, and issues a new pair.
    pub async fn rotate(&self, refresh_token: &str) -> Result<TokenPair, EngineError> {
        let claim = self.validate(refresh_token).await?;
        if claim.kind != TokenKind::Refresh {
            return Err(EngineError::business(
                crate::error::ErrorCode::Unauthenticated,
                "NOT_A_REFRESH_TOKEN",
                "token is not a refresh capability",
            ));
        }

        let current = self.cache.get_refresh_jti(claim.user_id).await?;
        if current.as_deref() != Some(claim.jti.as_str()) {
            return Err(EngineError::business(
                crate::error::ErrorCode::Unauthenticated,
                "REFRESH_TOKEN_SUPERSEDED",
                "refresh token has already been rotated",
            ));
        }

        let remaining = remaining_ttl(claim.expires_at_secs);
        self.cache.revoke_jti(&claim.jti, remaining).await?;
        self.issue(claim.user_id, claim.role).await
    }

    /// Revoke a capability outright (logout, suspension, admin action).
    pub async fn revoke(&self, token: &str) -> Result<(), EngineError> {
        let claim = self.validate(token).await?;
        let remaining = remaining_ttl(claim.expires_at_secs);
        self.cache.revoke_jti(&claim.jti, remaining).await
    }

    fn sign(&self, user_id: Id, role: Role, kind: TokenKind, ttl: Duration) -> Result<String, EngineError> {
        self.sign_with_jti(user_id, role, kind, ttl).map(|(token, _)| token)
    }

    fn sign_with_jti(
        &self,
        user_id: Id,
        role: Role,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<(String, String), EngineError> {
        let now = now_secs();
        let jti = Uuid::new_v4().to_string();
        let claims = Claims {
            sub: user_id,
            role,
            kind,
            jti: jti.clone(),
            iat: now,
            exp: now + ttl.as_secs(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| EngineError::business(crate::error::ErrorCode::Fatal, "TOKEN_SIGN_FAILED", e.to_string()))?;
        Ok((token, jti))
    }

    fn decode(&self, token: &str) -> Result<Claims, EngineError> {
        let validation = Validation::default();
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| {
                EngineError::business(
                    crate::error::ErrorCode::Unauthenticated,
                    "INVALID_TOKEN",
                    "capability is malformed, expired, or has an invalid signature",
                )
            })
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn remaining_ttl(expires_at_secs: u64) -> Duration {
    let now = now_secs();
    Duration::from_secs(expires_at_secs.saturating_sub(now))
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
