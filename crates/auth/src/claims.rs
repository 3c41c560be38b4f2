//! JWT claims model (transport-agnostic).

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use merchmint_core::{AccountId, TOKEN_TTL_DAYS};

/// Claims embedded in an access token.
///
/// `decode_token` verifies the signature and structure only; expiry is
/// judged by the caller against [`TokenClaims::is_expired`] before
/// `check_access` is even consulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the account the token was issued to.
    pub sub: AccountId,
    /// Email at issue time (identities in transfer records are emails).
    pub email: String,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

impl TokenClaims {
    /// Claims for a fresh token issued at `now` with the fixed 30-day window.
    pub fn issue(account_id: AccountId, email: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            sub: account_id,
            email: email.into(),
            iat: now.timestamp(),
            exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
        }
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.iat, 0).single().unwrap_or_default()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_default()
    }

    /// Whether the embedded expiry has passed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}
