//! Token issue, decode, and revocation checks.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use tracing::instrument;

use merchmint_core::{AccountId, LedgerError, LedgerResult};
use merchmint_ledger::LedgerStore;

use crate::claims::TokenClaims;

/// Issues and validates HS256 bearer tokens and enforces
/// single-active-session per account.
pub struct SessionAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl SessionAuthority {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared by the caller against the embedded claims, not
        // during decode.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Sign a fresh token and replace the account's live token row.
    ///
    /// Replacement happens in one unit of work, so a previously issued token
    /// stops passing [`check_access`](Self::check_access) the instant the
    /// new one exists. Login on a second device invalidates the first.
    #[instrument(skip(self, store), err)]
    pub async fn issue_token<S: LedgerStore>(
        &self,
        store: &S,
        account_id: AccountId,
        email: &str,
    ) -> LedgerResult<String> {
        let claims = TokenClaims::issue(account_id, email, Utc::now());
        let value = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| LedgerError::token_generation(e.to_string()))?;

        let mut tx = store.begin().await?;
        match tx
            .replace_token(account_id, &value, claims.issued_at(), claims.expires_at())
            .await
        {
            Ok(()) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                let _ = tx.rollback().await;
                Err(err)
            }
        }
    }

    /// Verify signature and structure; returns the embedded claims.
    ///
    /// Does not check expiry against the clock and does not check
    /// revocation — callers compare `expires_at` themselves and then consult
    /// [`check_access`](Self::check_access).
    pub fn decode_token(&self, value: &str) -> LedgerResult<TokenClaims> {
        jsonwebtoken::decode::<TokenClaims>(value, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| LedgerError::invalid_token(e.to_string()))
    }

    /// Whether `value` is the live token for `claimed_account_id`.
    ///
    /// No stored row means revoked-or-unknown: `false`, not an error. This
    /// is the revocation check — a superseded token still carries a valid
    /// signature but no longer has a row.
    #[instrument(skip(self, store, value), err)]
    pub async fn check_access<S: LedgerStore>(
        &self,
        store: &S,
        value: &str,
        claimed_account_id: AccountId,
    ) -> LedgerResult<bool> {
        let mut tx = store.begin().await?;
        let owner = tx.find_token_owner(value).await;
        let _ = tx.rollback().await;
        Ok(owner? == Some(claimed_account_id))
    }
}
