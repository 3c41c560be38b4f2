//! Login orchestration: resolve-or-create the account, then issue a token.
//!
//! Password hashing stays with the caller; the flow compares stored and
//! presented hashes verbatim.

use tracing::instrument;

use merchmint_core::{Account, LedgerError, LedgerResult, STARTING_BALANCE};
use merchmint_ledger::LedgerStore;

use crate::authority::SessionAuthority;

/// What the caller presents at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password_hash: String,
}

/// A completed login: the (possibly fresh) account and its new token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub account: Account,
    pub token: String,
    /// Whether the account was created by this login.
    pub created: bool,
}

/// Log in with `credentials`, creating the account on first sight.
///
/// A new email gets an account with the fixed starting grant before a token
/// is issued. A known email must present the stored hash. Issuing the token
/// revokes any token from a previous login.
#[instrument(skip(store, authority, credentials), fields(email = %credentials.email), err)]
pub async fn login<S: LedgerStore>(
    store: &S,
    authority: &SessionAuthority,
    credentials: &Credentials,
) -> LedgerResult<LoginOutcome> {
    let mut tx = store.begin().await?;

    // Locking the row (when it exists) serializes concurrent logins for the
    // same email; the row-absent race falls back to the unique constraint.
    let (account, created) = match tx.account_by_email_for_update(&credentials.email).await {
        Ok(Some(existing)) => {
            if existing.password_hash != credentials.password_hash {
                let _ = tx.rollback().await;
                return Err(LedgerError::InvalidCredentials);
            }
            (existing, false)
        }
        Ok(None) => {
            match tx
                .create_account(&credentials.email, &credentials.password_hash, STARTING_BALANCE)
                .await
            {
                Ok(fresh) => (fresh, true),
                Err(err) => {
                    let _ = tx.rollback().await;
                    return Err(err);
                }
            }
        }
        Err(err) => {
            let _ = tx.rollback().await;
            return Err(err);
        }
    };
    tx.commit().await?;

    let token = authority
        .issue_token(store, account.id, &account.email)
        .await?;

    Ok(LoginOutcome {
        account,
        token,
        created,
    })
}
