//! Persisted access-token rows (single-active-session per account).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::AccountId;

/// Fixed token lifetime.
pub const TOKEN_TTL_DAYS: i64 = 30;

/// The live token row for an account. At most one exists per account: a new
/// issue replaces the previous row, which is how revocation works. There is
/// no stored "expired" state; callers compare `expires_at` to the clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub account_id: AccountId,
    pub value: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Whether the token is past its embedded expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expiry_is_judged_against_the_given_clock() {
        let issued = Utc::now();
        let record = TokenRecord {
            account_id: AccountId::new(),
            value: "tok".into(),
            issued_at: issued,
            expires_at: issued + Duration::days(TOKEN_TTL_DAYS),
        };
        assert!(!record.is_expired(issued));
        assert!(!record.is_expired(issued + Duration::days(29)));
        assert!(record.is_expired(issued + Duration::days(30)));
    }
}
