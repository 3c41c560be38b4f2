//! User account: identity plus the coin balance the ledger moves.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::id::AccountId;

/// Coins granted to every freshly created account.
///
/// This is the only way the total balance across all accounts ever changes;
/// transfers conserve the sum.
pub const STARTING_BALANCE: i64 = 1000;

/// A user account row.
///
/// `balance` is never negative; it is mutated only inside a ledger unit of
/// work, after the row has been locked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub password_hash: String,
    pub balance: i64,
}

impl Account {
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>, balance: i64) -> Self {
        Self {
            id: AccountId::new(),
            email: email.into(),
            password_hash: password_hash.into(),
            balance,
        }
    }

    /// Check that the balance covers `amount`, naming the shortfall.
    pub fn ensure_covers(&self, amount: i64) -> LedgerResult<()> {
        if self.balance < amount {
            return Err(LedgerError::insufficient_funds(format!(
                "balance {} does not cover {}",
                self.balance, amount
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covering_check_names_the_shortfall() {
        let account = Account::new("user@example.com", "hash", 50);
        assert!(account.ensure_covers(50).is_ok());
        let err = account.ensure_covers(100).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds(_)));
    }
}
