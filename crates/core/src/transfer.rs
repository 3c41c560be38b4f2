//! Coin transfers: the append-only ledger entries plus the precondition
//! checks run before any storage is touched.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};
use crate::id::TransferId;

/// One value-moving ledger entry. Created exactly once per successful
/// transfer; never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinTransfer {
    pub id: TransferId,
    pub sender_email: String,
    pub receiver_email: String,
    /// Strictly positive.
    pub amount: i64,
}

impl CoinTransfer {
    pub fn new(
        sender_email: impl Into<String>,
        receiver_email: impl Into<String>,
        amount: i64,
    ) -> Self {
        Self {
            id: TransferId::new(),
            sender_email: sender_email.into(),
            receiver_email: receiver_email.into(),
            amount,
        }
    }
}

/// Validate transfer preconditions before any I/O.
///
/// Rejects non-positive amounts and self-transfers. Identity comparison is
/// exact (emails are unique and stored verbatim).
pub fn validate_transfer(sender_email: &str, receiver_email: &str, amount: i64) -> LedgerResult<()> {
    if amount <= 0 {
        return Err(LedgerError::invalid_amount(format!(
            "transfer amount must be positive, got {amount}"
        )));
    }
    if sender_email == receiver_email {
        return Err(LedgerError::SelfTransfer);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_amount_between_distinct_accounts_passes() {
        assert!(validate_transfer("a@example.com", "b@example.com", 100).is_ok());
    }

    #[test]
    fn zero_and_negative_amounts_are_rejected() {
        for amount in [0, -1, i64::MIN] {
            let err = validate_transfer("a@example.com", "b@example.com", amount).unwrap_err();
            assert!(matches!(err, LedgerError::InvalidAmount(_)));
        }
    }

    #[test]
    fn self_transfer_is_rejected() {
        let err = validate_transfer("a@example.com", "a@example.com", 10).unwrap_err();
        assert_eq!(err, LedgerError::SelfTransfer);
    }

    #[test]
    fn amount_check_runs_before_identity_check() {
        // A nonsensical self-transfer of zero reports the amount problem.
        let err = validate_transfer("a@example.com", "a@example.com", 0).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));
    }
}
