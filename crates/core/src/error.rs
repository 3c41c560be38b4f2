//! Ledger error model.
//!
//! One tagged enum covers the whole core: business-rule rejections, the
//! authentication layer, and transient infrastructure failures. Callers map
//! `class()` to a response category; `is_retryable()` says whether repeating
//! the same call from scratch is safe.

use thiserror::Error;

/// Result type used across the ledger core.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// User-visible error category.
///
/// Business rejections surface with a stable message; infrastructure
/// failures surface as a generic category and keep their detail in the
/// server-side logs only.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorClass {
    /// Deterministic rejection of the request (business rule, bad reference).
    BadRequest,
    /// Authentication failure (token or credentials).
    Unauthorized,
    /// Infrastructure or invariant failure.
    Internal,
}

/// Error produced by the ledger engine, session authority, or stores.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Transfer or purchase amount is not strictly positive.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Sender and receiver resolve to the same account.
    #[error("self transfer rejected")]
    SelfTransfer,

    /// The account balance does not cover the requested movement.
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// The transfer receiver does not resolve to an existing account.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    /// The purchase names an item absent from the catalog.
    #[error("item not found: {0}")]
    ItemNotFound(String),

    /// Login credentials do not match the stored account.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Token signature or encoding failed verification.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Signing a fresh token failed.
    #[error("token generation failed: {0}")]
    TokenGeneration(String),

    /// Transient storage failure. The operation rolled back and left no
    /// trace, so the caller may retry the whole call from scratch.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// An invariant was about to be violated. Fatal for the operation;
    /// never swallowed.
    #[error("integrity violation: {0}")]
    Integrity(String),
}

impl LedgerError {
    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    pub fn insufficient_funds(msg: impl Into<String>) -> Self {
        Self::InsufficientFunds(msg.into())
    }

    pub fn invalid_recipient(msg: impl Into<String>) -> Self {
        Self::InvalidRecipient(msg.into())
    }

    pub fn item_not_found(msg: impl Into<String>) -> Self {
        Self::ItemNotFound(msg.into())
    }

    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::InvalidToken(msg.into())
    }

    pub fn token_generation(msg: impl Into<String>) -> Self {
        Self::TokenGeneration(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    /// Stable user-visible category for this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidAmount(_)
            | Self::SelfTransfer
            | Self::InsufficientFunds(_)
            | Self::InvalidRecipient(_)
            | Self::ItemNotFound(_) => ErrorClass::BadRequest,
            Self::InvalidCredentials | Self::InvalidToken(_) => ErrorClass::Unauthorized,
            Self::TokenGeneration(_) | Self::Persistence(_) | Self::Integrity(_) => {
                ErrorClass::Internal
            }
        }
    }

    /// Whether repeating the same call from scratch is safe.
    ///
    /// Only persistence failures qualify: a rolled-back unit of work leaves
    /// no partial state behind. Business rejections are deterministic and
    /// retrying them is pointless.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}
