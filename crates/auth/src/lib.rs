//! `merchmint-auth` — the session authority.
//!
//! Issues, decodes, and validates the bearer tokens that gate ledger
//! operations, and enforces single-active-session per account: issuing a
//! token replaces the account's previous token row, which is the sole
//! revocation mechanism.

pub mod authority;
pub mod claims;
pub mod session;

pub use authority::SessionAuthority;
pub use claims::TokenClaims;
pub use session::{login, Credentials, LoginOutcome};
