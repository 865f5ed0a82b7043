//! Boundary error taxonomy.

use thiserror::Error;

/// Errors surfaced by the access-control boundary.
///
/// The variants deliberately mirror what a caller is allowed to learn:
/// `InvalidCredentials` does not say whether the identifier or the password
/// was wrong, and `Forbidden` never names the missing capability.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Missing, malformed, badly signed, or expired session token.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Login failed: unknown identifier or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Login failed: the account exists but is not active.
    ///
    /// Distinct from `InvalidCredentials` on purpose — the current product
    /// behavior reveals inactivity after a successful identifier lookup.
    /// Known enumeration gap, tracked in DESIGN.md.
    #[error("account is inactive")]
    AccountInactive,

    /// The actor lacks a capability, or a department/branch scope rejected
    /// the record. Callers surface a generic "insufficient permissions".
    #[error("insufficient permissions")]
    Forbidden,

    /// Password-reset token not found, already consumed, or expired.
    /// A single variant: callers must not distinguish those cases.
    #[error("invalid or expired token")]
    InvalidOrExpiredToken,

    /// New password rejected by the password policy.
    #[error("password must be at least {} characters", crate::password::MIN_PASSWORD_LEN)]
    WeakPassword,

    /// The mail collaborator is not configured or not reachable.
    /// Surfaced to administrators only, never to the requesting end user.
    #[error("mail dispatcher unavailable")]
    MailUnavailable,

    /// Password hashing backend failure (cost parameters, malformed hash).
    #[error("credential hashing failed")]
    Hashing,
}
