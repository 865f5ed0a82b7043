use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use harborcrm_core::{AccountId, BranchId};

use crate::Role;

/// Decoded payload of a session token.
///
/// Everything here is a **snapshot taken at issuance**: if an administrator
/// changes an account's role or branch afterwards, outstanding tokens keep
/// the old values until they expire. Verification is stateless and never
/// consults the datastore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject — the account identifier.
    pub sub: AccountId,

    /// Account email at issuance.
    pub email: String,

    /// Role at issuance.
    pub role: Role,

    /// Department label at issuance (free text).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    /// Branch at issuance, if the account was assigned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<BranchId>,

    /// Issued-at timestamp.
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    /// Absolute expiry.
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate the claim time window.
///
/// Note: this validates the *claims* only; signature verification lives in
/// the token codec.
pub fn validate_claims(
    claims: &SessionClaims,
    now: DateTime<Utc>,
) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims_at(issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> SessionClaims {
        SessionClaims {
            sub: AccountId::new(),
            email: "a@co.com".to_string(),
            role: Role::Staff,
            department: None,
            branch_id: None,
            issued_at,
            expires_at,
        }
    }

    #[test]
    fn valid_inside_window() {
        let now = Utc::now();
        let c = claims_at(now - Duration::minutes(1), now + Duration::hours(1));
        assert!(validate_claims(&c, now).is_ok());
    }

    #[test]
    fn rejects_expired() {
        let now = Utc::now();
        let c = claims_at(now - Duration::hours(2), now - Duration::hours(1));
        assert_eq!(validate_claims(&c, now), Err(TokenValidationError::Expired));
    }

    #[test]
    fn rejects_not_yet_valid() {
        let now = Utc::now();
        let c = claims_at(now + Duration::minutes(5), now + Duration::hours(1));
        assert_eq!(validate_claims(&c, now), Err(TokenValidationError::NotYetValid));
    }

    #[test]
    fn rejects_inverted_window() {
        let now = Utc::now();
        let c = claims_at(now, now);
        assert_eq!(
            validate_claims(&c, now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }
}
