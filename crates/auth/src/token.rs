use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::{validate_claims, AuthError, SessionClaims};

/// Absolute session lifetime. Tokens are not individually revocable; logout
/// is client-side token discard, so the ceiling is the only hard cutoff.
pub const SESSION_TTL_HOURS: i64 = 24;

/// Verification seam consumed by the HTTP middleware.
///
/// Implementations must be purely cryptographic — no datastore lookups — so
/// that verification cost and availability are independent of storage.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, AuthError>;
}

/// HS256 session-token codec over a shared server secret.
pub struct Hs256TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Hs256TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Sign a claims snapshot into a compact token.
    pub fn issue(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|_| AuthError::Unauthenticated)
    }

    fn decode(&self, token: &str) -> Result<SessionClaims, AuthError> {
        // Expiry is checked by `validate_claims` against the caller's clock,
        // so the library-side timestamp checks are disabled to keep the
        // codec deterministic under test.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "session token rejected");
                AuthError::Unauthenticated
            })
    }
}

impl TokenVerifier for Hs256TokenCodec {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, AuthError> {
        let claims = self.decode(token)?;
        validate_claims(&claims, now).map_err(|_| AuthError::Unauthenticated)?;
        Ok(claims)
    }
}

/// Build the issuance-time claims snapshot for an account.
pub fn session_claims_for(account: &crate::Account, now: DateTime<Utc>) -> SessionClaims {
    SessionClaims {
        sub: account.id,
        email: account.email.clone(),
        role: account.role,
        department: account.department.clone(),
        branch_id: account.branch_id,
        issued_at: now,
        expires_at: now + Duration::hours(SESSION_TTL_HOURS),
    }
}
