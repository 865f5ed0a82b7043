use rand::RngCore;

use crate::AuthError;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Password-reset tokens expire one hour after issuance.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Hash a password with bcrypt at the default adaptive cost.
pub fn hash_password(plain: &str) -> Result<String, AuthError> {
    bcrypt::hash(plain, bcrypt::DEFAULT_COST).map_err(|_| AuthError::Hashing)
}

/// Constant-time verification against a stored bcrypt hash.
///
/// A malformed stored hash verifies as `false` rather than erroring — login
/// must not distinguish "bad password" from "corrupt hash" to the caller.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    bcrypt::verify(plain, hash).unwrap_or(false)
}

/// Policy gate for new passwords (login never runs this).
pub fn validate_new_password(plain: &str) -> Result<(), AuthError> {
    if plain.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

/// Generate an opaque single-use reset token: 32 bytes from the OS CSPRNG,
/// hex-encoded. The token is the only secret — it is stored and compared
/// verbatim, bound to one account.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);

    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
