//! `harborcrm-auth` — pure access-control boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it holds the
//! role/capability matrix, session-token codec, password hashing, section
//! override resolution, and the branch partition filter. Callers (API layer,
//! workers) wire these against their own transport and datastore.

pub mod account;
pub mod branch;
pub mod capability;
pub mod claims;
pub mod error;
pub mod password;
pub mod role;
pub mod section;
pub mod token;

pub use account::{Account, AccountStatus, NewAccount};
pub use branch::{filter_by_branch, Branch, BranchScoped};
pub use capability::{authorize, caps, has_capability, role_capabilities, Capability, ResourceScope};
pub use claims::{validate_claims, SessionClaims, TokenValidationError};
pub use error::AuthError;
pub use password::{
    generate_reset_token, hash_password, validate_new_password, verify_password,
    MIN_PASSWORD_LEN, RESET_TOKEN_TTL_MINUTES,
};
pub use role::Role;
pub use section::{resolve_sections, section_access, SectionAccess, DEFAULT_SECTIONS};
pub use token::{session_claims_for, Hs256TokenCodec, TokenVerifier, SESSION_TTL_HOURS};
